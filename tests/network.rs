mod common;

use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::thread::JoinHandle;

use photoeditor_bridge::headless::{HeadlessEditor, SurfaceKind};
use photoeditor_bridge::host::StaticGlobals;
use photoeditor_bridge::source::DESKTOP_SHELL_MARKER;
use photoeditor_bridge::{CommandError, ControlSettings, Dispatcher};
use serde_json::json;

use common::*;

/// Serve exactly one HTTP request with `status` and `body`, returning the
/// base URL and the request line that was received.
fn serve_once(status: &'static str, body: Vec<u8>) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}/", listener.local_addr().unwrap());
    let server = std::thread::spawn(move || {
        let (stream, _) = listener.accept().unwrap();
        let mut reader = BufReader::new(stream);
        let mut request_line = String::new();
        reader.read_line(&mut request_line).unwrap();
        loop {
            let mut header = String::new();
            reader.read_line(&mut header).unwrap();
            if header == "\r\n" || header.is_empty() {
                break;
            }
        }
        let mut stream = reader.into_inner();
        write!(
            stream,
            "HTTP/1.1 {}\r\nContent-Type: image/png\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            status,
            body.len()
        )
        .unwrap();
        stream.write_all(&body).unwrap();
        stream.flush().unwrap();
        request_line.trim_end().to_string()
    });
    (base, server)
}

fn network_dispatcher(editor: &HeadlessEditor, base: &str) -> Dispatcher {
    let settings = ControlSettings {
        network_base_url: Some(base.to_string()),
        ..fast_settings()
    };
    Dispatcher::new(
        editor.bindings(StaticGlobals::default(), &settings),
        settings,
    )
}

#[test]
fn http_error_status_is_reported_and_logged() {
    let (base, server) = serve_once("404 Not Found", Vec::new());
    let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 4, 4);
    let mut dispatcher = network_dispatcher(&editor, &base);

    let err = dispatcher
        .run("open-image", &json!({ "path": "/Testcard_F.jpg" }))
        .unwrap_err();
    assert!(matches!(err, CommandError::ImageFetch { status: 404 }));
    assert_eq!(err.to_string(), "Failed to load image: HTTP 404");
    assert_eq!(server.join().unwrap(), "GET /Testcard_F.jpg HTTP/1.1");

    let last = dispatcher.audit().entries().last().unwrap();
    assert_eq!(last.text, "ERROR: Failed to load image: HTTP 404");
    assert!(editor.opened().is_empty());
}

#[test]
fn images_load_over_http_relative_to_the_base() {
    let dir = tempfile::tempdir().unwrap();
    let png = std::fs::read(write_png(dir.path(), "a.png", &gradient(6, 4))).unwrap();
    let (base, server) = serve_once("200 OK", png);
    let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 6, 4);
    let mut dispatcher = network_dispatcher(&editor, &base);

    let out = dispatcher
        .run("open-image", &json!({ "path": "images/a.png" }))
        .unwrap();
    assert_eq!(out.to_string(), "OK - Image loaded: 6x4");
    assert_eq!(server.join().unwrap(), "GET /images/a.png HTTP/1.1");
    assert_eq!(editor.opened()[0].filename, "a.png");
    assert_eq!(editor.frame(), gradient(6, 4));
}

#[test]
fn relative_paths_need_a_base_url() {
    let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 4, 4);
    let settings = fast_settings();
    let mut dispatcher = Dispatcher::new(
        editor.bindings(StaticGlobals::default(), &settings),
        settings,
    );
    let err = dispatcher
        .run("open-image", &json!({ "path": "/Testcard_F.jpg" }))
        .unwrap_err();
    assert!(matches!(err, CommandError::ImageRead(_)));
}

#[test]
fn desktop_marker_reads_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "local.png", &gradient(3, 3));
    let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 3, 3);
    let settings = ControlSettings {
        network_base_url: Some("http://127.0.0.1:9/".into()),
        ..fast_settings()
    };
    let mut dispatcher = Dispatcher::new(
        editor.bindings(StaticGlobals::new([DESKTOP_SHELL_MARKER]), &settings),
        settings,
    );
    let out = dispatcher
        .run("open-image", &json!({ "path": path.to_str().unwrap() }))
        .unwrap();
    assert_eq!(out.to_string(), "OK - Image loaded: 3x3");
}
