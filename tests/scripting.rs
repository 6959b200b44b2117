mod common;

use photoeditor_bridge::headless::SurfaceKind;
use photoeditor_bridge::host::StaticGlobals;
use photoeditor_bridge::script::{eval_expression, run_script};
use photoeditor_bridge::{DispatcherHandle, setup_on};

use common::*;

fn handle(channel: &str) -> (DispatcherHandle, photoeditor_bridge::headless::HeadlessEditor) {
    let editor = posterizing_editor(SurfaceKind::Accelerated);
    let handle = setup_on(
        channel,
        editor.filesystem_bindings(StaticGlobals::default()),
        fast_settings(),
    )
    .unwrap();
    (handle, editor)
}

#[test]
fn script_drives_a_full_filter_session() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_png(dir.path(), "Testcard_F.png", &gradient(WIDTH, HEIGHT));
    let (handle, editor) = handle("SCRIPT-SESSION");

    let source = format!(
        r#"
        print(photoeditor("open-image", #{{ path: {:?} }}));
        let before = photoeditor("get-canvas-data", #{{ sample: 10 }});
        print(photoeditor("apply-pillow-filter posterize"));
        let after = photoeditor("get-canvas-data", #{{ sample: 10 }});
        print(before != after);
        print(photoeditor("list-pillow-filters"));
        "#,
        path.to_str().unwrap()
    );
    let printed = run_script(&source, &handle).unwrap();
    assert_eq!(printed[0], "OK - Image loaded: 64x48");
    assert_eq!(printed[1], "OK - Filter applied: posterize");
    assert_eq!(printed[2], "true");
    assert!(printed[3].starts_with("blur, sharpen"));
    assert_eq!(
        editor.filter_config().filter_type.as_deref(),
        Some("posterize")
    );
}

#[test]
fn command_failures_become_script_errors() {
    let (handle, _editor) = handle("SCRIPT-ERRORS");
    let err = run_script("let x = 1;\nphotoeditor(\"frobnicate\");", &handle).unwrap_err();
    assert!(err.message.contains("Unknown command: frobnicate"));
    assert_eq!(err.line, Some(2));
    assert!(err.friendly_message().contains("PHOTOEDITOR command failed"));
}

#[test]
fn syntax_errors_are_located() {
    let (handle, _editor) = handle("SCRIPT-SYNTAX");
    let err = run_script("let = ;", &handle).unwrap_err();
    assert_eq!(err.line, Some(1));
}

#[test]
fn expressions_return_the_command_result() {
    let (handle, editor) = handle("SCRIPT-EVAL");
    editor.load(gradient(WIDTH, HEIGHT));
    let out = eval_expression(r#"photoeditor("get-canvas-data", #{ sample: 3 })"#, &handle).unwrap();
    let tuples: Vec<[u8; 4]> = serde_json::from_str(&out).unwrap();
    assert_eq!(tuples.len(), 3);
}
