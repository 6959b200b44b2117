#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use image::{ImageOutputFormat, Rgba, RgbaImage};
use photoeditor_bridge::host::StaticGlobals;
use photoeditor_bridge::headless::{HeadlessEditor, SurfaceKind};
use photoeditor_bridge::{ControlSettings, Dispatcher};

pub const WIDTH: u32 = 64;
pub const HEIGHT: u32 = 48;

/// Distinct value per pixel, none of it aligned to the posterize step.
pub fn gradient(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_fn(width, height, |x, y| {
        Rgba([(x * 3 + 1) as u8, (y * 5 + 1) as u8, 77, 255])
    })
}

/// Keep only the top two bits of each color channel.
pub fn posterize(src: &RgbaImage) -> RgbaImage {
    RgbaImage::from_fn(src.width(), src.height(), |x, y| {
        let p = src.get_pixel(x, y).0;
        Rgba([p[0] & 0xC0, p[1] & 0xC0, p[2] & 0xC0, p[3]])
    })
}

pub fn write_png(dir: &Path, name: &str, img: &RgbaImage) -> PathBuf {
    let path = dir.join(name);
    let mut bytes = Vec::new();
    img.write_to(&mut std::io::Cursor::new(&mut bytes), ImageOutputFormat::Png)
        .unwrap();
    std::fs::write(&path, bytes).unwrap();
    path
}

pub fn fast_settings() -> ControlSettings {
    ControlSettings {
        settle_timeout: Duration::from_millis(200),
        settle_poll_interval: Duration::from_millis(1),
        render_timeout: Duration::from_secs(5),
        ..Default::default()
    }
}

/// Editor whose renderer understands `posterize` only.
pub fn posterizing_editor(kind: SurfaceKind) -> HeadlessEditor {
    HeadlessEditor::new(kind, WIDTH, HEIGHT).with_renderer(|filter: &str, src: &RgbaImage| {
        (filter == "posterize").then(|| posterize(src))
    })
}

pub fn dispatcher_for(editor: &HeadlessEditor) -> Dispatcher {
    Dispatcher::new(
        editor.filesystem_bindings(StaticGlobals::default()),
        fast_settings(),
    )
}
