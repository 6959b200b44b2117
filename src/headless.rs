// ============================================================================
// Headless editor: an in-memory host for the command channel
// ============================================================================
//
// Stands in for the editor application when there is no window or GPU.
// Opened images are rendered through a pluggable filter renderer and shown
// on either kind of canvas. The accelerated canvas keeps
// a separate bottom-up back buffer that only `paint_canvas` refreshes, so a
// read without a paint sees the previous frame, as a real GPU canvas would.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::RgbaImage;

use crate::dispatcher::HostBindings;
use crate::host::{
    AcceleratedSurface, AppContext, Canvas, Document, FilterConfig, GlobalProbe, ImmediateSurface,
    InputImage, InputOpener, RenderCompletion, RenderPipeline, SharedFilterConfig,
};
use crate::ops::CANVAS_ID;
use crate::readback::to_bottom_up;
use crate::settings::ControlSettings;
use crate::source::ByteSource;

/// The external image library: turns a source image into a filtered one.
/// `None` means the filter is not supported and the frame is left unfiltered.
pub trait FilterRenderer: Send {
    fn render(&self, filter: &str, source: &RgbaImage) -> Option<RgbaImage>;
}

impl<F> FilterRenderer for F
where
    F: Fn(&str, &RgbaImage) -> Option<RgbaImage> + Send,
{
    fn render(&self, filter: &str, source: &RgbaImage) -> Option<RgbaImage> {
        self(filter, source)
    }
}

/// Renderer that supports no filters at all.
pub struct Passthrough;

impl FilterRenderer for Passthrough {
    fn render(&self, _filter: &str, _source: &RgbaImage) -> Option<RgbaImage> {
        None
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SurfaceKind {
    Accelerated,
    Immediate,
}

struct EditorState {
    kind: SurfaceKind,
    source: Option<RgbaImage>,
    frame: RgbaImage,
    back_buffer: Vec<u8>,
    filter: SharedFilterConfig,
    renderer: Box<dyn FilterRenderer>,
    catalog: Option<Vec<String>>,
    opened: Vec<InputImage>,
    render_latency: Duration,
    settle_lag: u32,
    polls_until_settled: u32,
    renders: usize,
    paints: usize,
}

impl EditorState {
    fn render(&mut self) {
        let Some(source) = &self.source else { return };
        let active = self
            .filter
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .active_filter()
            .map(str::to_string);
        self.frame = active
            .and_then(|f| self.renderer.render(&f, source))
            .unwrap_or_else(|| source.clone());
        self.renders += 1;
    }

    fn paint(&mut self) {
        self.back_buffer = to_bottom_up(&self.frame);
        self.paints += 1;
    }
}

type SharedState = Arc<Mutex<EditorState>>;

fn lock(state: &SharedState) -> std::sync::MutexGuard<'_, EditorState> {
    state.lock().unwrap_or_else(|e| e.into_inner())
}

/// Which app capabilities the headless editor exposes.
#[derive(Clone, Copy, Debug)]
struct Capabilities {
    input: bool,
    render: bool,
    params: bool,
}

#[derive(Clone)]
pub struct HeadlessEditor {
    state: SharedState,
    caps: Capabilities,
}

impl HeadlessEditor {
    pub fn new(kind: SurfaceKind, width: u32, height: u32) -> Self {
        let frame = RgbaImage::new(width, height);
        let back_buffer = to_bottom_up(&frame);
        Self {
            state: Arc::new(Mutex::new(EditorState {
                kind,
                source: None,
                frame,
                back_buffer,
                filter: Arc::new(Mutex::new(FilterConfig::default())),
                renderer: Box::new(Passthrough),
                catalog: None,
                opened: Vec::new(),
                render_latency: Duration::ZERO,
                settle_lag: 0,
                polls_until_settled: 0,
                renders: 0,
                paints: 0,
            })),
            caps: Capabilities {
                input: true,
                render: true,
                params: true,
            },
        }
    }

    pub fn with_renderer(self, renderer: impl FilterRenderer + 'static) -> Self {
        lock(&self.state).renderer = Box::new(renderer);
        self
    }

    /// Report this catalog instead of letting callers assume the built-in one.
    pub fn with_catalog(self, catalog: Vec<String>) -> Self {
        lock(&self.state).catalog = Some(catalog);
        self
    }

    /// Finish every render pass `latency` after it is requested, on another thread.
    pub fn with_render_latency(self, latency: Duration) -> Self {
        lock(&self.state).render_latency = latency;
        self
    }

    /// Report "not settled" for `polls` checks after each opened image.
    pub fn with_settle_lag(self, polls: u32) -> Self {
        lock(&self.state).settle_lag = polls;
        self
    }

    pub fn without_input_opener(mut self) -> Self {
        self.caps.input = false;
        self
    }

    pub fn without_render_pipeline(mut self) -> Self {
        self.caps.render = false;
        self
    }

    pub fn without_params(mut self) -> Self {
        self.caps.params = false;
        self
    }

    /// Show `img` as if it had been opened and rendered.
    pub fn load(&self, img: RgbaImage) {
        let mut state = lock(&self.state);
        state.source = Some(img);
        state.render();
        state.paint();
    }

    pub fn app(&self) -> HeadlessApp {
        HeadlessApp {
            state: self.state.clone(),
            caps: self.caps,
        }
    }

    pub fn document(&self) -> HeadlessDocument {
        HeadlessDocument {
            canvas: HeadlessCanvas {
                state: self.state.clone(),
            },
        }
    }

    /// Host bindings over this editor.
    pub fn bindings(
        &self,
        globals: impl GlobalProbe + 'static,
        settings: &ControlSettings,
    ) -> HostBindings {
        HostBindings::new(
            Box::new(self.app()),
            Box::new(self.document()),
            Box::new(globals),
            settings,
        )
    }

    /// Host bindings reading images from the local filesystem.
    pub fn filesystem_bindings(&self, globals: impl GlobalProbe + 'static) -> HostBindings {
        HostBindings {
            app: Box::new(self.app()),
            document: Box::new(self.document()),
            globals: Box::new(globals),
            bytes: ByteSource::Filesystem,
        }
    }

    pub fn filter_config(&self) -> FilterConfig {
        let filter = lock(&self.state).filter.clone();
        let cfg = filter.lock().unwrap_or_else(|e| e.into_inner()).clone();
        cfg
    }

    /// The most recently rendered frame, top-down.
    pub fn frame(&self) -> RgbaImage {
        lock(&self.state).frame.clone()
    }

    pub fn opened(&self) -> Vec<InputImage> {
        lock(&self.state).opened.clone()
    }

    pub fn render_count(&self) -> usize {
        lock(&self.state).renders
    }

    pub fn paint_count(&self) -> usize {
        lock(&self.state).paints
    }
}

// ============================================================================
// App side
// ============================================================================

pub struct HeadlessApp {
    state: SharedState,
    caps: Capabilities,
}

impl AppContext for HeadlessApp {
    fn input_opener(&mut self) -> Option<&mut dyn InputOpener> {
        if self.caps.input { Some(self as &mut dyn InputOpener) } else { None }
    }

    fn render_pipeline(&mut self) -> Option<&mut dyn RenderPipeline> {
        if self.caps.render { Some(self as &mut dyn RenderPipeline) } else { None }
    }

    fn filter_config(&self) -> Option<SharedFilterConfig> {
        self.caps.params.then(|| lock(&self.state).filter.clone())
    }

    fn filter_catalog(&self) -> Option<Vec<String>> {
        lock(&self.state).catalog.clone()
    }
}

impl InputOpener for HeadlessApp {
    fn open_input(&mut self, input: InputImage) -> RenderCompletion {
        let decoded = image::load_from_memory(&input.bytes);
        let mut state = lock(&self.state);
        state.opened.push(input);
        match decoded {
            Ok(img) => {
                state.source = Some(img.to_rgba8());
                state.polls_until_settled = state.settle_lag;
                RenderCompletion::ready()
            }
            Err(e) => RenderCompletion::failed(e.to_string()),
        }
    }
}

impl RenderPipeline for HeadlessApp {
    fn update_gl(&mut self) -> RenderCompletion {
        let latency = lock(&self.state).render_latency;
        if latency.is_zero() {
            lock(&self.state).render();
            return RenderCompletion::ready();
        }
        let (signal, completion) = RenderCompletion::channel();
        let state = self.state.clone();
        std::thread::spawn(move || {
            std::thread::sleep(latency);
            lock(&state).render();
            signal.complete();
        });
        completion
    }

    fn paint_canvas(&mut self) -> bool {
        lock(&self.state).paint();
        true
    }

    fn is_settled(&self) -> bool {
        let mut state = lock(&self.state);
        if state.polls_until_settled == 0 {
            return true;
        }
        state.polls_until_settled -= 1;
        false
    }
}

// ============================================================================
// Document side
// ============================================================================

pub struct HeadlessDocument {
    canvas: HeadlessCanvas,
}

impl Document for HeadlessDocument {
    fn canvas(&self, id: &str) -> Option<&dyn Canvas> {
        (id == CANVAS_ID).then_some(&self.canvas as &dyn Canvas)
    }
}

pub struct HeadlessCanvas {
    state: SharedState,
}

impl Canvas for HeadlessCanvas {
    fn width(&self) -> u32 {
        lock(&self.state).frame.width()
    }

    fn height(&self) -> u32 {
        lock(&self.state).frame.height()
    }

    fn accelerated(&self) -> Option<&dyn AcceleratedSurface> {
        (lock(&self.state).kind == SurfaceKind::Accelerated).then_some(self as &dyn AcceleratedSurface)
    }

    fn immediate(&self) -> Option<&dyn ImmediateSurface> {
        (lock(&self.state).kind == SurfaceKind::Immediate).then_some(self as &dyn ImmediateSurface)
    }
}

impl AcceleratedSurface for HeadlessCanvas {
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8> {
        let state = lock(&self.state);
        let (buf_w, buf_h) = (state.frame.width(), state.frame.height());
        let mut out = vec![0u8; width as usize * height as usize * 4];
        // The back buffer may still have the previous frame's size.
        if state.back_buffer.len() != buf_w as usize * buf_h as usize * 4 {
            return out;
        }
        for row in 0..height {
            let sy = y + row;
            if sy >= buf_h {
                break;
            }
            for col in 0..width {
                let sx = x + col;
                if sx >= buf_w {
                    break;
                }
                let src = (sy as usize * buf_w as usize + sx as usize) * 4;
                let dst = (row as usize * width as usize + col as usize) * 4;
                out[dst..dst + 4].copy_from_slice(&state.back_buffer[src..src + 4]);
            }
        }
        out
    }
}

impl ImmediateSurface for HeadlessCanvas {
    fn snapshot(&self) -> RgbaImage {
        lock(&self.state).frame.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::StaticGlobals;
    use image::Rgba;

    fn checker(w: u32, h: u32) -> RgbaImage {
        RgbaImage::from_fn(w, h, |x, y| {
            if (x + y) % 2 == 0 {
                Rgba([200, 100, 50, 255])
            } else {
                Rgba([10, 20, 30, 255])
            }
        })
    }

    #[test]
    fn back_buffer_only_changes_on_paint() {
        let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 4, 4)
            .with_renderer(|_: &str, src: &RgbaImage| {
                Some(RgbaImage::from_pixel(src.width(), src.height(), Rgba([1, 2, 3, 4])))
            });
        editor.load(checker(4, 4));
        let doc = editor.document();
        let canvas = doc.canvas(CANVAS_ID).unwrap();
        let before = canvas.accelerated().unwrap().read_pixels(0, 0, 1, 1);

        let mut app = editor.app();
        app.filter_config().unwrap().lock().unwrap().select("anything");
        app.update_gl().wait("updateGL", Duration::from_secs(1)).unwrap();
        assert_eq!(canvas.accelerated().unwrap().read_pixels(0, 0, 1, 1), before);

        assert!(app.paint_canvas());
        assert_eq!(canvas.accelerated().unwrap().read_pixels(0, 0, 1, 1), vec![1, 2, 3, 4]);
    }

    #[test]
    fn only_the_canvas_id_resolves() {
        let editor = HeadlessEditor::new(SurfaceKind::Immediate, 2, 2);
        let doc = editor.document();
        assert!(doc.canvas("canvas").is_some());
        assert!(doc.canvas("overlay").is_none());
        let canvas = doc.canvas("canvas").unwrap();
        assert!(canvas.accelerated().is_none());
        assert!(canvas.immediate().is_some());
    }

    #[test]
    fn settle_lag_counts_down_after_open() {
        let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 2, 2).with_settle_lag(2);
        let mut app = editor.app();
        let mut png = Vec::new();
        checker(2, 2)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();
        app.open_input(InputImage {
            bytes: png,
            filename: "c.png".into(),
            source_path: "/c.png".into(),
        })
        .wait("openInput", Duration::from_secs(1))
        .unwrap();
        assert!(!app.is_settled());
        assert!(!app.is_settled());
        assert!(app.is_settled());
    }

    #[test]
    fn filesystem_bindings_read_local_paths() {
        let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 2, 2);
        let host = editor.filesystem_bindings(StaticGlobals::new(["loadPyodide"]));
        assert_eq!(host.bytes.kind(), "filesystem");
        assert!(host.globals.is_defined("loadPyodide"));
        assert!(host.document.canvas(CANVAS_ID).is_some());
    }

    #[test]
    fn capabilities_can_be_withheld() {
        let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 2, 2)
            .without_input_opener()
            .without_params();
        let mut app = editor.app();
        assert!(app.input_opener().is_none());
        assert!(app.filter_config().is_none());
        assert!(app.render_pipeline().is_some());
    }
}
