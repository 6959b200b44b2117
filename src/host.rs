// ============================================================================
// Host capabilities: the surface the dispatcher consumes from the editor
// ============================================================================
//
// The editor application, its render pipeline and its canvas are owned by
// the host. The dispatcher only ever reaches them through these traits and
// checks every capability for presence before use.

use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use image::RgbaImage;

use crate::error::CommandError;

// ============================================================================
// Filter configuration (the editor's `params.pillow` record)
// ============================================================================

/// Currently requested image-library filter.
///
/// `skip == false` with a `filter_type` set asks the render pipeline to apply
/// that filter on its next pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FilterConfig {
    pub filter_type: Option<String>,
    pub filter_label: Option<String>,
    pub skip: bool,
}

impl FilterConfig {
    /// Request `filter` on the next render.
    pub fn select(&mut self, filter: &str) {
        self.filter_type = Some(filter.to_string());
        self.filter_label = Some(capitalize(filter));
        self.skip = false;
    }

    /// Drop any requested filter.
    pub fn clear(&mut self) {
        self.filter_type = None;
        self.filter_label = None;
        self.skip = false;
    }

    /// The filter the render pipeline should apply right now, if any.
    pub fn active_filter(&self) -> Option<&str> {
        if self.skip {
            None
        } else {
            self.filter_type.as_deref()
        }
    }
}

/// Filter configuration shared between the dispatcher and the render pipeline.
pub type SharedFilterConfig = Arc<Mutex<FilterConfig>>;

/// Display label for a filter id: first character upper-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Asynchronous render completion
// ============================================================================

/// Completion of an asynchronous host step (image hand-off, render pass).
///
/// Hosts that finish synchronously return [`RenderCompletion::ready`]; hosts
/// with a deferred pipeline return the receiving half of
/// [`RenderCompletion::channel`] and fire the [`RenderSignal`] later.
pub struct RenderCompletion {
    rx: Option<mpsc::Receiver<Result<(), String>>>,
}

/// Sending half of a [`RenderCompletion`].
pub struct RenderSignal {
    tx: mpsc::SyncSender<Result<(), String>>,
}

impl RenderCompletion {
    pub fn ready() -> Self {
        Self { rx: None }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        let (signal, completion) = Self::channel();
        signal.fail(message);
        completion
    }

    pub fn channel() -> (RenderSignal, RenderCompletion) {
        let (tx, rx) = mpsc::sync_channel(1);
        (RenderSignal { tx }, RenderCompletion { rx: Some(rx) })
    }

    /// Block until the host signals, for at most `timeout`.
    pub(crate) fn wait(self, what: &'static str, timeout: Duration) -> Result<(), CommandError> {
        let Some(rx) = self.rx else { return Ok(()) };
        match rx.recv_timeout(timeout) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(message)) => Err(CommandError::Host(message)),
            Err(mpsc::RecvTimeoutError::Timeout) => Err(CommandError::RenderTimeout {
                what,
                duration: timeout,
            }),
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(CommandError::Host(format!(
                "{} completion dropped without a result",
                what
            ))),
        }
    }
}

impl RenderSignal {
    pub fn complete(self) {
        let _ = self.tx.send(Ok(()));
    }

    pub fn fail(self, message: impl Into<String>) {
        let _ = self.tx.send(Err(message.into()));
    }
}

// ============================================================================
// Application context
// ============================================================================

/// Raw image handed to the editor's image-open entry point.
#[derive(Clone, Debug)]
pub struct InputImage {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub source_path: String,
}

/// The editor's image-open entry point (`openInput`).
pub trait InputOpener {
    fn open_input(&mut self, input: InputImage) -> RenderCompletion;
}

/// The editor's render pipeline (`updateGL`, `paintCanvas`).
pub trait RenderPipeline {
    /// Run a render pass over the current image and filter configuration.
    fn update_gl(&mut self) -> RenderCompletion;

    /// Synchronously paint the current frame into the readable buffer.
    /// Returns `false` when the pipeline has no painter.
    fn paint_canvas(&mut self) -> bool {
        false
    }

    /// Whether the reactive side of the pipeline has caught up with the last
    /// state change. Pipelines without reactive effects are always settled.
    fn is_settled(&self) -> bool {
        true
    }
}

/// Handle to the editor application. Every accessor may report absence.
pub trait AppContext: Send {
    fn input_opener(&mut self) -> Option<&mut dyn InputOpener> {
        None
    }

    fn render_pipeline(&mut self) -> Option<&mut dyn RenderPipeline> {
        None
    }

    fn filter_config(&self) -> Option<SharedFilterConfig> {
        None
    }

    /// Filters the host's image library actually provides, when it can say.
    fn filter_catalog(&self) -> Option<Vec<String>> {
        None
    }
}

// ============================================================================
// Rendering surface
// ============================================================================

/// GPU-backed pixel buffer. Rows are bottom-up with the origin at the
/// bottom-left corner, RGBA8.
pub trait AcceleratedSurface {
    /// Read a `width` x `height` block starting at `(x, y)`. Pixels outside
    /// the buffer read as zero; the result is always `width * height * 4`
    /// bytes.
    fn read_pixels(&self, x: u32, y: u32, width: u32, height: u32) -> Vec<u8>;
}

/// Immediate-mode 2D surface, top-down.
pub trait ImmediateSurface {
    fn snapshot(&self) -> RgbaImage;
}

pub trait Canvas {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn accelerated(&self) -> Option<&dyn AcceleratedSurface> {
        None
    }

    fn immediate(&self) -> Option<&dyn ImmediateSurface> {
        None
    }
}

/// DOM-like element lookup.
pub trait Document: Send {
    fn canvas(&self, id: &str) -> Option<&dyn Canvas>;
}

/// Presence check for well-known host globals.
pub trait GlobalProbe: Send {
    fn is_defined(&self, name: &str) -> bool;
}

/// Fixed set of defined globals.
#[derive(Clone, Debug, Default)]
pub struct StaticGlobals {
    names: Vec<String>,
}

impl StaticGlobals {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }
}

impl GlobalProbe for StaticGlobals {
    fn is_defined(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn select_sets_label_and_clears_skip() {
        let mut cfg = FilterConfig {
            skip: true,
            ..Default::default()
        };
        cfg.select("find_edges");
        assert_eq!(cfg.filter_type.as_deref(), Some("find_edges"));
        assert_eq!(cfg.filter_label.as_deref(), Some("Find_edges"));
        assert!(!cfg.skip);
        assert_eq!(cfg.active_filter(), Some("find_edges"));

        cfg.clear();
        assert_eq!(cfg, FilterConfig::default());
    }

    #[test]
    fn capitalize_handles_empty_and_unicode() {
        assert_eq!(capitalize(""), "");
        assert_eq!(capitalize("posterize"), "Posterize");
        assert_eq!(capitalize("émboss"), "Émboss");
    }

    #[test]
    fn completion_reports_timeout_and_failure() {
        assert!(RenderCompletion::ready().wait("updateGL", Duration::from_millis(1)).is_ok());

        let (_signal, pending) = RenderCompletion::channel();
        match pending.wait("updateGL", Duration::from_millis(5)) {
            Err(CommandError::RenderTimeout { what, .. }) => assert_eq!(what, "updateGL"),
            other => panic!("expected timeout, got {:?}", other),
        }

        let err = RenderCompletion::failed("shader compile")
            .wait("updateGL", Duration::from_millis(5))
            .unwrap_err();
        assert_eq!(err.to_string(), "Host render failed: shader compile");
    }

    #[test]
    fn dropped_signal_is_a_host_error() {
        let (signal, pending) = RenderCompletion::channel();
        drop(signal);
        assert!(matches!(
            pending.wait("openInput", Duration::from_secs(1)),
            Err(CommandError::Host(_))
        ));
    }

    #[test]
    fn static_globals_probe() {
        let globals = StaticGlobals::new(["loadPyodide"]);
        assert!(globals.is_defined("loadPyodide"));
        assert!(!globals.is_defined("RexxInterpreter"));
    }
}
