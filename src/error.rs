//! Error taxonomy for the PHOTOEDITOR command channel.

use std::time::Duration;

use thiserror::Error;

/// Failures a command can report back to the controller.
///
/// Every variant is raised by a handler (or by the parse step in front of
/// it) and reaches the caller unchanged; the dispatcher mirrors the message
/// into the audit log before returning it.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The identifier does not name a supported command.
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A required parameter was absent or empty.
    #[error("Missing {0}")]
    MissingParameter(&'static str),

    /// A parameter was present but not usable.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// A host capability the command needs is not exposed.
    #[error("App {0} not available")]
    CapabilityUnavailable(&'static str),

    #[error("Canvas not found")]
    CanvasNotFound,

    #[error("WebGL context not found")]
    WebGlContextNotFound,

    /// The network byte source answered with a non-success status.
    #[error("Failed to load image: HTTP {status}")]
    ImageFetch { status: u16 },

    /// The bytes could not be read at all (I/O or transport failure).
    #[error("Failed to load image: {0}")]
    ImageRead(String),

    #[error("Failed to load image: {0}")]
    ImageDecode(String),

    /// A host step of `open-image` failed after the bytes were decoded.
    #[error("Failed to load image: {0}")]
    ImageLoad(#[source] Box<CommandError>),

    /// The canvas snapshot could not be encoded.
    #[error("Failed to encode canvas: {0}")]
    Encode(String),

    /// A host render did not finish in time.
    #[error("{what} did not complete within {duration:?}")]
    RenderTimeout { what: &'static str, duration: Duration },

    /// The caller stopped waiting for a reply; the command itself still runs.
    #[error("No reply within {waited:?}")]
    ReplyTimeout { waited: Duration },

    /// The host reported a failure from an asynchronous render step.
    #[error("Host render failed: {0}")]
    Host(String),

    /// The dispatcher worker is gone.
    #[error("PHOTOEDITOR dispatcher is no longer running")]
    Disconnected,
}

impl CommandError {
    /// Stable machine-readable name of the variant, used as a tracing field.
    pub fn kind(&self) -> &'static str {
        match self {
            CommandError::UnknownCommand(_) => "UnknownCommand",
            CommandError::MissingParameter(_) => "MissingParameter",
            CommandError::InvalidParameter { .. } => "InvalidParameter",
            CommandError::CapabilityUnavailable(_) => "CapabilityUnavailable",
            CommandError::CanvasNotFound => "CanvasNotFound",
            CommandError::WebGlContextNotFound => "WebGLContextNotFound",
            CommandError::ImageFetch { .. } => "ImageFetchError",
            CommandError::ImageRead(_) => "ImageReadError",
            CommandError::ImageDecode(_) => "ImageDecodeError",
            CommandError::ImageLoad(inner) => inner.kind(),
            CommandError::Encode(_) => "EncodeError",
            CommandError::RenderTimeout { .. } => "RenderTimeout",
            CommandError::ReplyTimeout { .. } => "ReplyTimeout",
            CommandError::Host(_) => "HostError",
            CommandError::Disconnected => "Disconnected",
        }
    }
}
