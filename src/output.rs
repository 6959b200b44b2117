// ============================================================================
// Command results: typed outputs with the legacy string rendering
// ============================================================================

use std::fmt;

use serde::Serialize;

/// Presence of the scripting runtimes the editor can host.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeStatus {
    pub load_pyodide: bool,
    pub pyodide_handler: bool,
    pub rexx_bundle: bool,
}

/// Result of one command.
///
/// `Display` renders the plain-string contract scripting controllers expect
/// (`"OK - Image loaded: 640x480"`, a JSON array of pixel tuples, ...).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommandOutput {
    ImageLoaded { width: u32, height: u32 },
    /// `data:image/png;base64,...`
    CanvasImage { data_url: String },
    /// RGBA tuples read left to right from `origin` (surface coordinates).
    PixelSample { origin: (u32, u32), tuples: Vec<[u8; 4]> },
    FilterApplied { name: String },
    FilterReset,
    FilterCatalog(Vec<String>),
    RuntimeStatus(RuntimeStatus),
    DebugLog(String),
    LogCleared,
}

impl fmt::Display for CommandOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CommandOutput::ImageLoaded { width, height } => {
                write!(f, "OK - Image loaded: {}x{}", width, height)
            }
            CommandOutput::CanvasImage { data_url } => f.write_str(data_url),
            CommandOutput::PixelSample { tuples, .. } => f.write_str(&to_json(tuples)),
            CommandOutput::FilterApplied { name } => write!(f, "OK - Filter applied: {}", name),
            CommandOutput::FilterReset => f.write_str("OK - Pillow filter reset"),
            CommandOutput::FilterCatalog(names) => f.write_str(&names.join(", ")),
            CommandOutput::RuntimeStatus(status) => f.write_str(&to_json(status)),
            CommandOutput::DebugLog(text) => f.write_str(text),
            CommandOutput::LogCleared => f.write_str("OK"),
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "null".to_string())
}
