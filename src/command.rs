// ============================================================================
// Command parsing: identifier + untyped parameter bag → typed Command
// ============================================================================
//
// Controllers send a free-form command name and a JSON-like parameter map.
// Legacy callers pass the single argument under a generic `code` key, so
// every parameter also accepts `code` as an alias. All of that is resolved
// here, once, before any handler runs.

use serde_json::Value;

use crate::error::CommandError;

/// Name under which the dispatcher is published.
pub const PHOTOEDITOR_CHANNEL: &str = "PHOTOEDITOR";

/// Legacy alias key accepted for every single-argument command.
const CODE_KEY: &str = "code";

/// Filters the external image library is assumed to provide.
pub const PILLOW_FILTERS: [&str; 12] = [
    "blur",
    "sharpen",
    "emboss",
    "find_edges",
    "contour",
    "detail",
    "smooth",
    "edge_enhance",
    "autocontrast",
    "equalize",
    "posterize",
    "solarize",
];

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    OpenImage { path: String },
    GetCanvas,
    /// `sample: None` means "use the configured default".
    GetCanvasData { sample: Option<u32> },
    ApplyPillowFilter { filter: String },
    ListPillowFilters,
    ResetPillow,
    CheckPyodide,
    GetDebugLog,
    ClearDebugLog,
}

impl Command {
    /// Trimmed, lower-cased form of a raw identifier.
    pub fn normalize(identifier: &str) -> String {
        identifier.trim().to_lowercase()
    }

    /// Parse a raw identifier and parameter bag.
    ///
    /// An identifier such as `"apply-pillow-filter posterize"` carries its
    /// argument inline; the remainder is used as the `code` parameter unless
    /// the bag already has one.
    pub fn parse(identifier: &str, params: &Value) -> Result<Command, CommandError> {
        let normalized = Self::normalize(identifier);
        let (name, inline) = match normalized.split_once(char::is_whitespace) {
            Some((name, _)) => (name, inline_argument(identifier)),
            None => (normalized.as_str(), None),
        };
        let args = Args {
            params,
            inline: inline.as_deref(),
        };

        match name {
            "open-image" => Ok(Command::OpenImage {
                path: args
                    .text("path")
                    .ok_or(CommandError::MissingParameter("image path"))?,
            }),
            "get-canvas" => Ok(Command::GetCanvas),
            "get-canvas-data" => Ok(Command::GetCanvasData {
                sample: args.positive_int("sample")?,
            }),
            "apply-pillow-filter" => Ok(Command::ApplyPillowFilter {
                filter: args
                    .text("filter")
                    .ok_or(CommandError::MissingParameter("filter type"))?,
            }),
            "list-pillow-filters" => Ok(Command::ListPillowFilters),
            "reset-pillow" => Ok(Command::ResetPillow),
            "check-pyodide" => Ok(Command::CheckPyodide),
            "get-debug-log" => Ok(Command::GetDebugLog),
            "clear-debug-log" => Ok(Command::ClearDebugLog),
            _ => Err(CommandError::UnknownCommand(normalized.clone())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::OpenImage { .. } => "open-image",
            Command::GetCanvas => "get-canvas",
            Command::GetCanvasData { .. } => "get-canvas-data",
            Command::ApplyPillowFilter { .. } => "apply-pillow-filter",
            Command::ListPillowFilters => "list-pillow-filters",
            Command::ResetPillow => "reset-pillow",
            Command::CheckPyodide => "check-pyodide",
            Command::GetDebugLog => "get-debug-log",
            Command::ClearDebugLog => "clear-debug-log",
        }
    }
}

/// The inline argument with its original casing (paths and filter ids are
/// case-sensitive even though command names are not).
fn inline_argument(raw: &str) -> Option<String> {
    raw.trim()
        .split_once(char::is_whitespace)
        .map(|(_, rest)| rest.trim().to_string())
}

struct Args<'a> {
    params: &'a Value,
    inline: Option<&'a str>,
}

impl Args<'_> {
    /// First non-null value under `key`, then `code`, then the inline argument.
    fn lookup(&self, key: &str) -> Option<Value> {
        let from_bag = |k: &str| {
            self.params
                .get(k)
                .filter(|v| !matches!(v, Value::Null | Value::Bool(false)) && v.as_str() != Some(""))
                .cloned()
        };
        from_bag(key)
            .or_else(|| from_bag(CODE_KEY))
            .or_else(|| self.inline.map(|s| Value::String(s.to_string())))
    }

    fn text(&self, key: &str) -> Option<String> {
        let text = match self.lookup(key)? {
            Value::String(s) => s,
            Value::Number(n) => n.to_string(),
            _ => return None,
        };
        (!text.is_empty()).then_some(text)
    }

    fn positive_int(&self, key: &'static str) -> Result<Option<u32>, CommandError> {
        let Some(value) = self.lookup(key) else { return Ok(None) };
        let invalid = |reason: String| CommandError::InvalidParameter { name: key, reason };
        let n = match &value {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| invalid(format!("expected a positive integer, got {}", n)))?,
            Value::String(s) if s.trim().is_empty() => return Ok(None),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| invalid(format!("expected a positive integer, got '{}'", s)))?,
            other => return Err(invalid(format!("expected a positive integer, got {}", other))),
        };
        if n == 0 {
            return Err(invalid("must be at least 1".to_string()));
        }
        u32::try_from(n)
            .map(Some)
            .map_err(|_| invalid(format!("{} is too large", n)))
    }
}
