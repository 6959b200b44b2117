// ============================================================================
// Scripting bridge: `photoeditor(...)` for sandboxed Rhai scripts
// ============================================================================
//
// Scripts drive the editor through the command channel the same way an
// external controller does:
//
//   photoeditor("open-image", #{ path: "/Testcard_F.jpg" });
//   let before = photoeditor("get-canvas-data", #{ sample: 10 });
//   photoeditor("apply-pillow-filter posterize");
//
// Each call queues one command on the dispatcher and blocks the script until
// the reply arrives. Failures surface as Rhai runtime errors.

use std::sync::{Arc, Mutex};

use rhai::{Dynamic, Engine, EvalAltResult, Map, Position, Scope};
use serde_json::Value;

use crate::dispatcher::DispatcherHandle;

// ============================================================================
// Error type
// ============================================================================

#[derive(Debug, Clone)]
pub struct ScriptError {
    pub message: String,
    pub line: Option<usize>,
    pub column: Option<usize>,
}

impl ScriptError {
    fn at(message: String, pos: Position) -> Self {
        Self {
            message,
            line: pos.line().filter(|l| *l > 0),
            column: pos.position().filter(|c| *c > 0),
        }
    }

    /// Error explanation with line/column context and a hint.
    pub fn friendly_message(&self) -> String {
        let raw = &self.message;
        let mut parts = Vec::new();

        match (self.line, self.column) {
            (Some(line), Some(col)) => parts.push(format!("Error on line {}, column {}:", line, col)),
            (Some(line), None) => parts.push(format!("Error on line {}:", line)),
            _ => parts.push("Script error:".to_string()),
        }

        let cleaned = raw.split(" (line ").next().unwrap_or(raw);
        if raw.contains("Function not found: photoeditor") {
            parts.push(format!("  {}", cleaned));
            parts.push(String::new());
            parts.push("  Tip: photoeditor takes a command string and an optional map:".to_string());
            parts.push("    photoeditor(\"get-canvas-data\", #{ sample: 10 });".to_string());
        } else if raw.contains("Syntax error") || raw.contains("Expected") {
            parts.push(format!("  Syntax error: {}", cleaned));
            parts.push(String::new());
            parts.push(
                "  Tip: Check for missing semicolons, brackets, or typos near this line."
                    .to_string(),
            );
        } else if raw.contains("Too many operations") {
            parts.push(
                "  Script exceeded the maximum operation limit (50 million ops).".to_string(),
            );
        } else if let Some(failure) = cleaned.strip_prefix("Runtime error: ") {
            parts.push(format!("  PHOTOEDITOR command failed: {}", failure));
        } else {
            parts.push(format!("  {}", cleaned));
        }

        parts.join("\n")
    }
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let (Some(line), Some(col)) = (self.line, self.column) {
            write!(f, "Line {}, Col {}: {}", line, col, self.message)
        } else if let Some(line) = self.line {
            write!(f, "Line {}: {}", line, self.message)
        } else {
            write!(f, "{}", self.message)
        }
    }
}

impl std::error::Error for ScriptError {}

// ============================================================================
// Engine construction
// ============================================================================

/// Convert a Rhai parameter map to JSON. Entries that cannot be converted are
/// dropped (and logged) rather than failing the call.
fn map_to_json(params: Map) -> Value {
    let mut out = serde_json::Map::new();
    for (key, value) in params {
        match rhai::serde::from_dynamic::<Value>(&value) {
            Ok(json) => {
                out.insert(key.to_string(), json);
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "dropping unconvertible script parameter");
            }
        }
    }
    Value::Object(out)
}

fn call(
    handle: &DispatcherHandle,
    command: &str,
    params: Value,
) -> Result<String, Box<EvalAltResult>> {
    handle
        .call(command, params)
        .map(|output| output.to_string())
        .map_err(|e| e.to_string().into())
}

/// Install `photoeditor(command)` and `photoeditor(command, params)`.
pub fn register_photoeditor_api(engine: &mut Engine, handle: DispatcherHandle) {
    let h = handle.clone();
    engine.register_fn(
        "photoeditor",
        move |command: &str| -> Result<String, Box<EvalAltResult>> {
            call(&h, command, Value::Object(serde_json::Map::new()))
        },
    );

    let h = handle;
    engine.register_fn(
        "photoeditor",
        move |command: &str, params: Map| -> Result<String, Box<EvalAltResult>> {
            call(&h, command, map_to_json(params))
        },
    );
}

/// Sandboxed engine with the `photoeditor` API; `print` output goes to `console`.
fn create_engine(handle: DispatcherHandle, console: Arc<Mutex<Vec<String>>>) -> Engine {
    let mut engine = Engine::new();

    engine.set_max_operations(50_000_000);
    engine.set_max_call_levels(64);
    engine.set_max_expr_depths(64, 64);
    engine.set_max_string_size(10_000_000);
    engine.set_max_array_size(10_000);
    engine.set_max_map_size(1_000);

    let out = console.clone();
    engine.on_print(move |line| {
        out.lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(line.to_string());
    });
    engine.on_debug(move |line, _source, pos| {
        tracing::debug!(target: "photoeditor::script", %pos, "{}", line);
    });

    register_photoeditor_api(&mut engine, handle);
    engine
}

/// Run `source` against the dispatcher behind `handle` on the calling thread.
/// Returns everything the script printed.
pub fn run_script(source: &str, handle: &DispatcherHandle) -> Result<Vec<String>, ScriptError> {
    let console = Arc::new(Mutex::new(Vec::new()));
    let engine = create_engine(handle.clone(), console.clone());
    let mut scope = Scope::new();

    let ast = engine
        .compile(source)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;
    engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))?;

    let lines = console.lock().unwrap_or_else(|e| e.into_inner()).clone();
    Ok(lines)
}

/// Evaluate a single expression and return its value as a string.
pub fn eval_expression(source: &str, handle: &DispatcherHandle) -> Result<String, ScriptError> {
    let engine = create_engine(handle.clone(), Arc::new(Mutex::new(Vec::new())));
    engine
        .eval::<Dynamic>(source)
        .map(|value| value.to_string())
        .map_err(|e| ScriptError::at(e.to_string(), e.position()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn friendly_message_for_command_failures() {
        let err = ScriptError {
            message: "Runtime error: Unknown command: frobnicate (line 1, position 1)".into(),
            line: Some(1),
            column: Some(1),
        };
        let msg = err.friendly_message();
        assert!(msg.starts_with("Error on line 1, column 1:"));
        assert!(msg.contains("PHOTOEDITOR command failed: Unknown command: frobnicate"));
    }

    #[test]
    fn display_includes_location() {
        let err = ScriptError {
            message: "boom".into(),
            line: Some(3),
            column: None,
        };
        assert_eq!(err.to_string(), "Line 3: boom");
    }

    #[test]
    fn map_conversion_keeps_scalars() {
        let mut map = Map::new();
        map.insert("sample".into(), Dynamic::from(10_i64));
        map.insert("path".into(), Dynamic::from("/a.png".to_string()));
        let json = map_to_json(map);
        assert_eq!(json["sample"], 10);
        assert_eq!(json["path"], "/a.png");
    }
}
