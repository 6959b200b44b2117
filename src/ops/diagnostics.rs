// ============================================================================
// check-pyodide / get-debug-log / clear-debug-log
// ============================================================================

use tracing::info;

use crate::audit::AuditLog;
use crate::host::GlobalProbe;
use crate::output::{CommandOutput, RuntimeStatus};

pub const PYODIDE_LOADER: &str = "loadPyodide";
pub const PYODIDE_HANDLER: &str = "ADDRESS_PYODIDE_HANDLER";
pub const REXX_INTERPRETER: &str = "RexxInterpreter";

pub fn check_pyodide(globals: &dyn GlobalProbe) -> CommandOutput {
    let status = RuntimeStatus {
        load_pyodide: globals.is_defined(PYODIDE_LOADER),
        pyodide_handler: globals.is_defined(PYODIDE_HANDLER),
        rexx_bundle: globals.is_defined(REXX_INTERPRETER),
    };
    info!(?status, "runtime status");
    CommandOutput::RuntimeStatus(status)
}

/// Everything logged before the current command.
pub fn get_debug_log(audit: &AuditLog) -> CommandOutput {
    CommandOutput::DebugLog(audit.render(1))
}

pub fn clear_debug_log(audit: &mut AuditLog) -> CommandOutput {
    audit.clear();
    CommandOutput::LogCleared
}
