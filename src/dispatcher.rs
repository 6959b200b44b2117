// ============================================================================
// Dispatcher: a single worker draining the command queue
// ============================================================================
//
// The editor's state and filter configuration are shared and unsynchronized
// on the host side, so commands must never interleave. `Dispatcher::run`
// takes `&mut self`; `Dispatcher::spawn` moves the dispatcher onto a single
// worker thread that drains a channel, so every handle feeds the same queue.

use std::sync::mpsc;
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info_span, warn};
use uuid::Uuid;

use crate::audit::{AuditLog, DebugSurface};
use crate::command::Command;
use crate::error::CommandError;
use crate::host::{AppContext, Document, GlobalProbe};
use crate::ops;
use crate::output::CommandOutput;
use crate::settings::ControlSettings;
use crate::source::ByteSource;

/// Everything the dispatcher reaches on the host side.
pub struct HostBindings {
    pub app: Box<dyn AppContext>,
    pub document: Box<dyn Document>,
    pub globals: Box<dyn GlobalProbe>,
    pub bytes: ByteSource,
}

impl HostBindings {
    /// Bind host objects; the byte source is chosen here, once, from the
    /// host's platform marker.
    pub fn new(
        app: Box<dyn AppContext>,
        document: Box<dyn Document>,
        globals: Box<dyn GlobalProbe>,
        settings: &ControlSettings,
    ) -> Self {
        let bytes = ByteSource::detect(&*globals, settings.network_base_url.as_deref());
        Self {
            app,
            document,
            globals,
            bytes,
        }
    }
}

pub struct Dispatcher {
    host: HostBindings,
    settings: ControlSettings,
    audit: AuditLog,
}

impl Dispatcher {
    pub fn new(host: HostBindings, settings: ControlSettings) -> Self {
        let audit = AuditLog::new(settings.audit_display_limit);
        Self {
            host,
            settings,
            audit,
        }
    }

    pub fn attach_debug_surface(&mut self, surface: DebugSurface) {
        self.audit.attach_surface(surface);
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// Run one command to completion on the calling thread.
    pub fn run(&mut self, identifier: &str, params: &Value) -> Result<CommandOutput, CommandError> {
        self.run_ticket(Uuid::new_v4(), identifier, params)
    }

    fn run_ticket(
        &mut self,
        ticket: Uuid,
        identifier: &str,
        params: &Value,
    ) -> Result<CommandOutput, CommandError> {
        let span = info_span!("command", %ticket, identifier = identifier.trim());
        let _enter = span.enter();

        self.audit
            .record(format!("Command: {} {}", identifier, params_for_log(params)));

        let result = Command::parse(identifier, params).and_then(|command| self.execute(command));
        if let Err(e) = &result {
            warn!(kind = e.kind(), error = %e, "command failed");
            self.audit.record(format!("ERROR: {}", e));
        }
        result
    }

    fn execute(&mut self, command: Command) -> Result<CommandOutput, CommandError> {
        debug!(command = command.name(), "dispatching");
        let host = &mut self.host;
        let settings = &self.settings;
        match command {
            Command::OpenImage { path } => ops::image_load::open_image(host, settings, &path),
            Command::GetCanvas => ops::canvas_read::get_canvas(host),
            Command::GetCanvasData { sample } => {
                ops::canvas_read::get_canvas_data(host, settings, sample)
            }
            Command::ApplyPillowFilter { filter } => {
                ops::filters::apply_pillow_filter(host, settings, &filter)
            }
            Command::ListPillowFilters => Ok(ops::filters::list_pillow_filters(&*host.app)),
            Command::ResetPillow => ops::filters::reset_pillow(host, settings),
            Command::CheckPyodide => Ok(ops::diagnostics::check_pyodide(&*host.globals)),
            Command::GetDebugLog => Ok(ops::diagnostics::get_debug_log(&self.audit)),
            Command::ClearDebugLog => Ok(ops::diagnostics::clear_debug_log(&mut self.audit)),
        }
    }

    /// Move the dispatcher onto its own worker thread.
    ///
    /// The worker drains commands in arrival order and exits once every
    /// [`DispatcherHandle`] has been dropped.
    pub fn spawn(self) -> std::io::Result<DispatcherHandle> {
        let (tx, rx) = mpsc::channel::<Job>();
        let id = Uuid::new_v4();
        std::thread::Builder::new()
            .name("photoeditor-dispatch".to_string())
            .spawn(move || {
                let mut dispatcher = self;
                while let Ok(job) = rx.recv() {
                    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                        dispatcher.run_ticket(job.ticket, &job.identifier, &job.params)
                    }));
                    let result = match outcome {
                        Ok(result) => result,
                        Err(_panic) => {
                            let err = CommandError::Host(format!(
                                "command '{}' panicked inside the host",
                                job.identifier.trim()
                            ));
                            dispatcher.audit.record(format!("ERROR: {}", err));
                            Err(err)
                        }
                    };
                    let _ = job.reply.send(result);
                }
                debug!(dispatcher = %id, "all handles dropped; dispatcher stopped");
            })?;
        Ok(DispatcherHandle { tx, id })
    }
}

/// JSON snapshot of the parameters for the audit line. Never fails.
fn params_for_log(params: &Value) -> String {
    if params.is_null() {
        return "{}".to_string();
    }
    serde_json::to_string(params).unwrap_or_else(|_| "<unprintable params>".to_string())
}

// ============================================================================
// Handles
// ============================================================================

struct Job {
    ticket: Uuid,
    identifier: String,
    params: Value,
    reply: mpsc::Sender<Result<CommandOutput, CommandError>>,
}

/// Cheap, cloneable entry point to a running dispatcher.
#[derive(Clone)]
pub struct DispatcherHandle {
    tx: mpsc::Sender<Job>,
    id: Uuid,
}

impl DispatcherHandle {
    /// Queue a command. The reply arrives once every earlier command has
    /// finished.
    pub fn run(&self, identifier: &str, params: Value) -> PendingReply {
        let ticket = Uuid::new_v4();
        let (reply, rx) = mpsc::channel();
        // A dead worker drops the job, and with it `reply`; the caller then
        // sees `Disconnected`.
        let _ = self.tx.send(Job {
            ticket,
            identifier: identifier.to_string(),
            params,
            reply,
        });
        PendingReply { ticket, rx }
    }

    pub fn call(&self, identifier: &str, params: Value) -> Result<CommandOutput, CommandError> {
        self.run(identifier, params).wait()
    }

    /// Identity of the worker behind this handle.
    pub fn id(&self) -> Uuid {
        self.id
    }
}

impl std::fmt::Debug for DispatcherHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DispatcherHandle").field("id", &self.id).finish()
    }
}

/// Reply to a queued command.
pub struct PendingReply {
    ticket: Uuid,
    rx: mpsc::Receiver<Result<CommandOutput, CommandError>>,
}

impl PendingReply {
    pub fn ticket(&self) -> Uuid {
        self.ticket
    }

    pub fn wait(self) -> Result<CommandOutput, CommandError> {
        self.rx.recv().unwrap_or(Err(CommandError::Disconnected))
    }

    /// Wait at most `timeout`. The command itself keeps running on the
    /// worker either way.
    pub fn wait_timeout(self, timeout: Duration) -> Result<CommandOutput, CommandError> {
        match self.rx.recv_timeout(timeout) {
            Ok(result) => result,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                Err(CommandError::ReplyTimeout { waited: timeout })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(CommandError::Disconnected),
        }
    }
}
