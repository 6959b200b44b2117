//! Remote-control command channel for an image editor.
//!
//! External controllers (scripts, test harnesses, a REXX-style `ADDRESS
//! PHOTOEDITOR` environment) send a command identifier plus a JSON parameter
//! bag and get back a string result or a [`CommandError`]. Commands run one
//! at a time against the host editor, which is described by the traits in
//! [`host`]; [`headless`] provides an in-memory editor for tools and tests.
//!
//! ```no_run
//! use photoeditor_bridge::{ControlSettings, headless::{HeadlessEditor, SurfaceKind}};
//! use photoeditor_bridge::host::StaticGlobals;
//! use serde_json::json;
//!
//! let settings = ControlSettings::load();
//! let editor = HeadlessEditor::new(SurfaceKind::Accelerated, 640, 480);
//! let handle = photoeditor_bridge::setup(editor.bindings(StaticGlobals::default(), &settings), settings)?;
//! let reply = handle.call("get-canvas-data", json!({ "sample": 4 }));
//! # Ok::<(), std::io::Error>(())
//! ```

pub mod audit;
pub mod command;
pub mod dispatcher;
pub mod error;
pub mod headless;
pub mod host;
pub mod logger;
pub mod ops;
pub mod output;
pub mod readback;
pub mod registry;
pub mod script;
pub mod settings;
pub mod source;

pub use command::{Command, PHOTOEDITOR_CHANNEL, PILLOW_FILTERS};
pub use dispatcher::{Dispatcher, DispatcherHandle, HostBindings, PendingReply};
pub use error::CommandError;
pub use output::{CommandOutput, RuntimeStatus};
pub use registry::{lookup, setup, setup_on};
pub use settings::ControlSettings;
pub use source::ByteSource;
