//! Process-wide discovery of dispatchers by channel name.
//!
//! Embedders that can pass a [`DispatcherHandle`] around should do so; this
//! registry exists for controllers that can only find the channel by name,
//! the way a script addresses `PHOTOEDITOR`.

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock};

use tracing::info;

use crate::audit::DebugSurface;
use crate::command::PHOTOEDITOR_CHANNEL;
use crate::dispatcher::{Dispatcher, DispatcherHandle, HostBindings};
use crate::settings::ControlSettings;

static SLOTS: OnceLock<Mutex<HashMap<String, DispatcherHandle>>> = OnceLock::new();
static SURFACES: OnceLock<Mutex<HashMap<String, DebugSurface>>> = OnceLock::new();

fn slots() -> &'static Mutex<HashMap<String, DispatcherHandle>> {
    SLOTS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Publish `handle` under `channel`, returning whatever it replaced.
pub fn register(channel: &str, handle: DispatcherHandle) -> Option<DispatcherHandle> {
    slots()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .insert(channel.to_string(), handle)
}

pub fn lookup(channel: &str) -> Option<DispatcherHandle> {
    slots()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .get(channel)
        .cloned()
}

pub fn unregister(channel: &str) -> Option<DispatcherHandle> {
    slots()
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .remove(channel)
}

/// The hidden debug surface for `channel`, created on first request and
/// shared by every later caller.
pub fn debug_surface(channel: &str) -> DebugSurface {
    SURFACES
        .get_or_init(|| Mutex::new(HashMap::new()))
        .lock()
        .unwrap_or_else(|e| e.into_inner())
        .entry(channel.to_string())
        .or_default()
        .clone()
}

/// Build, start and publish the `PHOTOEDITOR` dispatcher.
pub fn setup(host: HostBindings, settings: ControlSettings) -> std::io::Result<DispatcherHandle> {
    setup_on(PHOTOEDITOR_CHANNEL, host, settings)
}

/// [`setup`] for an arbitrary channel name. Replaces any earlier registration.
pub fn setup_on(
    channel: &str,
    host: HostBindings,
    settings: ControlSettings,
) -> std::io::Result<DispatcherHandle> {
    let surface = debug_surface(channel);
    if let Some(path) = &settings.debug_log_file {
        surface.mirror_to(path.clone());
    }

    let mut dispatcher = Dispatcher::new(host, settings);
    dispatcher.attach_debug_surface(surface);
    let handle = dispatcher.spawn()?;

    if let Some(previous) = register(channel, handle.clone()) {
        info!(channel, previous = %previous.id(), "replaced earlier registration");
    }
    info!(channel, dispatcher = %handle.id(), "handler registered");
    Ok(handle)
}
