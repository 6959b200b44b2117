//! Session logger: routes `tracing` output to a single file in the OS data
//! directory.
//!
//! The file is **truncated (overwritten) at each launch**, so it only ever
//! contains output from the most-recent session.
//!
//! Log location:
//!   Windows:  `%APPDATA%\photoeditor-bridge\bridge.log`
//!   Linux:    `~/.local/share/photoeditor-bridge/bridge.log`
//!   macOS:    `~/Library/Application Support/photoeditor-bridge/bridge.log`
//!
//! Verbosity follows `RUST_LOG` and defaults to `info`. If the file cannot be
//! opened, output goes to stderr instead.

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};

use tracing_subscriber::EnvFilter;

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Returns the path to the current session log file.
pub fn log_path() -> Option<&'static PathBuf> {
    LOG_PATH.get()
}

/// Initialise the session logger in the platform data directory.
///
/// Safe to call more than once; only the first subscriber is installed.
pub fn init() {
    init_at(&log_file_path());
}

/// [`init`] with an explicit log file.
pub fn init_at(path: &Path) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = match open_truncated(path) {
        Ok(file) => {
            let _ = LOG_PATH.set(path.to_path_buf());
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_thread_names(true)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        Err(e) => {
            eprintln!("[logger] Failed to open log file {:?}: {}", path, e);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init()
                .is_ok()
        }
    };
    if !installed {
        return;
    }

    tracing::info!(
        started = %chrono::Local::now().to_rfc3339(),
        log_file = %path.display(),
        "=== photoeditor-bridge session started ==="
    );

    // Mirror panics to the log, then run the default handler.
    let prev = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        tracing::error!("PANIC: {}", info);
        prev(info);
    }));
}

fn open_truncated(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path)
}

fn log_file_path() -> PathBuf {
    data_dir().join("photoeditor-bridge").join("bridge.log")
}

/// Platform data directory (without the app sub-folder).
fn data_dir() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return PathBuf::from(appdata);
        }
    }
    #[cfg(target_os = "macos")]
    {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(home)
                .join("Library")
                .join("Application Support");
        }
    }
    // Linux / fallback
    if let Ok(xdg) = std::env::var("XDG_DATA_HOME") {
        return PathBuf::from(xdg);
    }
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".local").join("share");
    }
    // Last resort: current working directory
    PathBuf::from(".")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_lives_under_app_folder() {
        let path = log_file_path();
        assert!(path.ends_with(Path::new("photoeditor-bridge").join("bridge.log")));
    }

    #[test]
    fn open_truncated_discards_previous_session() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("bridge.log");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "old session").unwrap();
        drop(open_truncated(&path).unwrap());
        assert_eq!(fs::read_to_string(&path).unwrap(), "");
    }
}
