//! Audit trail for the command channel.
//!
//! Every command and every failure becomes one timestamped [`AuditEntry`].
//! The full sequence lives in memory for the dispatcher's lifetime; the most
//! recent lines are mirrored onto a [`DebugSurface`], a hidden text sink that
//! an automated driver can read without access to the dispatcher itself.

use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AuditEntry {
    /// RFC 3339 / ISO-8601, millisecond precision, UTC.
    pub timestamp: String,
    pub text: String,
}

impl AuditEntry {
    pub fn now(text: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            text: text.into(),
        }
    }
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.timestamp, self.text)
    }
}

// ============================================================================
// Debug surface
// ============================================================================

/// Hidden text sink mirroring the tail of an audit log.
///
/// Cloning shares the same underlying text, so a surface created once per
/// channel is reused by every dispatcher later set up on it.
#[derive(Clone, Debug, Default)]
pub struct DebugSurface {
    inner: Arc<Mutex<SurfaceState>>,
}

#[derive(Debug, Default)]
struct SurfaceState {
    text: String,
    mirror: Option<PathBuf>,
}

impl DebugSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Also write every update to `path` (truncated on each update), for
    /// drivers that can only inspect files.
    pub fn mirror_to(&self, path: PathBuf) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        state.mirror = Some(path);
        let text = state.text.clone();
        write_mirror(state.mirror.as_ref(), &text);
    }

    pub fn text(&self) -> String {
        self.inner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .text
            .clone()
    }

    pub fn set_text(&self, text: String) {
        let mut state = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        write_mirror(state.mirror.as_ref(), &text);
        state.text = text;
    }

    pub fn same_as(&self, other: &DebugSurface) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

fn write_mirror(path: Option<&PathBuf>, text: &str) {
    let Some(path) = path else { return };
    if let Some(parent) = path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(path);
    match file {
        Ok(mut f) => {
            let _ = f.write_all(text.as_bytes());
        }
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "debug log mirror unavailable"),
    }
}

// ============================================================================
// Audit log
// ============================================================================

#[derive(Debug)]
pub struct AuditLog {
    entries: Vec<AuditEntry>,
    display_limit: usize,
    surface: Option<DebugSurface>,
}

impl AuditLog {
    pub fn new(display_limit: usize) -> Self {
        Self {
            entries: Vec::new(),
            display_limit,
            surface: None,
        }
    }

    pub fn attach_surface(&mut self, surface: DebugSurface) {
        self.surface = Some(surface);
        self.refresh_surface();
    }

    pub fn record(&mut self, text: impl Into<String>) {
        let entry = AuditEntry::now(text);
        tracing::debug!(target: "photoeditor::audit", "{}", entry.text);
        self.entries.push(entry);
        self.refresh_surface();
    }

    pub fn entries(&self) -> &[AuditEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries except the newest `skip_last`, newline-joined.
    pub fn render(&self, skip_last: usize) -> String {
        let end = self.entries.len().saturating_sub(skip_last);
        join_lines(&self.entries[..end])
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        if let Some(surface) = &self.surface {
            surface.set_text(String::new());
        }
    }

    fn refresh_surface(&self) {
        let Some(surface) = &self.surface else { return };
        let start = self.entries.len().saturating_sub(self.display_limit);
        surface.set_text(join_lines(&self.entries[start..]));
    }
}

fn join_lines(entries: &[AuditEntry]) -> String {
    entries
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entries_render_with_iso_timestamp() {
        let entry = AuditEntry::now("Command: get-canvas {}");
        assert!(entry.timestamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(&entry.timestamp).is_ok());
        assert_eq!(
            entry.to_string(),
            format!("[{}] Command: get-canvas {{}}", entry.timestamp)
        );
    }

    #[test]
    fn surface_shows_only_recent_tail_but_log_keeps_all() {
        let surface = DebugSurface::new();
        let mut log = AuditLog::new(3);
        log.attach_surface(surface.clone());
        for i in 0..5 {
            log.record(format!("line {}", i));
        }
        assert_eq!(log.len(), 5);
        let shown = surface.text();
        assert_eq!(shown.lines().count(), 3);
        assert!(shown.lines().next().unwrap().ends_with("line 2"));
        assert!(log.render(0).lines().next().unwrap().ends_with("line 0"));
    }

    #[test]
    fn render_can_exclude_trailing_entries() {
        let mut log = AuditLog::new(100);
        log.record("a");
        log.record("b");
        assert_eq!(log.render(1).lines().count(), 1);
        assert_eq!(log.render(5), "");
    }

    #[test]
    fn clear_empties_log_and_surface() {
        let surface = DebugSurface::new();
        let mut log = AuditLog::new(100);
        log.attach_surface(surface.clone());
        log.record("a");
        log.clear();
        assert!(log.is_empty());
        assert_eq!(surface.text(), "");
    }

    #[test]
    fn mirror_file_tracks_surface() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rexx-debug-log.txt");
        let surface = DebugSurface::new();
        surface.mirror_to(path.clone());
        surface.set_text("hello".into());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello");
        surface.set_text(String::new());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn cloned_surfaces_are_the_same_sink() {
        let a = DebugSurface::new();
        let b = a.clone();
        b.set_text("x".into());
        assert_eq!(a.text(), "x");
        assert!(a.same_as(&b));
        assert!(!a.same_as(&DebugSurface::new()));
    }
}
