// ============================================================================
// Bridge settings: runtime tunables for the command channel
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

/// Runtime tunables for the command channel.
///
/// Stored as a plain `key = value` file. Unknown keys are ignored and values
/// that fail to parse keep their defaults.
#[derive(Clone, Debug, PartialEq)]
pub struct ControlSettings {
    /// Upper bound on waiting for the editor's reactive pipeline to observe a
    /// newly opened image before the explicit render pass.
    pub settle_timeout: Duration,
    /// Interval between `is_settled` polls.
    pub settle_poll_interval: Duration,
    /// Upper bound on any host render / hand-off completion.
    pub render_timeout: Duration,
    /// Pixels sampled by `get-canvas-data` when no count is given.
    pub default_sample: u32,
    pub max_sample: u32,
    /// Number of most-recent audit lines shown on the debug surface.
    pub audit_display_limit: usize,
    /// Base URL for relative image paths on the network byte source.
    pub network_base_url: Option<String>,
    /// Optional file mirror of the debug surface.
    pub debug_log_file: Option<PathBuf>,
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            settle_timeout: Duration::from_millis(2000),
            settle_poll_interval: Duration::from_millis(10),
            render_timeout: Duration::from_millis(10_000),
            default_sample: 10,
            max_sample: 4096,
            audit_display_limit: 100,
            network_base_url: None,
            debug_log_file: None,
        }
    }
}

impl ControlSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/photoeditor-bridge/bridge_settings.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\photoeditor-bridge\bridge_settings.cfg
    /// On macOS:   ~/Library/Application Support/photoeditor-bridge/bridge_settings.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").ok()?;
            return Some(
                PathBuf::from(appdata)
                    .join("photoeditor-bridge")
                    .join("bridge_settings.cfg"),
            );
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("photoeditor-bridge")
                    .join("bridge_settings.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("photoeditor-bridge").join("bridge_settings.cfg"))
        }
    }

    /// Load from the default location, or defaults if there is no file.
    pub fn load() -> Self {
        match Self::settings_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            match key {
                "settle_timeout_ms" => {
                    if let Ok(ms) = val.parse() {
                        s.settle_timeout = Duration::from_millis(ms);
                    }
                }
                "settle_poll_ms" => {
                    if let Ok(ms) = val.parse::<u64>() {
                        s.settle_poll_interval = Duration::from_millis(ms.max(1));
                    }
                }
                "render_timeout_ms" => {
                    if let Ok(ms) = val.parse() {
                        s.render_timeout = Duration::from_millis(ms);
                    }
                }
                "default_sample" => {
                    s.default_sample = val.parse().ok().filter(|n| *n > 0).unwrap_or(10);
                }
                "max_sample" => {
                    s.max_sample = val.parse().ok().filter(|n| *n > 0).unwrap_or(4096);
                }
                "audit_display_limit" => {
                    s.audit_display_limit = val.parse().unwrap_or(100);
                }
                "network_base_url" => {
                    s.network_base_url = (!val.is_empty()).then(|| val.to_string());
                }
                "debug_log_file" => {
                    s.debug_log_file = (!val.is_empty()).then(|| PathBuf::from(val));
                }
                _ => {}
            }
        }
        s.default_sample = s.default_sample.min(s.max_sample);
        s
    }

    pub fn save_to(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut out = String::new();
        out.push_str(&format!("settle_timeout_ms={}\n", self.settle_timeout.as_millis()));
        out.push_str(&format!("settle_poll_ms={}\n", self.settle_poll_interval.as_millis()));
        out.push_str(&format!("render_timeout_ms={}\n", self.render_timeout.as_millis()));
        out.push_str(&format!("default_sample={}\n", self.default_sample));
        out.push_str(&format!("max_sample={}\n", self.max_sample));
        out.push_str(&format!("audit_display_limit={}\n", self.audit_display_limit));
        out.push_str(&format!(
            "network_base_url={}\n",
            self.network_base_url.as_deref().unwrap_or("")
        ));
        out.push_str(&format!(
            "debug_log_file={}\n",
            self.debug_log_file
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_default()
        ));
        std::fs::write(path, out)
    }
}
