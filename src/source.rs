// ============================================================================
// Byte acquisition: where `open-image` reads its bytes from
// ============================================================================
//
// Inside the desktop shell the path is a local file; inside a browser page it
// is a URL relative to the page. Which one applies is decided once, when the
// dispatcher is built, by probing the host's platform marker.

use std::path::Path;

use reqwest::Url;
use reqwest::blocking::Client;

use crate::error::CommandError;
use crate::host::GlobalProbe;

/// Global defined by the desktop shell.
pub const DESKTOP_SHELL_MARKER: &str = "__TAURI_INTERNALS__";

pub enum ByteSource {
    Filesystem,
    Network { client: Client, base: Option<Url> },
}

impl ByteSource {
    /// Filesystem when the desktop shell marker is defined, network otherwise.
    pub fn detect(globals: &dyn GlobalProbe, base_url: Option<&str>) -> Self {
        if globals.is_defined(DESKTOP_SHELL_MARKER) {
            ByteSource::Filesystem
        } else {
            Self::network(base_url)
        }
    }

    pub fn network(base_url: Option<&str>) -> Self {
        let base = base_url.and_then(|b| match Url::parse(b) {
            Ok(url) => Some(url),
            Err(e) => {
                tracing::warn!(base = b, error = %e, "ignoring invalid network base URL");
                None
            }
        });
        ByteSource::Network {
            client: Client::new(),
            base,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ByteSource::Filesystem => "filesystem",
            ByteSource::Network { .. } => "network",
        }
    }

    pub fn fetch(&self, path: &str) -> Result<Vec<u8>, CommandError> {
        match self {
            ByteSource::Filesystem => std::fs::read(Path::new(path))
                .map_err(|e| CommandError::ImageRead(format!("{}: {}", path, e))),
            ByteSource::Network { client, base } => {
                let url = resolve_url(path, base.as_ref())?;
                let response = client
                    .get(url)
                    .send()
                    .map_err(|e| CommandError::ImageRead(e.to_string()))?;
                let status = response.status();
                if !status.is_success() {
                    return Err(CommandError::ImageFetch {
                        status: status.as_u16(),
                    });
                }
                response
                    .bytes()
                    .map(|b| b.to_vec())
                    .map_err(|e| CommandError::ImageRead(e.to_string()))
            }
        }
    }
}

fn resolve_url(path: &str, base: Option<&Url>) -> Result<Url, CommandError> {
    match Url::parse(path) {
        Ok(url) => Ok(url),
        Err(_) => match base {
            Some(base) => base
                .join(path)
                .map_err(|e| CommandError::ImageRead(format!("{}: {}", path, e))),
            None => Err(CommandError::ImageRead(format!(
                "{}: relative URL without a network base URL",
                path
            ))),
        },
    }
}

/// Last `/`-separated segment of a path or URL.
pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
