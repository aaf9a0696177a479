//! Media server configuration resolution
//!
//! Resolves the catalog base URL and media URL segment following the
//! priority order used across Lectern modules:
//! 1. Explicit argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)
//!
//! A missing or unreadable config file never aborts startup; it degrades
//! to the next tier with a warning.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::warn;

use crate::Result;

/// Environment variable overriding the catalog base URL
pub const ENV_MEDIA_SERVER: &str = "LECTERN_MEDIA_SERVER";
/// Environment variable overriding the media URL segment
pub const ENV_MEDIA_SEGMENT: &str = "LECTERN_MEDIA_SEGMENT";

const DEFAULT_BASE_URL: &str = "http://localhost:8620";
const DEFAULT_MEDIA_SEGMENT: &str = "media";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// TOML config file schema (`~/.config/lectern/media.toml`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    pub media_server: Option<String>,
    pub media_segment: Option<String>,
    pub timeout_secs: Option<u64>,
}

/// Resolved media server configuration
#[derive(Debug, Clone)]
pub struct MediaServerConfig {
    /// Catalog base URL, no trailing slash
    pub base_url: String,
    /// URL segment under which media files are served
    pub media_segment: String,
    /// HTTP request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for MediaServerConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            media_segment: DEFAULT_MEDIA_SEGMENT.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl MediaServerConfig {
    pub fn new(base_url: impl Into<String>, media_segment: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            media_segment: media_segment.into(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Resolve configuration following the tier order described in the
    /// module docs. `base_url_arg` is the explicit-argument tier, used by
    /// callers that accept a server address on their own surface.
    pub fn resolve(base_url_arg: Option<&str>) -> Self {
        let toml_config = load_config_file().unwrap_or_default();

        let base_url = base_url_arg
            .map(str::to_string)
            .or_else(|| std::env::var(ENV_MEDIA_SERVER).ok())
            .or_else(|| toml_config.media_server.clone())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        let media_segment = std::env::var(ENV_MEDIA_SEGMENT)
            .ok()
            .or_else(|| toml_config.media_segment.clone())
            .unwrap_or_else(|| DEFAULT_MEDIA_SEGMENT.to_string());

        let timeout_secs = toml_config.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS);

        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            media_segment: media_segment.trim_matches('/').to_string(),
            timeout_secs,
        }
    }

    /// Base URL for media file downloads: `<base_url>/<media_segment>`
    pub fn media_base(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.media_segment.trim_matches('/')
        )
    }
}

/// Default configuration file path for the platform
fn config_file_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("lectern").join("media.toml"))
}

fn load_config_file() -> Option<TomlConfig> {
    let path = config_file_path()?;
    if !path.exists() {
        return None;
    }
    match parse_config_file(&path) {
        Ok(config) => Some(config),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Ignoring unreadable media config file");
            None
        }
    }
}

/// Read and parse a TOML config file
pub fn parse_config_file(path: &std::path::Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| crate::Error::Config(format!("read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| crate::Error::Config(format!("parse {} failed: {}", path.display(), e)))
}
