//! Console configuration, loaded from TOML with command-line overrides.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConsoleError, Result};

pub const DEFAULT_BASE_URL: &str = "http://localhost:8081";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsoleConfig {
    /// Admin API of the node this console speaks for.
    pub base_url: String,
    /// Initial identity guess; derived from the base URL port when unset.
    pub node_id: Option<String>,
    pub election_recheck_delay_ms: u64,
    pub tick_rate_ms: u64,
    /// Client-side request timeout. Requests wait indefinitely when unset.
    pub request_timeout_secs: Option<u64>,
    /// Keep only this many status lines. Unbounded when unset.
    pub status_log_capacity: Option<usize>,
}

impl Default for ConsoleConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            node_id: None,
            election_recheck_delay_ms: 500,
            tick_rate_ms: 100,
            request_timeout_secs: None,
            status_log_capacity: None,
        }
    }
}

impl ConsoleConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))?;
        toml::from_str(&content)
            .map_err(|e| ConsoleError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from `path` if given, else from the default location if a file
    /// exists there, else fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::from_file(path);
        }
        match default_config_path() {
            Some(path) if path.exists() => Self::from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn election_recheck_delay(&self) -> Duration {
        Duration::from_millis(self.election_recheck_delay_ms)
    }

    pub fn tick_rate(&self) -> Duration {
        Duration::from_millis(self.tick_rate_ms.max(1))
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// `<config dir>/syncmesh/console.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("syncmesh").join("console.toml"))
}

/// Default log file for the interactive console.
pub fn default_log_path() -> Option<PathBuf> {
    dirs::data_local_dir().map(|d| d.join("syncmesh").join("console.log"))
}
