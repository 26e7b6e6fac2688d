//! Client configuration.
//!
//! Defaults, overridden by an optional `config.json` in the config directory,
//! overridden in turn by CLI flags / environment variables (see `main.rs`).

use note_sync::SyncConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

pub const CONFIG_FILE_NAME: &str = "config.json";
pub const DEFAULT_API_BASE: &str = "https://notes.lhamacorp.com/api/notes";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the notes resource (`POST {api_base}`, `GET {api_base}/{id}`, ...)
    #[serde(default = "default_api_base")]
    pub api_base: String,

    /// Sent verbatim as the `Authorization` header when set.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Per-request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    #[serde(default)]
    pub timing: TimingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Quiet period before an edit is saved (default: 1s)
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Remote change check interval (default: 5s)
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// How long the "updated" notice is shown (default: 2s)
    #[serde(default = "default_notification_ms")]
    pub notification_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            notification_ms: default_notification_ms(),
        }
    }
}

impl TimingConfig {
    pub fn to_sync_config(&self) -> SyncConfig {
        SyncConfig {
            debounce: Duration::from_millis(self.debounce_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            notification_duration: Duration::from_millis(self.notification_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            auth_token: None,
            request_timeout_secs: default_request_timeout(),
            timing: TimingConfig::default(),
        }
    }
}

fn default_api_base() -> String {
    DEFAULT_API_BASE.to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_debounce_ms() -> u64 {
    1000
}

fn default_poll_interval_ms() -> u64 {
    5000
}

fn default_notification_ms() -> u64 {
    2000
}

impl Config {
    /// Load `config.json` from `config_dir`, or defaults if there is none.
    pub fn load(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_file = config_dir.join(CONFIG_FILE_NAME);

        if !config_file.exists() {
            info!("No config file found at {:?}, using defaults", config_file);
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&config_file).map_err(|source| ConfigError::Read {
            path: config_file.clone(),
            source,
        })?;
        let config: Config =
            serde_json::from_str(&content).map_err(|source| ConfigError::Parse {
                path: config_file.clone(),
                source,
            })?;
        config.validate().map_err(|reason| ConfigError::Invalid {
            path: config_file.clone(),
            reason,
        })?;
        info!("Loaded configuration from {:?}", config_file);
        Ok(config)
    }

    /// Reject values the controller cannot run with.
    fn validate(&self) -> Result<(), String> {
        let timing = &self.timing;
        for (name, value) in [
            ("timing.debounce_ms", timing.debounce_ms),
            ("timing.poll_interval_ms", timing.poll_interval_ms),
            ("timing.notification_ms", timing.notification_ms),
            ("request_timeout_secs", self.request_timeout_secs),
        ] {
            if value == 0 {
                return Err(format!("{name} must be greater than zero"));
            }
        }
        if self.api_base.trim().is_empty() {
            return Err("api_base must not be empty".to_string());
        }
        Ok(())
    }

    /// Apply values given on the command line or through the environment.
    pub fn with_overrides(mut self, api_base: Option<String>, auth_token: Option<String>) -> Self {
        if let Some(api_base) = api_base {
            self.api_base = api_base;
        }
        if auth_token.is_some() {
            self.auth_token = auth_token;
        }
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// `<platform config dir>/note-client`, or `./.note-client` if there is none.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .map(|dir| dir.join("note-client"))
        .unwrap_or_else(|| PathBuf::from(".note-client"))
}

/// Expand ~ or ~/ prefix to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    if path == "~" {
        dirs::home_dir().unwrap_or_else(|| PathBuf::from("~"))
    } else if let Some(rest) = path.strip_prefix("~/") {
        dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| PathBuf::from(path))
    } else {
        PathBuf::from(path)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path:?}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Invalid config file {path:?}: {reason}")]
    Invalid { path: PathBuf, reason: String },
}
