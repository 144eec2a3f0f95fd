//! vigil.toml configuration parser.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Settings for one probe run.
///
/// Every field has a default, so an empty file (or no file) is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// systemd unit of the monitored node.
    pub service: String,
    pub health_url: String,
    pub metrics_url: String,
    /// Bearer token for the health endpoint. Empty means none.
    pub auth_token: Option<String>,
    pub state_path: PathBuf,
    /// Minutes without progress before the counter counts as stalled.
    pub stall_minutes: u64,
    pub alert_command: PathBuf,
    pub alert_title: String,
    /// Per-call timeout for the process check, fetches and alert dispatch.
    pub timeout_secs: u64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            service: "powerhouse-boot".to_string(),
            health_url: "http://127.0.0.1:8181/healthz".to_string(),
            metrics_url: "http://127.0.0.1:9100/metrics".to_string(),
            auth_token: None,
            state_path: PathBuf::from("/var/lib/vigil/health_state.json"),
            stall_minutes: 20,
            alert_command: PathBuf::from("/usr/local/lib/vigil/alert.sh"),
            alert_title: "vigil healthcheck".to_string(),
            timeout_secs: 5,
        }
    }
}

impl ProbeConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Reject settings the probe cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.service.trim().is_empty() {
            return Err(ConfigError::Invalid("service name is empty".to_string()));
        }
        for (name, url) in [("health_url", &self.health_url), ("metrics_url", &self.metrics_url)] {
            if !url.starts_with("http://") {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be an http:// URL, got {url:?}"
                )));
            }
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeout_secs must be > 0".to_string()));
        }
        Ok(())
    }

    pub fn stall_threshold(&self) -> Duration {
        Duration::from_secs(self.stall_minutes.saturating_mul(60))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The bearer token, if one is configured and non-empty.
    pub fn auth_token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.is_empty())
    }
}
