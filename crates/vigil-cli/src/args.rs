//! Probe settings from flags, environment and an optional vigil.toml.
//!
//! Precedence: flag or environment variable, then the config file, then
//! built-in defaults.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;

use vigil_core::ProbeConfig;

#[derive(Args, Debug, Default)]
pub struct ProbeArgs {
    /// TOML file with probe settings
    #[arg(long, env = "VIGIL_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// systemd unit of the monitored node
    #[arg(long, env = "VIGIL_SERVICE_NAME", global = true)]
    pub service: Option<String>,

    /// Health endpoint URL
    #[arg(long, env = "VIGIL_HEALTH_URL", global = true)]
    pub health_url: Option<String>,

    /// Metrics endpoint URL
    #[arg(long, env = "VIGIL_METRICS_URL", global = true)]
    pub metrics_url: Option<String>,

    /// Bearer token sent to the health endpoint
    #[arg(long, env = "VIGIL_AUTH_TOKEN", global = true, hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Where the stall-detection state is kept
    #[arg(long, env = "VIGIL_STATE_PATH", global = true)]
    pub state_path: Option<PathBuf>,

    /// Minutes without progress before the node counts as stalled
    #[arg(long, env = "VIGIL_STALL_MINUTES", global = true)]
    pub stall_minutes: Option<u64>,

    /// Executable run as `<command> <title> <details>` on problems
    #[arg(long, env = "VIGIL_ALERT_COMMAND", global = true)]
    pub alert_command: Option<PathBuf>,

    /// Title passed to the alert command
    #[arg(long, env = "VIGIL_ALERT_TITLE", global = true)]
    pub alert_title: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, env = "VIGIL_TIMEOUT_SECS", global = true)]
    pub timeout_secs: Option<u64>,
}

impl ProbeArgs {
    /// Layer flags over the config file over defaults, then validate.
    pub fn resolve(&self) -> anyhow::Result<ProbeConfig> {
        let mut config = match &self.config {
            Some(path) => ProbeConfig::from_file(path)?,
            None => ProbeConfig::default(),
        };

        if let Some(v) = &self.service {
            config.service = v.clone();
        }
        if let Some(v) = &self.health_url {
            config.health_url = v.clone();
        }
        if let Some(v) = &self.metrics_url {
            config.metrics_url = v.clone();
        }
        if let Some(v) = &self.auth_token {
            config.auth_token = Some(v.clone());
        }
        if let Some(v) = &self.state_path {
            config.state_path = v.clone();
        }
        if let Some(v) = self.stall_minutes {
            config.stall_minutes = v;
        }
        if let Some(v) = &self.alert_command {
            config.alert_command = v.clone();
        }
        if let Some(v) = &self.alert_title {
            config.alert_title = v.clone();
        }
        if let Some(v) = self.timeout_secs {
            config.timeout_secs = v;
        }

        config.validate().context("probe configuration")?;
        Ok(config)
    }
}
