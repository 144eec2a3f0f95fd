//! Best-effort alert dispatch.
//!
//! Alerting never feeds back into the report: a failed or slow alert
//! command is logged and otherwise ignored.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use thiserror::Error;
use tracing::{info, warn};

use vigil_core::ProbeReport;

use crate::checker::BoxFuture;

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("failed to run alert command {program}: {source}")]
    Spawn {
        program: PathBuf,
        source: std::io::Error,
    },

    #[error("alert command exited with {0}")]
    Exit(ExitStatus),

    #[error("alert command timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivers an alert, injected for testability.
pub trait AlertSink: Send + Sync {
    fn send<'a>(&'a self, title: &'a str, body: &'a str) -> BoxFuture<'a, Result<(), AlertError>>;
}

/// Runs `<program> <title> <body>`.
#[derive(Debug, Clone)]
pub struct CommandAlert {
    program: PathBuf,
    timeout: Duration,
}

impl CommandAlert {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    async fn run(&self, title: &str, body: &str) -> Result<(), AlertError> {
        let status = tokio::process::Command::new(&self.program)
            .arg(title)
            .arg(body)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status();

        match tokio::time::timeout(self.timeout, status).await {
            Ok(Ok(status)) if status.success() => Ok(()),
            Ok(Ok(status)) => Err(AlertError::Exit(status)),
            Ok(Err(source)) => Err(AlertError::Spawn {
                program: self.program.clone(),
                source,
            }),
            Err(_) => Err(AlertError::Timeout(self.timeout)),
        }
    }
}

impl AlertSink for CommandAlert {
    fn send<'a>(&'a self, title: &'a str, body: &'a str) -> BoxFuture<'a, Result<(), AlertError>> {
        Box::pin(self.run(title, body))
    }
}

/// Alert text: error lines, then warning lines, one per line.
pub fn alert_body(report: &ProbeReport) -> String {
    let mut sections = Vec::new();
    if !report.errors.is_empty() {
        let lines: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        sections.push(format!("Errors:\n{}", lines.join("\n")));
    }
    if !report.warnings.is_empty() {
        let lines: Vec<String> = report.warnings.iter().map(ToString::to_string).collect();
        sections.push(format!("Warnings:\n{}", lines.join("\n")));
    }
    sections.join("\n\n")
}

/// Send one alert for an unhealthy report.
///
/// Returns whether an alert was attempted. Delivery failures are logged
/// and swallowed.
pub async fn dispatch(sink: &dyn AlertSink, title: &str, report: &ProbeReport) -> bool {
    if report.is_healthy() {
        return false;
    }

    let body = alert_body(report);
    match sink.send(title, &body).await {
        Ok(()) => info!(severity = %report.severity(), "alert dispatched"),
        Err(e) => warn!(error = %e, "alert dispatch failed"),
    }
    true
}
