//! One complete probe run.
//!
//! Checks run strictly in sequence: process status, health endpoint,
//! metrics endpoint. The state file is read once and written at most once,
//! and only when a metrics snapshot was obtained.

use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};

use vigil_core::{ProbeConfig, ProbeReport, REQUIRED_SERIES, WarningKind};
use vigil_state::StateStore;

use crate::checker::{Fetcher, HttpFetcher, ProcessProbe, SystemctlProbe};
use crate::classifier::{Observations, classify};
use crate::detector::{StallDetector, StallVerdict};

/// Result of a probe run.
#[derive(Debug, Clone)]
pub struct ProbeRun {
    pub report: ProbeReport,
    pub verdict: StallVerdict,
    /// Whether the state file was rewritten.
    pub state_saved: bool,
}

/// A configured probe with its collaborators.
pub struct Probe {
    config: ProbeConfig,
    process: Box<dyn ProcessProbe>,
    fetcher: Box<dyn Fetcher>,
    store: StateStore,
    detector: StallDetector,
}

impl Probe {
    /// Build a probe backed by systemctl and the HTTP client.
    pub fn new(config: ProbeConfig) -> Self {
        let timeout = config.timeout();
        let store = StateStore::new(config.state_path.clone());
        let detector = StallDetector::new(config.stall_threshold());
        Self {
            config,
            process: Box::new(SystemctlProbe::new(timeout)),
            fetcher: Box::new(HttpFetcher::new(timeout)),
            store,
            detector,
        }
    }

    pub fn with_process_probe(mut self, process: impl ProcessProbe + 'static) -> Self {
        self.process = Box::new(process);
        self
    }

    pub fn with_fetcher(mut self, fetcher: impl Fetcher + 'static) -> Self {
        self.fetcher = Box::new(fetcher);
        self
    }

    pub async fn run(&self) -> ProbeRun {
        self.run_at(epoch_secs()).await
    }

    /// Run the probe as if the wall clock read `now` (Unix seconds).
    pub async fn run_at(&self, now: u64) -> ProbeRun {
        let config = &self.config;

        let process = self.process.status(&config.service).await;
        let health = self
            .fetcher
            .fetch(&config.health_url, config.auth_token())
            .await;
        let metrics = self.fetcher.fetch(&config.metrics_url, None).await;

        let snapshot = metrics.ok_body().map(vigil_metrics::parse_metrics);
        let missing_series = snapshot
            .as_ref()
            .map(|s| vigil_metrics::missing_series(s, &REQUIRED_SERIES))
            .unwrap_or_default()
            .into_iter()
            .map(str::to_string)
            .collect();

        let loaded = self.store.load();
        let mut store_warnings: Vec<WarningKind> = loaded.warning.into_iter().collect();

        let detection = self.detector.evaluate(snapshot.as_ref(), &loaded.state, now);

        let mut state_saved = false;
        if let Some(next) = &detection.next_state {
            match self.store.save(next) {
                Ok(()) => state_saved = true,
                Err(e) => {
                    warn!(error = %e, "failed to persist state");
                    store_warnings.push(WarningKind::StateNotSaved {
                        reason: e.to_string(),
                    });
                }
            }
        } else {
            debug!("state left unchanged");
        }

        let report = classify(&Observations {
            service: config.service.clone(),
            process,
            health,
            metrics,
            missing_series,
            stall: detection.verdict,
            store_warnings,
        });

        info!(
            severity = %report.severity(),
            errors = report.errors.len(),
            warnings = report.warnings.len(),
            verdict = ?detection.verdict,
            state_saved,
            "probe finished"
        );

        ProbeRun {
            report,
            verdict: detection.verdict,
            state_saved,
        }
    }
}

/// Current Unix epoch in seconds.
pub fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
