//! Result classification: turns check outcomes into a [`ProbeReport`].

use vigil_core::{ErrorKind, FINALITY_EVENTS, ProbeReport, WarningKind};

use crate::checker::{FetchOutcome, ProcessStatus};
use crate::detector::StallVerdict;

/// Everything one probe run observed, before classification.
#[derive(Debug, Clone)]
pub struct Observations {
    pub service: String,
    pub process: ProcessStatus,
    pub health: FetchOutcome,
    pub metrics: FetchOutcome,
    /// Required series absent from the scrape.
    pub missing_series: Vec<String>,
    pub stall: StallVerdict,
    /// Problems reading or writing the state file.
    pub store_warnings: Vec<WarningKind>,
}

/// Map observations to errors and warnings.
///
/// Missing-series warnings only apply when the metrics scrape succeeded;
/// a failed scrape is already an error and has nothing to inspect.
pub fn classify(obs: &Observations) -> ProbeReport {
    let mut report = ProbeReport::default();

    if let ProcessStatus::QueryFailed { program, reason } = &obs.process {
        report.errors.push(ErrorKind::ProcessQuery {
            program: program.clone(),
            reason: reason.clone(),
        });
    }
    if !obs.process.is_active() {
        report.errors.push(ErrorKind::ServiceInactive {
            service: obs.service.clone(),
            state: obs.process.state().to_string(),
        });
    }

    if let Some(failure) = obs.health.failure() {
        report.errors.push(ErrorKind::HealthEndpoint { failure });
    }

    match obs.metrics.failure() {
        Some(failure) => report.errors.push(ErrorKind::MetricsEndpoint { failure }),
        None => report.warnings.extend(
            obs.missing_series
                .iter()
                .map(|series| WarningKind::MissingSeries {
                    series: series.clone(),
                }),
        ),
    }

    if let StallVerdict::Stalled { elapsed } = obs.stall {
        report.warnings.push(WarningKind::Stalled {
            counter: FINALITY_EVENTS.to_string(),
            elapsed_secs: elapsed.as_secs(),
        });
    }

    report.warnings.extend(obs.store_warnings.iter().cloned());
    report
}
