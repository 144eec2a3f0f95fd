use serde::Serialize;
use tracing::debug;

use vigil_core::{ErrorKind, ProbeConfig, Severity, WarningKind};
use vigil_health::{CommandAlert, Probe, ProbeRun, StallVerdict};

use crate::ReportFormat;

/// JSON shape of a probe run.
#[derive(Debug, Serialize)]
struct ReportView<'a> {
    severity: Severity,
    exit_code: i32,
    lines: Vec<String>,
    errors: &'a [ErrorKind],
    warnings: &'a [WarningKind],
    stall: &'static str,
    stall_elapsed_secs: Option<u64>,
    state_saved: bool,
}

impl<'a> ReportView<'a> {
    fn new(run: &'a ProbeRun) -> Self {
        Self {
            severity: run.report.severity(),
            exit_code: run.report.exit_code(),
            lines: run.report.lines(),
            errors: &run.report.errors,
            warnings: &run.report.warnings,
            stall: verdict_label(&run.verdict),
            stall_elapsed_secs: run.verdict.elapsed().map(|d| d.as_secs()),
            state_saved: run.state_saved,
        }
    }
}

fn verdict_label(verdict: &StallVerdict) -> &'static str {
    match verdict {
        StallVerdict::Unknown => "unknown",
        StallVerdict::Progressed => "progressed",
        StallVerdict::Idle { .. } => "idle",
        StallVerdict::Stalled { .. } => "stalled",
    }
}

pub async fn run(
    config: ProbeConfig,
    format: ReportFormat,
    send_alert: bool,
) -> anyhow::Result<u8> {
    let alert = CommandAlert::new(&config.alert_command, config.timeout());
    let title = config.alert_title.clone();

    let probe = Probe::new(config);
    let run = probe.run().await;

    match format {
        ReportFormat::Text => {
            for line in run.report.lines() {
                println!("{line}");
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&ReportView::new(&run))?);
        }
    }

    if send_alert {
        vigil_health::dispatch(&alert, &title, &run.report).await;
    } else {
        debug!("alerting disabled");
    }

    Ok(run.report.severity().exit_code() as u8)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use vigil_core::{FINALITY_EVENTS, ProbeReport};

    #[test]
    fn json_view_of_stalled_run() {
        let run = ProbeRun {
            report: ProbeReport {
                errors: Vec::new(),
                warnings: vec![WarningKind::Stalled {
                    counter: FINALITY_EVENTS.to_string(),
                    elapsed_secs: 1500,
                }],
            },
            verdict: StallVerdict::Stalled {
                elapsed: Duration::from_secs(1500),
            },
            state_saved: true,
        };

        let value = serde_json::to_value(ReportView::new(&run)).unwrap();
        assert_eq!(value["severity"], "warning");
        assert_eq!(value["exit_code"], 1);
        assert_eq!(value["stall"], "stalled");
        assert_eq!(value["stall_elapsed_secs"], 1500);
        assert_eq!(value["warnings"][0]["kind"], "stalled");
        assert_eq!(
            value["lines"][0],
            "finality_events_total stalled (25m without increment)"
        );
    }

    #[test]
    fn json_view_of_unknown_verdict_has_no_elapsed() {
        let run = ProbeRun {
            report: ProbeReport::default(),
            verdict: StallVerdict::Unknown,
            state_saved: false,
        };
        let value = serde_json::to_value(ReportView::new(&run)).unwrap();
        assert_eq!(value["severity"], "ok");
        assert!(value["stall_elapsed_secs"].is_null());
    }
}
