//! Shared types used across vigil crates.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Primary progress counter: finality events observed by the node.
pub const FINALITY_EVENTS: &str = "finality_events_total";
/// Anchors received from peers.
pub const ANCHORS_RECEIVED: &str = "anchors_received_total";
/// Anchors that passed verification.
pub const ANCHORS_VERIFIED: &str = "anchors_verified_total";

/// Series that must be present in every metrics scrape.
pub const REQUIRED_SERIES: [&str; 3] = [ANCHORS_RECEIVED, ANCHORS_VERIFIED, FINALITY_EVENTS];

/// Longest endpoint body excerpt carried into report lines.
const BODY_EXCERPT_CHARS: usize = 256;

// ── Metrics ───────────────────────────────────────────────────────

/// Series values decoded from one metrics-endpoint fetch.
///
/// Immutable once built; a fresh snapshot is produced on every invocation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetricsSnapshot {
    series: BTreeMap<String, f64>,
}

impl MetricsSnapshot {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.series.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.series.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for MetricsSnapshot {
    fn from_iter<I: IntoIterator<Item = (K, f64)>>(iter: I) -> Self {
        Self {
            series: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

// ── Persisted state ───────────────────────────────────────────────

/// Last observed values of the required series.
///
/// Fields are optional on disk so partially written documents still decode;
/// an absent primary counter means there is no baseline yet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CounterValues {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finality_events_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors_received_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub anchors_verified_total: Option<f64>,
}

impl CounterValues {
    /// Capture the required series from a snapshot, defaulting absent ones to 0.
    pub fn from_snapshot(snapshot: &MetricsSnapshot) -> Self {
        Self {
            finality_events_total: Some(snapshot.get(FINALITY_EVENTS).unwrap_or(0.0)),
            anchors_received_total: Some(snapshot.get(ANCHORS_RECEIVED).unwrap_or(0.0)),
            anchors_verified_total: Some(snapshot.get(ANCHORS_VERIFIED).unwrap_or(0.0)),
        }
    }
}

/// Cross-invocation state kept by the probe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PersistedState {
    #[serde(default)]
    pub last: CounterValues,
    /// Unix timestamp of the last observed progress on the primary counter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<u64>,
    /// Unix timestamp of the last write.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<u64>,
}

// ── Outcomes ──────────────────────────────────────────────────────

/// Overall result of one probe run. Ordered `Ok < Warning < Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Ok,
    Warning,
    Error,
}

impl Severity {
    /// Process exit code for this severity.
    pub fn exit_code(self) -> i32 {
        match self {
            Severity::Ok => 0,
            Severity::Warning => 1,
            Severity::Error => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Severity::Ok => "OK",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Why an HTTP endpoint check did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FetchFailure {
    /// The endpoint answered with a status other than 200.
    Status { code: u16, body: String },
    /// Connection, protocol or timeout failure.
    Unreachable { reason: String },
}

impl FetchFailure {
    /// Build a status failure, keeping only a short excerpt of the body.
    pub fn status(code: u16, body: &str) -> Self {
        FetchFailure::Status {
            code,
            body: excerpt(body),
        }
    }

    pub fn unreachable(reason: impl Into<String>) -> Self {
        FetchFailure::Unreachable {
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Status { code, body } => write!(f, "({code}): {body}"),
            FetchFailure::Unreachable { reason } => write!(f, "(unreachable): {reason}"),
        }
    }
}

/// Conditions that make the monitored service count as down.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ErrorKind {
    #[error("{program} failed: {reason}")]
    ProcessQuery { program: String, reason: String },

    #[error("service {service} not active (state={state})")]
    ServiceInactive { service: String, state: String },

    #[error("healthz failed {failure}")]
    HealthEndpoint { failure: FetchFailure },

    #[error("metrics failed {failure}")]
    MetricsEndpoint { failure: FetchFailure },
}

/// Conditions that degrade the service or the probe's view of it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WarningKind {
    MissingSeries { series: String },
    Stalled { counter: String, elapsed_secs: u64 },
    StateUnreadable { reason: String },
    StateNotSaved { reason: String },
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::MissingSeries { series } => write!(f, "metrics missing {series}"),
            WarningKind::Stalled {
                counter,
                elapsed_secs,
            } => write!(
                f,
                "{counter} stalled ({}m without increment)",
                elapsed_secs / 60
            ),
            WarningKind::StateUnreadable { reason } => write!(f, "failed to read state: {reason}"),
            WarningKind::StateNotSaved { reason } => write!(f, "failed to write state: {reason}"),
        }
    }
}

/// Everything one probe run found wrong, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProbeReport {
    pub errors: Vec<ErrorKind>,
    pub warnings: Vec<WarningKind>,
}

impl ProbeReport {
    /// Errors dominate warnings regardless of how many warnings there are.
    pub fn severity(&self) -> Severity {
        if !self.errors.is_empty() {
            Severity::Error
        } else if !self.warnings.is_empty() {
            Severity::Warning
        } else {
            Severity::Ok
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.severity().exit_code()
    }

    pub fn is_healthy(&self) -> bool {
        self.severity() == Severity::Ok
    }

    /// Error lines followed by warning lines.
    pub fn lines(&self) -> Vec<String> {
        self.errors
            .iter()
            .map(ToString::to_string)
            .chain(self.warnings.iter().map(ToString::to_string))
            .collect()
    }
}

/// Trim a response body down to a single readable excerpt.
fn excerpt(body: &str) -> String {
    let body = body.trim();
    let mut chars = body.char_indices();
    match chars.nth(BODY_EXCERPT_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_is_ordered() {
        assert!(Severity::Ok < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert_eq!(Severity::Ok.exit_code(), 0);
        assert_eq!(Severity::Warning.exit_code(), 1);
        assert_eq!(Severity::Error.exit_code(), 2);
    }

    #[test]
    fn errors_dominate_warnings() {
        let report = ProbeReport {
            errors: vec![ErrorKind::ServiceInactive {
                service: "node".into(),
                state: "failed".into(),
            }],
            warnings: vec![
                WarningKind::MissingSeries {
                    series: FINALITY_EVENTS.into(),
                },
                WarningKind::StateUnreadable {
                    reason: "bad json".into(),
                },
            ],
        };
        assert_eq!(report.severity(), Severity::Error);
        assert_eq!(report.exit_code(), 2);
    }

    #[test]
    fn empty_report_is_healthy() {
        let report = ProbeReport::default();
        assert!(report.is_healthy());
        assert!(report.lines().is_empty());
    }

    #[test]
    fn lines_list_errors_before_warnings() {
        let report = ProbeReport {
            errors: vec![ErrorKind::MetricsEndpoint {
                failure: FetchFailure::unreachable("connection refused"),
            }],
            warnings: vec![WarningKind::Stalled {
                counter: FINALITY_EVENTS.into(),
                elapsed_secs: 25 * 60 + 10,
            }],
        };
        assert_eq!(
            report.lines(),
            vec![
                "metrics failed (unreachable): connection refused".to_string(),
                "finality_events_total stalled (25m without increment)".to_string(),
            ]
        );
    }

    #[test]
    fn status_failure_keeps_short_excerpt() {
        let long = "x".repeat(1000);
        let FetchFailure::Status { body, .. } = FetchFailure::status(500, &long) else {
            panic!("expected status failure");
        };
        assert_eq!(body.len(), BODY_EXCERPT_CHARS + 3);
        assert!(body.ends_with("..."));

        let short = FetchFailure::status(503, "  draining \n");
        assert_eq!(short.to_string(), "(503): draining");
    }

    #[test]
    fn counter_values_default_missing_series_to_zero() {
        let snapshot: MetricsSnapshot = [(FINALITY_EVENTS, 7.0)].into_iter().collect();
        let values = CounterValues::from_snapshot(&snapshot);
        assert_eq!(values.finality_events_total, Some(7.0));
        assert_eq!(values.anchors_received_total, Some(0.0));
        assert_eq!(values.anchors_verified_total, Some(0.0));
    }

    #[test]
    fn state_decodes_partial_document() {
        let state: PersistedState =
            serde_json::from_str(r#"{"last": {"anchors_received_total": 3.0}}"#).unwrap();
        assert_eq!(state.last.finality_events_total, None);
        assert_eq!(state.last.anchors_received_total, Some(3.0));
        assert_eq!(state.last_seen, None);
    }

    #[test]
    fn state_json_shape() {
        let state = PersistedState {
            last: CounterValues {
                finality_events_total: Some(10.0),
                anchors_received_total: Some(4.0),
                anchors_verified_total: Some(4.0),
            },
            last_seen: Some(1_700_000_000),
            updated: Some(1_700_000_060),
        };
        let value = serde_json::to_value(&state).unwrap();
        assert_eq!(value["last"]["finality_events_total"], 10.0);
        assert_eq!(value["last_seen"], 1_700_000_000u64);
        assert_eq!(value["updated"], 1_700_000_060u64);
    }
}
