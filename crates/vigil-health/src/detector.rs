//! Stall detection across probe invocations.
//!
//! Each run compares the primary progress counter against the value stored
//! by the previous run. Progress moves `last_seen` to now; anything else
//! (unchanged or lower) leaves it alone, and the counter is stalled once
//! the gap since `last_seen` exceeds the threshold.

use std::time::Duration;

use tracing::{debug, warn};

use vigil_core::{CounterValues, FINALITY_EVENTS, MetricsSnapshot, PersistedState};

/// What the detector concluded about the primary counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallVerdict {
    /// No snapshot this run; nothing to compare.
    Unknown,
    /// The counter increased since the last run.
    Progressed,
    /// No increase, but still within the threshold.
    Idle { elapsed: Duration },
    /// No increase for longer than the threshold.
    Stalled { elapsed: Duration },
}

impl StallVerdict {
    pub fn is_stalled(&self) -> bool {
        matches!(self, StallVerdict::Stalled { .. })
    }

    /// Time since progress was last seen, when known.
    pub fn elapsed(&self) -> Option<Duration> {
        match self {
            StallVerdict::Idle { elapsed } | StallVerdict::Stalled { elapsed } => Some(*elapsed),
            StallVerdict::Progressed => Some(Duration::ZERO),
            StallVerdict::Unknown => None,
        }
    }
}

/// Verdict plus the state to persist for the next run.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub verdict: StallVerdict,
    /// `None` means the stored state must be left as it is.
    pub next_state: Option<PersistedState>,
}

#[derive(Debug, Clone, Copy)]
pub struct StallDetector {
    threshold: Duration,
}

impl StallDetector {
    pub fn new(threshold: Duration) -> Self {
        Self { threshold }
    }

    /// Compare the current snapshot with the previous state at time `now`
    /// (Unix seconds).
    pub fn evaluate(
        &self,
        snapshot: Option<&MetricsSnapshot>,
        previous: &PersistedState,
        now: u64,
    ) -> Detection {
        let Some(snapshot) = snapshot.filter(|s| !s.is_empty()) else {
            debug!("no metrics snapshot, stall check skipped");
            return Detection {
                verdict: StallVerdict::Unknown,
                next_state: None,
            };
        };

        let current = snapshot.get(FINALITY_EVENTS).unwrap_or(0.0);

        let (last_seen, verdict) = if let Some(baseline) = previous.last.finality_events_total {
            self.compare(current, baseline, previous.last_seen, now)
        } else {
            // No baseline: this run starts the clock, whatever last_seen says.
            debug!(current, "no stored baseline, bootstrapping");
            (now, StallVerdict::Idle { elapsed: Duration::ZERO })
        };

        Detection {
            verdict,
            next_state: Some(PersistedState {
                last: CounterValues::from_snapshot(snapshot),
                last_seen: Some(last_seen),
                updated: Some(now),
            }),
        }
    }

    /// Returns the `last_seen` to persist and the verdict.
    fn compare(
        &self,
        current: f64,
        baseline: f64,
        previous_last_seen: Option<u64>,
        now: u64,
    ) -> (u64, StallVerdict) {
        if current > baseline {
            debug!(current, baseline, "progress observed");
            (now, StallVerdict::Progressed)
        } else {
            // last_seen never runs ahead of now.
            let last_seen = previous_last_seen.unwrap_or(now).min(now);
            let elapsed = Duration::from_secs(now - last_seen);
            if current < baseline {
                warn!(current, baseline, "progress counter went backwards");
            }
            if elapsed > self.threshold {
                warn!(
                    counter = FINALITY_EVENTS,
                    elapsed_secs = elapsed.as_secs(),
                    threshold_secs = self.threshold.as_secs(),
                    "progress counter stalled"
                );
                (last_seen, StallVerdict::Stalled { elapsed })
            } else {
                (last_seen, StallVerdict::Idle { elapsed })
            }
        }
    }
}
