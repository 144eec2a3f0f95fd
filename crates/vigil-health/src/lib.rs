//! vigil-health: health verification for a long-running node.
//!
//! Each invocation checks that the node's service is active, that its
//! health and metrics endpoints answer, and that its primary progress
//! counter keeps moving. State carried between invocations turns the
//! series of stateless runs into a stall verdict.
//!
//! # Architecture
//!
//! ```text
//! Probe::run()
//!   ├── ProcessProbe::status()      → ProcessStatus
//!   ├── Fetcher::fetch(health)      → FetchOutcome
//!   ├── Fetcher::fetch(metrics)     → FetchOutcome → parse_metrics()
//!   ├── StateStore::load()
//!   ├── StallDetector::evaluate()   → StallVerdict + next state
//!   ├── StateStore::save()          (only with a snapshot)
//!   └── classify()                  → ProbeReport (severity, exit code)
//!
//! alert::dispatch()                 (best effort, outside the report path)
//! ```
//!
//! # Stall detection
//!
//! The counter is stalled when it has not increased for strictly longer
//! than the configured threshold. A first run, or a run after the state
//! file was lost, bootstraps from the current value and never stalls.

pub mod alert;
pub mod checker;
pub mod classifier;
pub mod detector;
pub mod probe;

pub use alert::{AlertSink, CommandAlert, dispatch};
pub use checker::{
    FetchOutcome, Fetcher, HttpFetcher, ProcessProbe, ProcessStatus, SystemctlProbe,
};
pub use classifier::{Observations, classify};
pub use detector::{Detection, StallDetector, StallVerdict};
pub use probe::{Probe, ProbeRun};
