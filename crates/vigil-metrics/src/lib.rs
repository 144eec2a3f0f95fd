//! vigil-metrics: decoding of the node's metrics endpoint.
//!
//! Turns a Prometheus-style text scrape into a [`MetricsSnapshot`] and
//! reports which required series are absent from it.
//!
//! # Format
//!
//! ```text
//! # HELP finality_events_total Finality events observed.
//! # TYPE finality_events_total counter
//! finality_events_total 1042
//! anchors_received_total 88
//! ```
//!
//! Only lines made of exactly a name and a value are used. Labelled series
//! keep their labels as part of the name.
//!
//! [`MetricsSnapshot`]: vigil_core::MetricsSnapshot

pub mod prometheus;

pub use prometheus::{missing_series, parse_metrics};
