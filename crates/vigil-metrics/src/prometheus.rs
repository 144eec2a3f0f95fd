//! Prometheus text exposition decoding.
//!
//! Scans the scrape body line by line. Comments, blank lines and anything
//! that is not `<name> <value>` are skipped rather than rejected, so a
//! partially garbled scrape still yields every readable series.

use tracing::debug;

use vigil_core::MetricsSnapshot;

/// Decode a metrics scrape into a snapshot.
///
/// When a series appears more than once the last value wins.
pub fn parse_metrics(body: &str) -> MetricsSnapshot {
    let mut skipped = 0usize;
    let mut series = Vec::new();

    for line in body.lines() {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split_whitespace();
        let (Some(name), Some(raw), None) = (parts.next(), parts.next(), parts.next()) else {
            skipped += 1;
            continue;
        };
        match raw.parse::<f64>() {
            Ok(value) => series.push((name, value)),
            Err(_) => skipped += 1,
        }
    }

    let snapshot: MetricsSnapshot = series.into_iter().collect();
    debug!(series = snapshot.len(), skipped, "metrics decoded");
    snapshot
}

/// Required series absent from the snapshot, in the order given.
pub fn missing_series<'a>(snapshot: &MetricsSnapshot, required: &[&'a str]) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|name| !snapshot.contains(name))
        .collect()
}
