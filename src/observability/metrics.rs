//! Metrics collection and exposition.
//!
//! # Metrics
//! - `tracer_traces_started_total` (counter)
//! - `tracer_traces_completed_total` (counter, by status class)
//! - `tracer_outgoing_tracked_total` (counter)
//! - `tracer_outgoing_finalized_total` (counter)
//! - `tracer_store_entries` (gauge): live correlation store entries
//! - `tracer_store_evictions_total` (counter): TTL reaps
//!
//! # Design Decisions
//! - Free functions so call sites stay one-liners
//! - Recorder installation is optional and config-gated

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and exporter.
///
/// Failure is logged and tolerated: the process runs without metrics.
pub fn install_recorder() {
    if let Err(e) = PrometheusBuilder::new().install() {
        tracing::warn!(error = %e, "failed to install metrics recorder");
    }
}

pub fn record_trace_started() {
    counter!("tracer_traces_started_total").increment(1);
}

pub fn record_trace_completed(status: u16) {
    let class = match status {
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    counter!("tracer_traces_completed_total", "class" => class).increment(1);
}

pub fn record_child_tracked() {
    counter!("tracer_outgoing_tracked_total").increment(1);
}

pub fn record_child_finalized() {
    counter!("tracer_outgoing_finalized_total").increment(1);
}

pub fn record_store_size(entries: usize) {
    gauge!("tracer_store_entries").set(entries as f64);
}

pub fn record_store_evictions(reaped: usize) {
    counter!("tracer_store_evictions_total").increment(reaped as u64);
}
