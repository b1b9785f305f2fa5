//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, status
//! - `http_request_duration_seconds` (histogram): handler latency by method
//! - `log_events_enqueued_total` (counter): shipped events by level
//! - `log_events_dropped_total` (counter): lost events by reason
//! - `log_batches_sent_total` / `log_events_sent_total` (counters)
//! - `log_push_duration_seconds` (histogram): push latency including retries
//! - `log_push_retries_total` (counter)
//!
//! Recording is a no-op until a recorder is installed.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

use crate::shipper::Level;

/// Install the Prometheus recorder and serve `/metrics` on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("http_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_event_enqueued(level: Level) {
    counter!("log_events_enqueued_total", "level" => level.as_str()).increment(1);
}

pub fn record_events_dropped(reason: &'static str, count: usize) {
    counter!("log_events_dropped_total", "reason" => reason).increment(count as u64);
}

pub fn record_batch_sent(entries: usize, start: Instant) {
    counter!("log_batches_sent_total").increment(1);
    counter!("log_events_sent_total").increment(entries as u64);
    histogram!("log_push_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_push_retry() {
    counter!("log_push_retries_total").increment(1);
}
