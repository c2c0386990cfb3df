//! Metrics collection and exposition.
//!
//! # Metrics
//! - `static_requests_total` (counter): requests by status
//! - `static_request_duration_seconds` (histogram): latency distribution
//! - `static_rate_limited_total` (counter): 429 responses
//! - `static_security_events_total` (counter): admitted events by type, severity
//! - `static_webhook_failures_total` (counter): failed deliveries by reason
//! - `static_batch_flushes_total` / `static_batch_events_total` (counters)
//!
//! Without an installed recorder every call here is a no-op.

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(status: u16, start: Instant) {
    metrics::counter!("static_requests_total", "status" => status.to_string()).increment(1);
    metrics::histogram!("static_request_duration_seconds").record(start.elapsed().as_secs_f64());
}

pub fn record_rate_limited() {
    metrics::counter!("static_rate_limited_total").increment(1);
}

pub fn record_security_event(event_type: &'static str, severity: &'static str) {
    metrics::counter!(
        "static_security_events_total",
        "type" => event_type,
        "severity" => severity
    )
    .increment(1);
}

pub fn record_webhook_failure(reason: &'static str) {
    metrics::counter!("static_webhook_failures_total", "reason" => reason).increment(1);
}

pub fn record_batch_flush(events: usize) {
    metrics::counter!("static_batch_flushes_total").increment(1);
    metrics::counter!("static_batch_events_total").increment(events as u64);
}
