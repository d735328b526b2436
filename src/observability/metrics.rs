//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): client requests by method, status
//! - `gateway_request_duration_seconds` (histogram): client-facing latency
//! - `gateway_upstream_outcomes_total` (counter): upstream calls by backend, outcome
//! - `gateway_upstream_duration_seconds` (histogram): upstream latency by backend
//! - `gateway_breaker_rejections_total` (counter): fast-failed requests by backend
//! - `gateway_breaker_state` (gauge): 0=closed, 1=open, 2=half-open
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade and is a no-op until
//!   `init_metrics` installs the Prometheus exporter
//! - Labels are bounded: method, status, backend id, outcome kind

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::BreakerState;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    let labels = [
        ("method", method.to_string()),
        ("status", status.to_string()),
    ];
    metrics::counter!("gateway_requests_total", &labels).increment(1);
    metrics::histogram!("gateway_request_duration_seconds", &labels)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_outcome(backend: &str, outcome: &'static str, start: Instant) {
    metrics::counter!(
        "gateway_upstream_outcomes_total",
        "backend" => backend.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!("gateway_upstream_duration_seconds", "backend" => backend.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_breaker_rejection(backend: &str) {
    metrics::counter!("gateway_breaker_rejections_total", "backend" => backend.to_string())
        .increment(1);
}

pub fn record_breaker_state(backend: &str, state: BreakerState) {
    let value = match state {
        BreakerState::Closed => 0.0,
        BreakerState::Open => 1.0,
        BreakerState::HalfOpen => 2.0,
    };
    metrics::gauge!("gateway_breaker_state", "backend" => backend.to_string()).set(value);
}
