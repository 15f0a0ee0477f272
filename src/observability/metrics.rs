//! Metrics collection and exposition.
//!
//! # Metrics
//! - `automation_requests_total` (counter): requests by method, status
//! - `automation_request_duration_seconds` (histogram): handling latency
//! - `automation_active_connections` (gauge): current connection count
//! - `automation_parse_failures_total` (counter): requests answered 400 before routing
//! - `automation_rate_limited_total` (counter): requests answered 429
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing unless [`init_metrics`] ran.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, address = %addr, "Failed to install metrics exporter"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    counter!(
        "automation_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("automation_request_duration_seconds", "method" => method.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_active_connections(count: usize) {
    gauge!("automation_active_connections").set(count as f64);
}

pub fn record_parse_failure() {
    counter!("automation_parse_failures_total").increment(1);
}

pub fn record_rate_limited() {
    counter!("automation_rate_limited_total").increment(1);
}
