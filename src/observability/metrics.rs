//! Metrics collection and exposition.
//!
//! # Metrics
//! - `state_proxy_requests_total` (counter): inbound requests by platform, method, status
//! - `state_proxy_request_duration_seconds` (histogram): inbound latency by platform, method
//! - `state_proxy_backend_calls_total` (counter): outbound calls by platform, operation, status
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Start the Prometheus scrape listener. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one inbound state request.
pub fn record_request(platform: &'static str, method: &'static str, status: u16, start: Instant) {
    counter!(
        "state_proxy_requests_total",
        "platform" => platform,
        "method" => method,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "state_proxy_request_duration_seconds",
        "platform" => platform,
        "method" => method
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record one outbound platform call. `status` is the HTTP status or `error`.
pub fn record_backend_call(platform: &'static str, operation: &'static str, status: &str) {
    counter!(
        "state_proxy_backend_calls_total",
        "platform" => platform,
        "operation" => operation,
        "status" => status.to_string()
    )
    .increment(1);
}
