//! Metrics collection and exposition.
//!
//! # Metrics
//! - `guardian_requests_total` (counter): requests by route and outcome
//! - `guardian_rate_limited_total` (counter): denials by dimension
//!
//! The exporter runs on its own address, separate from the relay's
//! listener.

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter. Failure to bind is logged, not
/// fatal; the relay works without metrics.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(_) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(route: &'static str, outcome: &'static str) {
    metrics::counter!("guardian_requests_total", "route" => route, "outcome" => outcome)
        .increment(1);
}

pub fn record_rate_limited(dimension: &'static str) {
    metrics::counter!("guardian_rate_limited_total", "dimension" => dimension).increment(1);
}
