//! Metrics collection and exposition.
//!
//! # Metrics
//! - `imgops_requests_total` (counter): dispatched requests by operation, status
//! - `imgops_request_duration_seconds` (histogram): dispatch latency by operation
//!
//! # Design Decisions
//! - Macros record into the global recorder; with no exporter installed they
//!   are no-ops
//! - `unknown` labels requests that failed before an operation was resolved

use std::net::SocketAddr;
use std::time::Instant;

use axum::http::StatusCode;
use metrics_exporter_prometheus::PrometheusBuilder;

pub const REQUESTS_TOTAL: &str = "imgops_requests_total";
pub const REQUEST_DURATION_SECONDS: &str = "imgops_request_duration_seconds";

/// Install the Prometheus exporter and serve it on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

/// Record one dispatched request.
pub fn record_operation(operation: &'static str, status: StatusCode, start: Instant) {
    let status = status.as_u16().to_string();

    metrics::counter!(REQUESTS_TOTAL, "operation" => operation, "status" => status).increment(1);
    metrics::histogram!(REQUEST_DURATION_SECONDS, "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}
