//! Service metrics and Prometheus exposition.
//!
//! # Metrics
//! - `urlcheck_checks_total` (counter): checks by outcome and status
//! - `urlcheck_check_duration_seconds` (histogram): target response time
//! - `urlcheck_alerts_total` (counter): classified failures dispatched
//! - `urlcheck_dispatch_failures_total` (counter): collaborator errors
//!
//! These describe the service itself; alert points for failing targets go
//! through the dispatch sink instead. Without an installed recorder every
//! call is a no-op.

use std::net::SocketAddr;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record one finished check.
pub fn record_check(status: u16, error_kind: Option<&'static str>, response_time_millis: u64) {
    let outcome = error_kind.unwrap_or("completed");
    counter!(
        "urlcheck_checks_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    if error_kind.is_none() {
        histogram!("urlcheck_check_duration_seconds").record(response_time_millis as f64 / 1000.0);
    }
}

pub fn record_alert(status: u16) {
    counter!("urlcheck_alerts_total", "status" => status.to_string()).increment(1);
}

pub fn record_dispatch_failure(collaborator: &'static str) {
    counter!("urlcheck_dispatch_failures_total", "collaborator" => collaborator).increment(1);
}
