//! Metrics collection and exposition.
//!
//! # Metrics
//! - `hostpanel_operations_total` (counter): operations by name and outcome
//! - `hostpanel_operation_duration_seconds` (histogram): latency per operation
//! - `hostpanel_proxy_reloads_total` (counter): reload calls by outcome
//! - `hostpanel_rollbacks_total` (counter): activations rolled back
//! - `hostpanel_certificate_issuance_total` (counter): issuance attempts by outcome
//! - `hostpanel_domains` (gauge): number of active domain records
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Prometheus scrape endpoint is optional and off by default

use std::net::SocketAddr;
use std::time::Instant;
use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

/// Record the outcome and duration of a top-level domain operation.
pub fn record_operation(operation: &'static str, outcome: &'static str, start: Instant) {
    counter!("hostpanel_operations_total", "operation" => operation, "outcome" => outcome)
        .increment(1);
    histogram!("hostpanel_operation_duration_seconds", "operation" => operation)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_reload(outcome: &'static str) {
    counter!("hostpanel_proxy_reloads_total", "outcome" => outcome).increment(1);
}

pub fn record_rollback() {
    counter!("hostpanel_rollbacks_total").increment(1);
}

pub fn record_issuance(outcome: &'static str) {
    counter!("hostpanel_certificate_issuance_total", "outcome" => outcome).increment(1);
}

pub fn record_domain_count(count: usize) {
    gauge!("hostpanel_domains").set(count as f64);
}
