//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define failover metrics (health, latency, bans, selection changes)
//! - Expose Prometheus-compatible metrics endpoint
//! - Label every series with the owning tracker key
//!
//! # Metrics
//! - `failover_endpoint_health` (gauge): 1=last check succeeded, 0=failed
//! - `failover_probe_latency_seconds` (histogram): probe latency distribution
//! - `failover_endpoint_bans_total` (counter): bans by endpoint
//! - `failover_selection_changes_total` (counter): primary/secondary changes
//! - `failover_fallback_mode` (gauge): 1 while a switcher is in fallback mode
//!
//! # Design Decisions
//! - Recording through the `metrics` facade is a no-op until a recorder is installed

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_endpoint_health(tracker: &str, endpoint: &str, healthy: bool) {
    gauge!(
        "failover_endpoint_health",
        "tracker" => tracker.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .set(if healthy { 1.0 } else { 0.0 });
}

pub fn record_probe_latency(tracker: &str, endpoint: &str, latency: Duration) {
    histogram!(
        "failover_probe_latency_seconds",
        "tracker" => tracker.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .record(latency.as_secs_f64());
}

pub fn record_endpoint_banned(tracker: &str, endpoint: &str) {
    counter!(
        "failover_endpoint_bans_total",
        "tracker" => tracker.to_string(),
        "endpoint" => endpoint.to_string()
    )
    .increment(1);
}

pub fn record_selection_change(tracker: &str) {
    counter!("failover_selection_changes_total", "tracker" => tracker.to_string()).increment(1);
}

pub fn record_fallback_mode(name: &str, active: bool) {
    gauge!("failover_fallback_mode", "switcher" => name.to_string())
        .set(if active { 1.0 } else { 0.0 });
}
