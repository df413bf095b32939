//! Metrics collection and export for Switchboard.
//!
//! Uses the `metrics` crate for instrumentation. Without an installed
//! exporter every call is a no-op.

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use switchboard_core::Report;
use tracing::info;

/// Metric names.
pub mod names {
    pub const CONNECTIONS_TOTAL: &str = "switchboard_connections_total";
    pub const CONNECTIONS_ACTIVE: &str = "switchboard_connections_active";
    pub const ENVELOPES_TOTAL: &str = "switchboard_envelopes_total";
    pub const ENVELOPES_BYTES: &str = "switchboard_envelopes_bytes";
    pub const ENVELOPES_SKIPPED: &str = "switchboard_envelopes_skipped_total";
    pub const CHANNELS_ACTIVE: &str = "switchboard_channels_active";
    pub const ERRORS_TOTAL: &str = "switchboard_errors_total";
}

/// Describe every metric.
pub fn init_metrics() {
    metrics::describe_counter!(
        names::CONNECTIONS_TOTAL,
        "Total number of connections since server start"
    );
    metrics::describe_gauge!(
        names::CONNECTIONS_ACTIVE,
        "Current number of open connections"
    );
    metrics::describe_counter!(names::ENVELOPES_TOTAL, "Total number of envelopes relayed");
    metrics::describe_counter!(names::ENVELOPES_BYTES, "Total bytes of envelopes relayed");
    metrics::describe_counter!(
        names::ENVELOPES_SKIPPED,
        "Outbound envelopes dropped because the target was closed"
    );
    metrics::describe_gauge!(names::CHANNELS_ACTIVE, "Current number of channel entries");
    metrics::describe_counter!(names::ERRORS_TOTAL, "Total number of errors");

    info!("Metrics initialized");
}

/// Start the Prometheus metrics server.
///
/// # Errors
///
/// Returns an error if the exporter cannot be installed.
pub fn start_metrics_server(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    let addr: SocketAddr = format!("0.0.0.0:{}", port).parse()?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;

    info!("Metrics server listening on {}", addr);
    Ok(())
}

/// Record a new connection.
pub fn record_connection() {
    counter!(names::CONNECTIONS_TOTAL).increment(1);
    gauge!(names::CONNECTIONS_ACTIVE).increment(1.0);
}

/// Record a disconnection.
pub fn record_disconnection() {
    gauge!(names::CONNECTIONS_ACTIVE).decrement(1.0);
}

/// Record an inbound message.
pub fn record_inbound(bytes: usize) {
    counter!(names::ENVELOPES_TOTAL, "direction" => "inbound").increment(1);
    counter!(names::ENVELOPES_BYTES, "direction" => "inbound").increment(bytes as u64);
}

/// Record what the relay did with one event.
pub fn record_report(report: &Report) {
    counter!(names::ENVELOPES_TOTAL, "direction" => "outbound").increment(report.delivered as u64);
    counter!(names::ENVELOPES_BYTES, "direction" => "outbound").increment(report.bytes_out as u64);
    counter!(names::ENVELOPES_SKIPPED).increment(report.skipped as u64);
    if report.malformed {
        record_error("malformed");
    }
}

/// Update active channel count.
pub fn set_active_channels(count: usize) {
    gauge!(names::CHANNELS_ACTIVE).set(count as f64);
}

/// Record an error.
pub fn record_error(error_type: &'static str) {
    counter!(names::ERRORS_TOTAL, "type" => error_type).increment(1);
}

/// Metrics guard that records disconnection on drop.
pub struct ConnectionMetricsGuard;

impl ConnectionMetricsGuard {
    /// Create a new metrics guard, recording a connection.
    #[must_use]
    pub fn new() -> Self {
        record_connection();
        Self
    }
}

impl Default for ConnectionMetricsGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for ConnectionMetricsGuard {
    fn drop(&mut self) {
        record_disconnection();
    }
}
