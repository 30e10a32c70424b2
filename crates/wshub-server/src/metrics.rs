//! Hub metrics: names, descriptions and the Prometheus exporter.

use metrics::{Unit, describe_counter, describe_gauge};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Sockets registered (counter).
pub const WS_CONNECTIONS_TOTAL: &str = "ws_connections_total";
/// Sockets removed from the registry (counter).
pub const WS_DISCONNECTIONS_TOTAL: &str = "ws_disconnections_total";
/// Open sockets counted by the last monitor cycle (gauge, set once per cycle).
pub const WS_CONNECTIONS_ACTIVE: &str = "ws_connections_active";
/// Text-frame writes that failed (counter).
pub const WS_SEND_FAILURES_TOTAL: &str = "ws_send_failures_total";
/// Refused upgrade requests, labelled by `reason` (counter).
pub const WS_HANDSHAKE_REJECTIONS_TOTAL: &str = "ws_handshake_rejections_total";
/// Envelopes written to a socket, labelled by `kind` (counter).
pub const HUB_MESSAGES_SENT_TOTAL: &str = "hub_messages_sent_total";
/// Monitor cycles run (counter).
pub const MONITOR_CYCLES_TOTAL: &str = "monitor_cycles_total";
/// Sockets reaped by the monitor (counter).
pub const MONITOR_PRUNED_TOTAL: &str = "monitor_pruned_total";

/// Install the global Prometheus recorder and register metric help text.
///
/// Panics if a global recorder is already installed, so call it once from
/// the binary.
pub fn install_recorder() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install metrics recorder");
    describe();
    info!("metrics recorder installed");
    handle
}

fn describe() {
    describe_counter!(WS_CONNECTIONS_TOTAL, Unit::Count, "Sockets registered with the hub");
    describe_counter!(WS_DISCONNECTIONS_TOTAL, Unit::Count, "Sockets removed from the hub");
    describe_gauge!(WS_CONNECTIONS_ACTIVE, Unit::Count, "Open sockets at the last monitor cycle");
    describe_counter!(WS_SEND_FAILURES_TOTAL, Unit::Count, "Failed text-frame writes");
    describe_counter!(WS_HANDSHAKE_REJECTIONS_TOTAL, Unit::Count, "Refused upgrade requests");
    describe_counter!(HUB_MESSAGES_SENT_TOTAL, Unit::Count, "Envelopes written to sockets");
    describe_counter!(MONITOR_CYCLES_TOTAL, Unit::Count, "Liveness monitor cycles");
    describe_counter!(MONITOR_PRUNED_TOTAL, Unit::Count, "Sockets reaped by the monitor");
}

/// Prometheus text exposition for `GET /metrics`.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}
