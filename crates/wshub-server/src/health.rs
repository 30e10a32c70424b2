//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

use crate::websocket::manager::ConnectionManager;

/// Liveness of the hub process.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HubStatus {
    /// Accepting connections.
    Ok,
    /// Shutdown has started.
    Draining,
}

/// Snapshot served by `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// `ok` or `draining`.
    pub status: HubStatus,
    /// Seconds since the server started.
    pub uptime_secs: u64,
    /// Users with a registry entry.
    pub users: usize,
    /// Registered sockets across all users.
    pub connections: usize,
}

impl HealthResponse {
    /// Read the registry counters from `manager`.
    pub fn snapshot(start_time: Instant, manager: &ConnectionManager, draining: bool) -> Self {
        Self {
            status: if draining { HubStatus::Draining } else { HubStatus::Ok },
            uptime_secs: start_time.elapsed().as_secs(),
            users: manager.user_count(),
            connections: manager.socket_count(),
        }
    }
}
