//! Server configuration.

use std::time::Duration;

use wshub_settings::HubSettings;

/// Runtime configuration for [`HubServer`](crate::server::HubServer).
#[derive(Clone, Debug)]
pub struct HubConfig {
    /// Host to bind (default `"127.0.0.1"`).
    pub host: String,
    /// Port to bind (default `0` for auto-assign).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
    /// Time between liveness monitor cycles.
    pub monitor_interval: Duration,
    /// Drop a user's registry entry once its last socket is removed.
    pub prune_empty: bool,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            max_message_size: 8 * 1024,
            monitor_interval: Duration::from_secs(30),
            prune_empty: true,
        }
    }
}

impl From<&HubSettings> for HubConfig {
    fn from(s: &HubSettings) -> Self {
        Self {
            host: s.server.host.clone(),
            port: s.server.port,
            max_message_size: s.server.max_message_size,
            monitor_interval: Duration::from_secs(s.monitor.interval_secs.max(1)),
            prune_empty: s.registry.prune_empty,
        }
    }
}
