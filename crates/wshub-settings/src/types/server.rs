//! Listener, monitor, and registry settings.

use serde::{Deserialize, Serialize};

/// HTTP/WebSocket listener settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port (`0` for auto-assign).
    pub port: u16,
    /// Max inbound WebSocket message size in bytes.
    pub max_message_size: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            max_message_size: 8 * 1024,
        }
    }
}

/// Liveness monitor settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MonitorSettings {
    /// Seconds between monitor cycles.
    pub interval_secs: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self { interval_secs: 30 }
    }
}

/// Connection registry settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RegistrySettings {
    /// Drop a user's entry once its last socket is gone.
    pub prune_empty: bool,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self { prune_empty: true }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_defaults() {
        let s = ServerSettings::default();
        assert_eq!(s.host, "0.0.0.0");
        assert_eq!(s.port, 5000);
        assert_eq!(s.max_message_size, 8192);
    }

    #[test]
    fn monitor_default_interval() {
        assert_eq!(MonitorSettings::default().interval_secs, 30);
    }

    #[test]
    fn registry_prunes_by_default() {
        assert!(RegistrySettings::default().prune_empty);
    }
}
