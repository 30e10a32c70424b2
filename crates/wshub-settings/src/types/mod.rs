//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it overrides.

mod logging;
mod server;
mod token;

pub use logging::*;
pub use server::*;
pub use token::*;

use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};

use crate::loader::{MESSAGE_SIZES, MONITOR_INTERVALS, TOKEN_LIFETIMES};

/// Root settings type.
///
/// ```json
/// {
///   "server": { "port": 9000 },
///   "monitor": { "intervalSecs": 10 },
///   "token": { "securityKey": "..." }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HubSettings {
    /// HTTP/WebSocket listener.
    pub server: ServerSettings,
    /// Liveness monitor.
    pub monitor: MonitorSettings,
    /// Connection registry behaviour.
    pub registry: RegistrySettings,
    /// Bearer token issuance and validation.
    pub token: TokenSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl HubSettings {
    /// Reject values the server cannot run with.
    pub fn validate(&self) -> crate::Result<()> {
        check_range("server.maxMessageSize", self.server.max_message_size, &MESSAGE_SIZES)?;
        check_range("monitor.intervalSecs", self.monitor.interval_secs, &MONITOR_INTERVALS)?;
        if self.token.security_key.len() < MIN_SECURITY_KEY_LEN {
            return Err(crate::SettingsError::InvalidValue(format!(
                "token.securityKey must be at least {MIN_SECURITY_KEY_LEN} bytes"
            )));
        }
        check_range("token.expirationMinutes", self.token.expiration_minutes, &TOKEN_LIFETIMES)
    }
}

fn check_range<T>(key: &str, value: T, range: &RangeInclusive<T>) -> crate::Result<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if range.contains(&value) {
        Ok(())
    } else {
        Err(crate::SettingsError::InvalidValue(format!(
            "{key} must be within {}..={}, got {value}",
            range.start(),
            range.end()
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        HubSettings::default().validate().unwrap();
    }

    #[test]
    fn zero_interval_rejected() {
        let mut s = HubSettings::default();
        s.monitor.interval_secs = 0;
        assert!(s.validate().is_err());
    }

    #[test]
    fn message_size_out_of_range_rejected() {
        let mut s = HubSettings::default();
        s.server.max_message_size = 0;
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("server.maxMessageSize"));

        s.server.max_message_size = 64 * 1024 * 1024 + 1;
        assert!(s.validate().is_err());

        s.server.max_message_size = 1024;
        s.validate().unwrap();
    }

    #[test]
    fn zero_token_lifetime_rejected() {
        let mut s = HubSettings::default();
        s.token.expiration_minutes = 0;
        assert!(s.validate().unwrap_err().to_string().contains("expirationMinutes"));
    }

    #[test]
    fn short_key_rejected() {
        let mut s = HubSettings::default();
        s.token.security_key = "short".into();
        let err = s.validate().unwrap_err();
        assert!(err.to_string().contains("securityKey"));
    }

    #[test]
    fn serializes_camel_case() {
        let json = serde_json::to_value(HubSettings::default()).unwrap();
        assert!(json["monitor"]["intervalSecs"].is_number());
        assert!(json["registry"]["pruneEmpty"].is_boolean());
        assert!(json["token"]["expirationMinutes"].is_number());
        assert!(json["server"]["maxMessageSize"].is_number());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let s: HubSettings = serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(s.server.port, 9000);
        assert_eq!(s.server.host, ServerSettings::default().host);
        assert_eq!(s.monitor.interval_secs, 30);
    }
}
