//! The message envelope pushed to connected clients.
//!
//! Wire format is a flat JSON object:
//!
//! ```json
//! {"risk": "Low", "type": "Private", "sentAt": "2026-01-01T00:00:00Z", "message": "hi"}
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Body of the periodic liveness ping.
pub const PING_BODY: &str = "Ping";

/// Risk level attached to a message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Risk {
    /// Informational.
    #[default]
    Low,
    /// Needs attention.
    Medium,
    /// Urgent.
    High,
}

/// Addressing mode of a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Sent to every connected user.
    #[serde(rename = "All")]
    Broadcast,
    /// Sent to a single user (also used for pings).
    #[serde(rename = "Private")]
    Direct,
}

/// Immutable value carried over the wire to clients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageEnvelope {
    risk: Risk,
    #[serde(rename = "type")]
    kind: MessageKind,
    sent_at: DateTime<Utc>,
    #[serde(rename = "message")]
    body: String,
}

impl MessageEnvelope {
    /// Build an envelope.
    pub fn new(risk: Risk, kind: MessageKind, sent_at: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self {
            risk,
            kind,
            sent_at,
            body: body.into(),
        }
    }

    /// Broadcast envelope for every connected user.
    pub fn broadcast(risk: Risk, sent_at: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self::new(risk, MessageKind::Broadcast, sent_at, body)
    }

    /// Direct envelope for a single user.
    pub fn direct(risk: Risk, sent_at: DateTime<Utc>, body: impl Into<String>) -> Self {
        Self::new(risk, MessageKind::Direct, sent_at, body)
    }

    /// Low-risk direct `"Ping"` used by the liveness monitor.
    pub fn ping(sent_at: DateTime<Utc>) -> Self {
        Self::direct(Risk::Low, sent_at, PING_BODY)
    }

    /// Risk level.
    pub fn risk(&self) -> Risk {
        self.risk
    }

    /// Addressing mode.
    pub fn kind(&self) -> MessageKind {
        self.kind
    }

    /// When the hub stamped this envelope.
    pub fn sent_at(&self) -> DateTime<Utc> {
        self.sent_at
    }

    /// Message body.
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Serialize to the JSON wire format.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::Value;

    fn at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn wire_field_names() {
        let json = MessageEnvelope::direct(Risk::High, at(), "hi").to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        let obj = parsed.as_object().unwrap();
        assert_eq!(obj.len(), 4);
        assert_eq!(parsed["risk"], "High");
        assert_eq!(parsed["type"], "Private");
        assert_eq!(parsed["message"], "hi");
        assert!(parsed["sentAt"].is_string());
    }

    #[test]
    fn broadcast_serializes_as_all() {
        let json = MessageEnvelope::broadcast(Risk::Medium, at(), "x").to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["type"], "All");
        assert_eq!(parsed["risk"], "Medium");
    }

    #[test]
    fn sent_at_is_iso8601() {
        let json = MessageEnvelope::ping(at()).to_json().unwrap();
        let parsed: Value = serde_json::from_str(&json).unwrap();
        let raw = parsed["sentAt"].as_str().unwrap();
        let back = DateTime::parse_from_rfc3339(raw).unwrap();
        assert_eq!(back.with_timezone(&Utc), at());
    }

    #[test]
    fn ping_is_low_direct() {
        let ping = MessageEnvelope::ping(at());
        assert_eq!(ping.risk(), Risk::Low);
        assert_eq!(ping.kind(), MessageKind::Direct);
        assert_eq!(ping.body(), PING_BODY);
        assert_eq!(ping.sent_at(), at());
    }

    #[test]
    fn deserialize_tolerates_extra_fields() {
        let raw = r#"{"risk":"Low","type":"All","sentAt":"2026-01-01T12:30:00Z","message":"m","extra":1}"#;
        let env: MessageEnvelope = serde_json::from_str(raw).unwrap();
        assert_eq!(env.kind(), MessageKind::Broadcast);
        assert_eq!(env.body(), "m");
    }

    #[test]
    fn risk_defaults_to_low() {
        assert_eq!(Risk::default(), Risk::Low);
    }

    #[test]
    fn unknown_risk_is_rejected() {
        let result = serde_json::from_str::<Risk>("\"Critical\"");
        assert!(result.is_err());
    }
}
