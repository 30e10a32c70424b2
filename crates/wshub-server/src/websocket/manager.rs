//! Handshake authorization, fan-out and forced disconnects.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, info, warn};
use wshub_auth::TokenValidator;
use wshub_core::{Clock, ConnectionId, MessageEnvelope, MessageKind, Risk, SocketHandle};

use super::connection::Connection;
use super::handshake::HandshakeRejection;
use super::receive::{InboundHandler, LoggingInboundHandler};
use super::registry::ConnectionRegistry;
use crate::metrics::HUB_MESSAGES_SENT_TOTAL;

/// Counts from one fan-out call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    /// Sockets a send was attempted on.
    pub attempted: usize,
    /// Sockets the frame was written to.
    pub delivered: usize,
}

/// Counts from one disconnect call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DisconnectReport {
    /// Users visited.
    pub users: usize,
    /// Sockets removed.
    pub removed: usize,
}

/// Owns the registry and everything that acts on it.
pub struct ConnectionManager {
    registry: ConnectionRegistry,
    validator: Arc<dyn TokenValidator>,
    clock: Arc<dyn Clock>,
    inbound: Arc<dyn InboundHandler>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Manager with an empty registry and the logging inbound handler.
    pub fn new(
        validator: Arc<dyn TokenValidator>,
        clock: Arc<dyn Clock>,
        prune_empty: bool,
    ) -> Self {
        Self {
            registry: ConnectionRegistry::new(prune_empty),
            validator,
            clock,
            inbound: Arc::new(LoggingInboundHandler),
        }
    }

    /// Replace the handler invoked for client text frames.
    #[must_use]
    pub fn with_inbound_handler(mut self, handler: Arc<dyn InboundHandler>) -> Self {
        self.inbound = handler;
        self
    }

    /// The user/socket registry.
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Handler for client text frames.
    pub fn inbound(&self) -> &Arc<dyn InboundHandler> {
        &self.inbound
    }

    /// Users with a registry entry.
    pub fn user_count(&self) -> usize {
        self.registry.user_count()
    }

    /// Registered sockets across all users.
    pub fn socket_count(&self) -> usize {
        self.registry.socket_count()
    }

    pub(crate) fn now_envelope(&self, risk: Risk, kind: MessageKind, body: &str) -> MessageEnvelope {
        MessageEnvelope::new(risk, kind, self.clock.now(), body)
    }

    pub(crate) fn ping_envelope(&self) -> MessageEnvelope {
        MessageEnvelope::ping(self.clock.now())
    }

    // ── Handshake ───────────────────────────────────────────────────────

    /// Resolve the user for an upgrade request's `token` parameter.
    pub fn authorize(&self, token: Option<&str>) -> Result<String, HandshakeRejection> {
        let token = token
            .filter(|t| !t.is_empty())
            .ok_or(HandshakeRejection::MissingToken)?;
        match self.validator.validate(token) {
            Some(user_id) if !user_id.is_empty() => Ok(user_id),
            _ => {
                info!("handshake rejected: token did not authenticate");
                Err(HandshakeRejection::Unauthorized)
            }
        }
    }

    /// Mint an id for `handle` and register it under `user_id`.
    pub fn register_socket(&self, user_id: &str, handle: Arc<dyn SocketHandle>) -> ConnectionId {
        let id = ConnectionId::new();
        let conn = self.registry.register(user_id, id, handle);
        info!(user_id, socket_id = %id, sockets = conn.socket_count(), "socket registered");
        id
    }

    /// Remove one socket and prune the user's entry if it became empty.
    pub async fn remove_socket(&self, user_id: &str, id: ConnectionId) -> bool {
        let Some(conn) = self.registry.get(user_id) else {
            return false;
        };
        let removed = conn.remove_socket(id).await;
        self.prune(user_id);
        removed
    }

    fn prune(&self, user_id: &str) {
        if self.registry.prunes_empty() && self.registry.prune_if_empty(user_id) {
            debug!(user_id, "empty connection pruned");
        }
    }

    // ── Fan-out ─────────────────────────────────────────────────────────

    /// Send one broadcast envelope to every socket of every user.
    pub async fn send_to_all(&self, risk: Risk, body: &str) -> DeliveryReport {
        let envelope = self.now_envelope(risk, MessageKind::Broadcast, body);
        let connections: Vec<_> = self
            .registry
            .user_ids()
            .iter()
            .filter_map(|u| self.registry.get(u))
            .collect();
        let report = deliver(&connections, &envelope).await;
        info!(
            risk = ?risk,
            users = connections.len(),
            attempted = report.attempted,
            delivered = report.delivered,
            "broadcast sent"
        );
        report
    }

    /// Send one direct envelope to every socket of `user_id`. Unknown users
    /// are a no-op.
    pub async fn send_to_user(&self, user_id: &str, risk: Risk, body: &str) -> DeliveryReport {
        let Some(conn) = self.registry.get(user_id) else {
            info!(user_id, "send to unknown user ignored");
            return DeliveryReport::default();
        };
        let envelope = self.now_envelope(risk, MessageKind::Direct, body);
        let report = deliver(&[conn], &envelope).await;
        info!(
            user_id,
            risk = ?risk,
            attempted = report.attempted,
            delivered = report.delivered,
            "direct message sent"
        );
        report
    }

    // ── Disconnect ──────────────────────────────────────────────────────

    /// Remove every socket of `user_id`. Unknown users are a no-op.
    pub async fn disconnect_user(&self, user_id: &str) -> DisconnectReport {
        let Some(conn) = self.registry.get(user_id) else {
            info!(user_id, "disconnect of unknown user ignored");
            return DisconnectReport::default();
        };
        let removed = join_all(conn.socket_ids().into_iter().map(|id| conn.remove_socket(id)))
            .await
            .into_iter()
            .filter(|removed| *removed)
            .count();
        self.prune(user_id);
        info!(user_id, removed, "user disconnected");
        DisconnectReport { users: 1, removed }
    }

    /// Remove every socket of every user.
    pub async fn disconnect_all(&self) -> DisconnectReport {
        let user_ids = self.registry.user_ids();
        let mut total = DisconnectReport::default();
        for user_id in &user_ids {
            let report = self.disconnect_user(user_id).await;
            total.users += report.users;
            total.removed += report.removed;
        }
        info!(users = total.users, removed = total.removed, "all users disconnected");
        total
    }
}

/// Serialize `envelope` once and write it to every socket of `connections`
/// concurrently.
async fn deliver(connections: &[Arc<Connection>], envelope: &MessageEnvelope) -> DeliveryReport {
    let text = match envelope.to_json() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to serialize envelope");
            return DeliveryReport::default();
        }
    };

    let sends = connections.iter().flat_map(|conn| {
        let text = text.as_str();
        conn.socket_ids()
            .into_iter()
            .map(move |id| conn.send(id, text))
    });
    let outcomes = join_all(sends).await;

    let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();
    let kind = kind_label(envelope.kind());
    metrics::counter!(HUB_MESSAGES_SENT_TOTAL, "kind" => kind)
        .increment(u64::try_from(delivered).unwrap_or(u64::MAX));
    DeliveryReport {
        attempted: outcomes.len(),
        delivered,
    }
}

pub(crate) fn kind_label(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::Broadcast => "broadcast",
        MessageKind::Direct => "direct",
    }
}
