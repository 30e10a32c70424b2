//! User id to [`Connection`] map.

use std::sync::Arc;

use dashmap::DashMap;
use wshub_core::{ConnectionId, SocketHandle};

use super::connection::Connection;
use crate::metrics::WS_CONNECTIONS_TOTAL;

/// Concurrent map from user id to that user's [`Connection`].
///
/// `register` and `prune_if_empty` both run under the key's shard lock, so a
/// socket is never added to an entry that is concurrently being pruned.
#[derive(Debug)]
pub struct ConnectionRegistry {
    connections: DashMap<String, Arc<Connection>>,
    prune_empty: bool,
}

impl ConnectionRegistry {
    /// Empty registry. With `prune_empty`, entries are dropped once their
    /// last socket is removed.
    pub fn new(prune_empty: bool) -> Self {
        Self {
            connections: DashMap::new(),
            prune_empty,
        }
    }

    /// Whether empty entries are pruned.
    pub fn prunes_empty(&self) -> bool {
        self.prune_empty
    }

    /// The connection for `user_id`, created if absent. Racing callers all
    /// receive the same instance.
    pub fn get_or_create(&self, user_id: &str) -> Arc<Connection> {
        let entry = self
            .connections
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Connection::new(user_id)));
        Arc::clone(entry.value())
    }

    /// The connection for `user_id`, if present.
    pub fn get(&self, user_id: &str) -> Option<Arc<Connection>> {
        self.connections.get(user_id).map(|c| Arc::clone(c.value()))
    }

    /// Snapshot of registered user ids.
    pub fn user_ids(&self) -> Vec<String> {
        self.connections.iter().map(|e| e.key().clone()).collect()
    }

    /// Get-or-create the user's connection and add `handle` under `id` in
    /// one step.
    pub fn register(
        &self,
        user_id: &str,
        id: ConnectionId,
        handle: Arc<dyn SocketHandle>,
    ) -> Arc<Connection> {
        let entry = self
            .connections
            .entry(user_id.to_owned())
            .or_insert_with(|| Arc::new(Connection::new(user_id)));
        if entry.add_socket(id, handle) {
            metrics::counter!(WS_CONNECTIONS_TOTAL).increment(1);
        }
        Arc::clone(entry.value())
    }

    /// Drop `user_id`'s entry if it holds no sockets. Returns whether it
    /// was dropped.
    pub fn prune_if_empty(&self, user_id: &str) -> bool {
        self.connections
            .remove_if(user_id, |_, conn| conn.is_empty())
            .is_some()
    }

    /// Number of users with an entry.
    pub fn user_count(&self) -> usize {
        self.connections.len()
    }

    /// Registered sockets across all users.
    pub fn socket_count(&self) -> usize {
        self.connections.iter().map(|e| e.value().socket_count()).sum()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new(true)
    }
}
