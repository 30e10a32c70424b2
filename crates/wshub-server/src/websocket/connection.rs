//! All live sockets held by one user.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};
use wshub_core::{ConnectionId, SocketHandle, SocketState};

use crate::metrics::{WS_DISCONNECTIONS_TOTAL, WS_SEND_FAILURES_TOTAL};

/// Close reason used when the hub drops a socket.
pub const FORCED_CLOSE_REASON: &str = "forced";

/// Result of [`Connection::send`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendOutcome {
    /// One text frame was written.
    Delivered,
    /// Nothing to send.
    EmptyBody,
    /// No socket with that id.
    UnknownSocket,
    /// The socket exists but is not `Open`.
    NotOpen,
    /// The write failed; logged and counted.
    Failed,
}

impl SendOutcome {
    /// Whether the frame went out.
    pub fn is_delivered(self) -> bool {
        self == Self::Delivered
    }
}

/// Sockets belonging to one user identity.
///
/// The socket map is only locked for map operations; handles are cloned out
/// before any I/O.
pub struct Connection {
    user_id: String,
    sockets: Mutex<HashMap<ConnectionId, Arc<dyn SocketHandle>>>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("user_id", &self.user_id)
            .field("sockets", &self.socket_count())
            .finish()
    }
}

impl Connection {
    /// Empty connection for `user_id`.
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            sockets: Mutex::new(HashMap::new()),
        }
    }

    /// Owning user.
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Insert `handle` under `id`. Returns `false` (and keeps the existing
    /// handle) if `id` is already present.
    pub fn add_socket(&self, id: ConnectionId, handle: Arc<dyn SocketHandle>) -> bool {
        let mut sockets = self.sockets.lock();
        if sockets.contains_key(&id) {
            return false;
        }
        let _ = sockets.insert(id, handle);
        true
    }

    /// Snapshot of the registered socket ids.
    pub fn socket_ids(&self) -> Vec<ConnectionId> {
        self.sockets.lock().keys().copied().collect()
    }

    /// Number of registered sockets.
    pub fn socket_count(&self) -> usize {
        self.sockets.lock().len()
    }

    /// Whether no sockets are registered.
    pub fn is_empty(&self) -> bool {
        self.sockets.lock().is_empty()
    }

    /// State of socket `id`, if registered.
    pub fn socket_state(&self, id: ConnectionId) -> Option<SocketState> {
        self.sockets.lock().get(&id).map(|h| h.state())
    }

    /// True iff `id` is registered and its socket is `Open`.
    pub fn is_open(&self, id: ConnectionId) -> bool {
        self.socket_state(id) == Some(SocketState::Open)
    }

    fn handle(&self, id: ConnectionId) -> Option<Arc<dyn SocketHandle>> {
        self.sockets.lock().get(&id).cloned()
    }

    /// Unregister socket `id`, closing it with [`FORCED_CLOSE_REASON`] if it
    /// is still `Open`, then releasing it.
    ///
    /// The entry is taken out of the map before any I/O, so concurrent
    /// callers race only on the map and exactly one of them closes the
    /// socket. Returns whether this call removed it.
    pub async fn remove_socket(&self, id: ConnectionId) -> bool {
        let Some(handle) = self.sockets.lock().remove(&id) else {
            return false;
        };

        if handle.state() == SocketState::Open {
            if let Err(e) = handle.close(FORCED_CLOSE_REASON).await {
                warn!(user_id = %self.user_id, socket_id = %id, error = %e, "close failed");
            }
        }
        handle.release();

        metrics::counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
        debug!(user_id = %self.user_id, socket_id = %id, "socket removed");
        true
    }

    /// Write `text` as one frame on socket `id`.
    ///
    /// Failures are logged and reported through the outcome, never raised.
    pub async fn send(&self, id: ConnectionId, text: &str) -> SendOutcome {
        if text.is_empty() {
            return SendOutcome::EmptyBody;
        }
        let Some(handle) = self.handle(id) else {
            return SendOutcome::UnknownSocket;
        };
        if handle.state() != SocketState::Open {
            return SendOutcome::NotOpen;
        }

        match handle.send_text(text).await {
            Ok(()) => SendOutcome::Delivered,
            Err(e) => {
                metrics::counter!(WS_SEND_FAILURES_TOTAL).increment(1);
                warn!(user_id = %self.user_id, socket_id = %id, error = %e, "send failed");
                SendOutcome::Failed
            }
        }
    }
}
