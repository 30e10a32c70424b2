//! Per-socket receive loop.
//!
//! One task per accepted socket drains inbound frames until the peer
//! closes, the transport fails, or the stream ends. Whatever the exit path,
//! the socket is removed from the registry: explicitly when the loop returns,
//! or from [`SocketLease`]'s `Drop` if the task is cancelled or unwinds.

use std::sync::Arc;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use tracing::{debug, info, instrument, warn};
use wshub_core::{ConnectionId, InboundFrame, SocketError, SocketHandle};

use super::manager::ConnectionManager;

/// Close reason sent when answering a peer-initiated close.
pub const PEER_CLOSE_REASON: &str = "Closed by user";

/// Hook for client text frames.
#[async_trait]
pub trait InboundHandler: Send + Sync {
    /// Called once per inbound text frame, in arrival order for a socket.
    async fn on_text(&self, user_id: &str, socket_id: ConnectionId, text: &str);
}

/// Default handler: logs and drops the frame.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingInboundHandler;

#[async_trait]
impl InboundHandler for LoggingInboundHandler {
    async fn on_text(&self, user_id: &str, socket_id: ConnectionId, text: &str) {
        debug!(user_id, socket_id = %socket_id, len = text.len(), "text frame received");
    }
}

/// How a receive loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReceiveExit {
    /// The peer sent a close frame.
    PeerClosed,
    /// Reading from the transport failed.
    TransportError,
    /// The frame stream ended without a close frame.
    StreamEnded,
}

/// Guarantees a registered socket is removed once its receive loop is done.
///
/// Call [`SocketLease::release`] on the normal exit path. If the lease is
/// dropped unreleased, removal is spawned on the current runtime.
#[derive(Debug)]
pub struct SocketLease {
    manager: Arc<ConnectionManager>,
    user_id: String,
    socket_id: ConnectionId,
    released: bool,
}

impl SocketLease {
    /// Lease for a socket already registered under `user_id`.
    pub fn new(manager: Arc<ConnectionManager>, user_id: String, socket_id: ConnectionId) -> Self {
        Self {
            manager,
            user_id,
            socket_id,
            released: false,
        }
    }

    /// The leased socket.
    pub fn socket_id(&self) -> ConnectionId {
        self.socket_id
    }

    /// Remove the socket now.
    pub async fn release(mut self) {
        self.released = true;
        let _ = self
            .manager
            .remove_socket(&self.user_id, self.socket_id)
            .await;
    }
}

impl Drop for SocketLease {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let manager = Arc::clone(&self.manager);
        let user_id = std::mem::take(&mut self.user_id);
        let socket_id = self.socket_id;
        match tokio::runtime::Handle::try_current() {
            Ok(rt) => {
                drop(rt.spawn(async move {
                    let _ = manager.remove_socket(&user_id, socket_id).await;
                }));
            }
            Err(_) => {
                warn!(user_id, socket_id = %socket_id, "no runtime to remove dropped socket");
            }
        }
    }
}

/// Register `handle` for `user_id` and drain `frames` until the socket is
/// done, then remove it.
pub async fn serve_socket<S>(
    manager: Arc<ConnectionManager>,
    user_id: String,
    handle: Arc<dyn SocketHandle>,
    frames: S,
) -> ReceiveExit
where
    S: Stream<Item = Result<InboundFrame, SocketError>> + Unpin + Send,
{
    let socket_id = manager.register_socket(&user_id, Arc::clone(&handle));
    let lease = SocketLease::new(Arc::clone(&manager), user_id.clone(), socket_id);

    let exit = receive_loop(&manager, &user_id, socket_id, handle.as_ref(), frames).await;
    debug!(user_id, socket_id = %socket_id, exit = ?exit, "receive loop finished");

    lease.release().await;
    exit
}

#[instrument(skip_all, fields(user_id = %user_id, socket_id = %socket_id))]
async fn receive_loop<S>(
    manager: &ConnectionManager,
    user_id: &str,
    socket_id: ConnectionId,
    handle: &dyn SocketHandle,
    mut frames: S,
) -> ReceiveExit
where
    S: Stream<Item = Result<InboundFrame, SocketError>> + Unpin + Send,
{
    loop {
        match frames.next().await {
            Some(Ok(InboundFrame::Text(text))) => {
                manager.inbound().on_text(user_id, socket_id, &text).await;
            }
            Some(Ok(InboundFrame::Close(reason))) => {
                info!(reason = reason.as_deref().unwrap_or(""), "peer closed socket");
                if let Err(e) = handle.close(PEER_CLOSE_REASON).await {
                    debug!(error = %e, "close reply failed");
                }
                return ReceiveExit::PeerClosed;
            }
            Some(Ok(InboundFrame::Binary(_) | InboundFrame::Ping | InboundFrame::Pong)) => {}
            Some(Err(e)) => {
                warn!(error = %e, "receive failed");
                return ReceiveExit::TransportError;
            }
            None => {
                debug!("inbound stream ended");
                return ReceiveExit::StreamEnded;
            }
        }
    }
}
