//! Transport-agnostic duplex socket abstraction.
//!
//! The hub never touches a concrete WebSocket type. It talks to a
//! [`SocketHandle`] for outbound frames and consumes a stream of
//! [`InboundFrame`]s in the receive loop. The axum adapter in `wshub-server`
//! implements both halves; tests use `testing::FakeSocket`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

use async_trait::async_trait;

/// Lifecycle state reported by a socket handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SocketState {
    /// Handshake still in progress.
    Connecting,
    /// Frames can be exchanged.
    Open,
    /// A close frame has been sent or received.
    Closing,
    /// Terminal.
    Closed,
}

impl SocketState {
    const fn to_u8(self) -> u8 {
        match self {
            Self::Connecting => 0,
            Self::Open => 1,
            Self::Closing => 2,
            Self::Closed => 3,
        }
    }

    const fn from_u8(raw: u8) -> Self {
        match raw {
            0 => Self::Connecting,
            1 => Self::Open,
            2 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

/// Errors from socket I/O.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
    /// The socket is not in the `Open` state.
    #[error("socket is not open (state: {0:?})")]
    NotOpen(SocketState),
    /// The underlying transport failed.
    #[error("transport error: {0}")]
    Transport(String),
}

/// A frame received from the peer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InboundFrame {
    /// UTF-8 text frame.
    Text(String),
    /// Binary frame.
    Binary(Vec<u8>),
    /// Control ping.
    Ping,
    /// Control pong.
    Pong,
    /// Peer-initiated close, with optional reason.
    Close(Option<String>),
}

/// Outbound half of a duplex socket.
///
/// Implementations must serialize concurrent `send_text` calls so frames
/// on one socket go out in call order.
#[async_trait]
pub trait SocketHandle: Send + Sync {
    /// Current lifecycle state.
    fn state(&self) -> SocketState;

    /// Write one text frame.
    async fn send_text(&self, text: &str) -> Result<(), SocketError>;

    /// Send a close frame carrying `reason`.
    async fn close(&self, reason: &str) -> Result<(), SocketError>;

    /// Release transport resources. Called once, after the handle has been
    /// removed from its connection.
    fn release(&self) {}
}

/// Lock-free [`SocketState`] cell shared between the halves of an adapter.
#[derive(Clone, Debug)]
pub struct AtomicSocketState(Arc<AtomicU8>);

impl AtomicSocketState {
    /// Create a cell holding `state`.
    pub fn new(state: SocketState) -> Self {
        Self(Arc::new(AtomicU8::new(state.to_u8())))
    }

    /// Read the current state.
    pub fn get(&self) -> SocketState {
        SocketState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Overwrite the state.
    pub fn set(&self, state: SocketState) {
        self.0.store(state.to_u8(), Ordering::Release);
    }

    /// Move to `Closing` unless already `Closed`.
    pub fn begin_close(&self) {
        let _ = self.0.fetch_update(Ordering::AcqRel, Ordering::Acquire, |raw| {
            (SocketState::from_u8(raw) != SocketState::Closed)
                .then_some(SocketState::Closing.to_u8())
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_roundtrips_through_u8() {
        for state in [
            SocketState::Connecting,
            SocketState::Open,
            SocketState::Closing,
            SocketState::Closed,
        ] {
            assert_eq!(SocketState::from_u8(state.to_u8()), state);
        }
    }

    #[test]
    fn atomic_state_is_shared_between_clones() {
        let a = AtomicSocketState::new(SocketState::Open);
        let b = a.clone();
        b.set(SocketState::Closed);
        assert_eq!(a.get(), SocketState::Closed);
    }

    #[test]
    fn begin_close_from_open() {
        let s = AtomicSocketState::new(SocketState::Open);
        s.begin_close();
        assert_eq!(s.get(), SocketState::Closing);
    }

    #[test]
    fn begin_close_does_not_reopen_closed() {
        let s = AtomicSocketState::new(SocketState::Closed);
        s.begin_close();
        assert_eq!(s.get(), SocketState::Closed);
    }

    #[test]
    fn not_open_error_names_state() {
        let err = SocketError::NotOpen(SocketState::Closing);
        assert_eq!(err.to_string(), "socket is not open (state: Closing)");
    }
}
