//! In-memory socket double for tests.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::socket::{AtomicSocketState, SocketError, SocketHandle, SocketState};

/// Socket that records outbound frames and lets tests script its state
/// and failures.
#[derive(Debug)]
pub struct FakeSocket {
    state: AtomicSocketState,
    sent: Mutex<Vec<String>>,
    close_reasons: Mutex<Vec<String>>,
    fail_sends: AtomicBool,
    fail_close: AtomicBool,
    send_attempts: AtomicUsize,
    released: AtomicBool,
}

impl FakeSocket {
    /// A socket in `state`.
    pub fn with_state(state: SocketState) -> Arc<Self> {
        Arc::new(Self {
            state: AtomicSocketState::new(state),
            sent: Mutex::new(Vec::new()),
            close_reasons: Mutex::new(Vec::new()),
            fail_sends: AtomicBool::new(false),
            fail_close: AtomicBool::new(false),
            send_attempts: AtomicUsize::new(0),
            released: AtomicBool::new(false),
        })
    }

    /// An open socket.
    pub fn open() -> Arc<Self> {
        Self::with_state(SocketState::Open)
    }

    /// Force the reported state.
    pub fn set_state(&self, state: SocketState) {
        self.state.set(state);
    }

    /// Make every subsequent send fail with a transport error.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Make every subsequent close fail with a transport error.
    pub fn fail_close(&self, fail: bool) {
        self.fail_close.store(fail, Ordering::Relaxed);
    }

    /// Text frames written so far.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }

    /// Reasons passed to `close`, in call order.
    pub fn close_reasons(&self) -> Vec<String> {
        self.close_reasons.lock().clone()
    }

    /// Number of `send_text` calls, successful or not.
    pub fn send_attempts(&self) -> usize {
        self.send_attempts.load(Ordering::Relaxed)
    }

    /// Whether `release` has been called.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SocketHandle for FakeSocket {
    fn state(&self) -> SocketState {
        self.state.get()
    }

    async fn send_text(&self, text: &str) -> Result<(), SocketError> {
        let _ = self.send_attempts.fetch_add(1, Ordering::Relaxed);
        if self.fail_sends.load(Ordering::Relaxed) {
            self.state.set(SocketState::Closed);
            return Err(SocketError::Transport("injected send failure".into()));
        }
        let state = self.state.get();
        if state != SocketState::Open {
            return Err(SocketError::NotOpen(state));
        }
        self.sent.lock().push(text.to_owned());
        Ok(())
    }

    async fn close(&self, reason: &str) -> Result<(), SocketError> {
        self.close_reasons.lock().push(reason.to_owned());
        self.state.set(SocketState::Closed);
        if self.fail_close.load(Ordering::Relaxed) {
            return Err(SocketError::Transport("injected close failure".into()));
        }
        Ok(())
    }

    fn release(&self) {
        self.released.store(true, Ordering::Relaxed);
    }
}
