//! Shutdown signalling for the listener and the liveness monitor.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How long [`ShutdownCoordinator::graceful_shutdown`] waits by default.
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the root cancellation token. Background tasks get child tokens.
#[derive(Debug, Default)]
pub struct ShutdownCoordinator {
    root: CancellationToken,
}

impl ShutdownCoordinator {
    /// Coordinator that has not started shutting down.
    pub fn new() -> Self {
        Self::default()
    }

    /// Child token, cancelled once shutdown starts. Cancelling the child
    /// itself does not affect the coordinator.
    pub fn token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Start shutting down. Idempotent.
    pub fn shutdown(&self) {
        self.root.cancel();
    }

    /// Whether shutdown has started.
    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Start shutting down, then wait up to `timeout` (default
    /// [`DEFAULT_DRAIN_TIMEOUT`]) for `handles`. Returns whether every task
    /// finished in time.
    pub async fn graceful_shutdown(&self, handles: Vec<JoinHandle<()>>, timeout: Option<Duration>) -> bool {
        let timeout = timeout.unwrap_or(DEFAULT_DRAIN_TIMEOUT);
        self.shutdown();
        info!(tasks = handles.len(), timeout_ms = timeout.as_millis(), "draining background tasks");

        if tokio::time::timeout(timeout, futures::future::join_all(handles))
            .await
            .is_ok()
        {
            true
        } else {
            warn!(?timeout, "background tasks still running after drain timeout");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_running() {
        assert!(!ShutdownCoordinator::new().is_shutting_down());
    }

    #[test]
    fn shutdown_cancels_every_child() {
        let coord = ShutdownCoordinator::new();
        let (listener, monitor) = (coord.token(), coord.token());
        coord.shutdown();
        coord.shutdown();
        assert!(coord.is_shutting_down());
        assert!(listener.is_cancelled() && monitor.is_cancelled());
    }

    #[test]
    fn cancelled_child_leaves_coordinator_running() {
        let coord = ShutdownCoordinator::new();
        coord.token().cancel();
        assert!(!coord.is_shutting_down());
    }

    #[tokio::test]
    async fn drains_tasks_waiting_on_their_token() {
        let coord = ShutdownCoordinator::new();
        let tasks = (0..3)
            .map(|_| {
                let token = coord.token();
                tokio::spawn(async move { token.cancelled().await })
            })
            .collect();
        assert!(coord.graceful_shutdown(tasks, None).await);
    }

    #[tokio::test(start_paused = true)]
    async fn reports_stuck_task() {
        let coord = ShutdownCoordinator::new();
        let stuck = tokio::spawn(tokio::time::sleep(Duration::from_secs(300)));
        let drained = coord
            .graceful_shutdown(vec![stuck], Some(Duration::from_millis(100)))
            .await;
        assert!(!drained);
        assert!(coord.is_shutting_down());
    }
}
