//! Periodic liveness sweep.
//!
//! Each cycle pings every `Open` socket and reaps every socket that is not,
//! so sockets whose peers vanished without a close frame do not linger.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::task::JoinHandle;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use wshub_core::MessageKind;

use super::manager::{ConnectionManager, kind_label};
use crate::metrics::{
    HUB_MESSAGES_SENT_TOTAL, MONITOR_CYCLES_TOTAL, MONITOR_PRUNED_TOTAL, WS_CONNECTIONS_ACTIVE,
};

/// Counts from one monitor cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MonitorReport {
    /// `Open` sockets that were pinged.
    pub active: usize,
    /// Sockets removed because they were not `Open`.
    pub pruned: usize,
}

/// Run one sweep over every registered socket.
pub async fn run_cycle(manager: &ConnectionManager) -> MonitorReport {
    let envelope = manager.ping_envelope();
    let ping = match envelope.to_json() {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to serialize ping");
            return MonitorReport::default();
        }
    };

    let mut report = MonitorReport::default();
    for user_id in manager.registry().user_ids() {
        let Some(conn) = manager.registry().get(&user_id) else {
            continue;
        };
        let (open, stale): (Vec<_>, Vec<_>) = conn
            .socket_ids()
            .into_iter()
            .partition(|id| conn.is_open(*id));

        let delivered = join_all(open.iter().map(|id| conn.send(*id, &ping)))
            .await
            .into_iter()
            .filter(|o| o.is_delivered())
            .count();
        metrics::counter!(HUB_MESSAGES_SENT_TOTAL, "kind" => kind_label(MessageKind::Direct))
            .increment(u64::try_from(delivered).unwrap_or(u64::MAX));
        report.active += open.len();

        for id in stale {
            if manager.remove_socket(&user_id, id).await {
                debug!(user_id, socket_id = %id, "stale socket reaped");
                report.pruned += 1;
            }
        }
    }

    metrics::counter!(MONITOR_CYCLES_TOTAL).increment(1);
    metrics::counter!(MONITOR_PRUNED_TOTAL)
        .increment(u64::try_from(report.pruned).unwrap_or(u64::MAX));
    #[allow(clippy::cast_precision_loss)]
    let active = report.active as f64;
    metrics::gauge!(WS_CONNECTIONS_ACTIVE).set(active);
    info!(active = report.active, pruned = report.pruned, "monitor cycle complete");
    report
}

/// Sweep every `interval` until `cancel` fires. The first sweep runs
/// immediately.
pub async fn run_monitor(
    manager: Arc<ConnectionManager>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    info!(interval_secs = interval.as_secs(), "connection monitor started");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let _ = run_cycle(&manager).await;
            }
        }
    }
    info!("connection monitor stopped");
}

/// Spawn [`run_monitor`] on the current runtime.
pub fn spawn_monitor(
    manager: Arc<ConnectionManager>,
    interval: Duration,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(run_monitor(manager, interval, cancel))
}
