// src/ingest/scheduler.rs
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::config::MAX_POLL_INTERVAL_SECS;
use crate::relay::{CycleReport, Relay};

#[derive(Clone, Copy, Debug)]
pub struct RelaySchedulerCfg {
    pub interval_secs: u64,
}

pub struct SchedulerHandle {
    cancel_tx: broadcast::Sender<()>,
    join: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Stops ticking. A cycle already running is allowed to finish first.
    pub async fn stop(self) -> Result<(), tokio::task::JoinError> {
        let _ = self.cancel_tx.send(());
        self.join.await
    }
}

/// Runs `relay.run_cycle()` every `interval_secs`, first run one period after start.
/// The period is clamped to `1..=MAX_POLL_INTERVAL_SECS`.
pub fn spawn_relay_scheduler(relay: Arc<Relay>, cfg: RelaySchedulerCfg) -> SchedulerHandle {
    let (cancel_tx, mut cancel_rx) = broadcast::channel(1);
    let secs = cfg.interval_secs.clamp(1, MAX_POLL_INTERVAL_SECS);
    if secs != cfg.interval_secs {
        tracing::warn!(
            target: "ingest",
            requested = cfg.interval_secs,
            used = secs,
            "poll interval out of range; clamped"
        );
    }
    let period = Duration::from_secs(secs);

    let join = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = cancel_rx.recv() => {
                    tracing::info!(target: "ingest", "relay scheduler shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let report = relay.run_cycle().await;
                    tracing::debug!(
                        target: "ingest",
                        ok = report.is_success(),
                        busy = matches!(report, CycleReport::Busy),
                        "scheduled relay tick"
                    );
                }
            }
        }
    });

    SchedulerHandle { cancel_tx, join }
}
