//! Completion sweeper
//!
//! The engine's only scheduled task. On every tick it asks the service to
//! abandon stale lobbies, finish races past their deadline, and re-drive
//! rating settlements that were never confirmed.

use crate::ports::inbound::RushEngineApi;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Periodic driver for [`RushEngineApi::sweep`].
pub struct CompletionSweeper<E: RushEngineApi + ?Sized> {
    engine: Arc<E>,
    interval: Duration,
}

impl<E: RushEngineApi + ?Sized> CompletionSweeper<E> {
    pub fn new(engine: Arc<E>, interval: Duration) -> Self {
        Self { engine, interval }
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        info!(interval_ms = self.interval.as_millis() as u64, "[rush] Completion sweeper started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.sweep().await {
                        Ok(report) => debug!(?report, "[rush] Sweep tick"),
                        Err(e) => warn!(error = %e, "[rush] Sweep tick failed"),
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        info!("[rush] Completion sweeper shutting down");
                        return;
                    }
                }
            }
        }
    }
}
