//! Match update fan-out adapters

use crate::ports::outbound::MatchNotifier;
use async_trait::async_trait;
use shared_bus::{EventPublisher, MatchUpdate, RushEvent};
use shared_types::MatchId;
use std::sync::Arc;
use tracing::{debug, warn};

/// Publishes every update to the shared event bus, where transports
/// subscribe per viewer.
pub struct EventBusNotifier<P: EventPublisher + ?Sized> {
    bus: Arc<P>,
}

impl<P: EventPublisher + ?Sized> EventBusNotifier<P> {
    pub fn new(bus: Arc<P>) -> Self {
        Self { bus }
    }
}

#[async_trait]
impl<P: EventPublisher + ?Sized> MatchNotifier for EventBusNotifier<P> {
    async fn notify(&self, updates: Vec<MatchUpdate>) {
        let count = updates.len();
        let mut delivered = 0;
        for update in updates {
            delivered += self.bus.publish(RushEvent::MatchUpdated(update)).await;
        }
        debug!(updates = count, delivered, "[rush] Match updates published");
    }

    async fn fault(&self, match_id: &MatchId, reason: &str) {
        warn!(match_id = %match_id, reason, "[rush] Publishing engine fault");
        self.bus
            .publish(RushEvent::EngineFault {
                match_id: match_id.clone(),
                reason: reason.to_string(),
            })
            .await;
    }
}

/// In-memory notifier for testing.
#[derive(Default)]
pub struct RecordingNotifier {
    updates: parking_lot::RwLock<Vec<MatchUpdate>>,
    faults: parking_lot::RwLock<Vec<(MatchId, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn updates(&self) -> Vec<MatchUpdate> {
        self.updates.read().clone()
    }

    pub fn faults(&self) -> Vec<(MatchId, String)> {
        self.faults.read().clone()
    }

    pub fn clear(&self) {
        self.updates.write().clear();
        self.faults.write().clear();
    }
}

#[async_trait]
impl MatchNotifier for RecordingNotifier {
    async fn notify(&self, updates: Vec<MatchUpdate>) {
        self.updates.write().extend(updates);
    }

    async fn fault(&self, match_id: &MatchId, reason: &str) {
        self.faults
            .write()
            .push((match_id.clone(), reason.to_string()));
    }
}
