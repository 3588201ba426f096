//! # Viewer Subscriptions
//!
//! A `Subscription` is one transport connection's view of the bus: it only
//! yields events its `EventFilter` accepts, so a connection registered for
//! one player never receives another player's projection.

use crate::events::{EventFilter, RushEvent};
use tokio::sync::broadcast;
use tracing::warn;

/// Receiving end of the bus for one viewer (or for a log drain).
pub struct Subscription {
    receiver: broadcast::Receiver<RushEvent>,
    filter: EventFilter,
    /// Events overwritten before this subscriber read them.
    lagged: u64,
}

impl Subscription {
    pub(crate) fn new(receiver: broadcast::Receiver<RushEvent>, filter: EventFilter) -> Self {
        Self {
            receiver,
            filter,
            lagged: 0,
        }
    }

    /// Next event accepted by the filter, or `None` once the bus is gone.
    ///
    /// A slow subscriber skips what it missed rather than failing; the next
    /// projection it receives supersedes the lost ones.
    pub async fn recv(&mut self) -> Option<RushEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if self.filter.matches(&event) => return Some(event),
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    self.lagged += missed;
                    warn!(
                        missed,
                        recipient = ?self.filter.recipient,
                        "Subscriber lagged, skipping to latest updates"
                    );
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Total events this subscriber lost to lag.
    #[must_use]
    pub fn lagged(&self) -> u64 {
        self.lagged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventTopic, MatchUpdate, Recipient, UpdateKind};
    use crate::publisher::{EventPublisher, InMemoryEventBus};
    use shared_types::{MatchId, PlayerId};
    use std::time::Duration;
    use tokio::time::timeout;

    fn update(kind: UpdateKind, recipient: Recipient) -> RushEvent {
        RushEvent::MatchUpdated(MatchUpdate {
            match_id: MatchId::from("m1"),
            kind,
            recipient,
            view: serde_json::Value::Null,
        })
    }

    #[tokio::test]
    async fn test_subscription_recv() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());

        bus.publish(update(UpdateKind::Joined, Recipient::Spectator)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");

        assert_eq!(received.topic(), EventTopic::Lobby);
    }

    #[tokio::test]
    async fn test_subscription_only_sees_own_projection() {
        let bus = InMemoryEventBus::new();
        let alice = Recipient::Player(PlayerId::from("alice"));
        let bob = Recipient::Player(PlayerId::from("bob"));

        let mut sub = bus.subscribe_viewer(MatchId::from("m1"), bob.clone());

        bus.publish(update(UpdateKind::LevelComplete, alice)).await;
        bus.publish(update(UpdateKind::LevelComplete, bob.clone())).await;
        bus.publish(update(UpdateKind::LevelComplete, Recipient::Spectator)).await;

        let received = timeout(Duration::from_millis(100), sub.recv())
            .await
            .expect("timeout")
            .expect("event");
        assert_eq!(received.recipient(), Some(&bob));

        // alice's and the spectator copy never arrive
        assert!(timeout(Duration::from_millis(50), sub.recv()).await.is_err());
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_ahead() {
        let bus = InMemoryEventBus::with_capacity(2);
        let mut sub = bus.subscribe(EventFilter::all());

        for kind in [
            UpdateKind::Joined,
            UpdateKind::Ready,
            UpdateKind::Started,
            UpdateKind::Skipped,
        ] {
            bus.publish(update(kind, Recipient::Spectator)).await;
        }

        let received = sub.recv().await.expect("event");
        assert_eq!(received.topic(), EventTopic::Race);
        assert_eq!(sub.lagged(), 2);
    }

    #[tokio::test]
    async fn test_closed_bus_ends_subscription() {
        let bus = InMemoryEventBus::new();
        let mut sub = bus.subscribe(EventFilter::all());
        drop(bus);

        assert!(sub.recv().await.is_none());
    }
}
