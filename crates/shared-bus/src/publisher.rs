//! # Event Publisher
//!
//! Publishing side of the bus and the in-process broadcast implementation.

use crate::events::{EventFilter, Recipient, RushEvent};
use crate::subscriber::Subscription;
use crate::DEFAULT_CHANNEL_CAPACITY;
use async_trait::async_trait;
use shared_types::MatchId;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast;
use tracing::debug;

/// Sink for engine events.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event; returns how many subscribers it reached.
    async fn publish(&self, event: RushEvent) -> usize;

    /// Total events handed to the bus.
    fn events_published(&self) -> u64;
}

/// Single-process bus on `tokio::sync::broadcast`.
///
/// Every subscriber sees every event and filters on receive; a
/// horizontally scaled deployment would put a broker behind
/// [`EventPublisher`] instead.
pub struct InMemoryEventBus {
    sender: broadcast::Sender<RushEvent>,
    published: AtomicU64,
    /// Events published while nobody was subscribed.
    undelivered: AtomicU64,
    capacity: usize,
}

impl InMemoryEventBus {
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: AtomicU64::new(0),
            undelivered: AtomicU64::new(0),
            capacity: capacity.max(1),
        }
    }

    #[must_use]
    pub fn subscribe(&self, filter: EventFilter) -> Subscription {
        debug!(
            topics = ?filter.topics,
            matches = filter.match_ids.len(),
            recipient = ?filter.recipient,
            "Subscription opened"
        );
        Subscription::new(self.sender.subscribe(), filter)
    }

    /// Subscription for one viewer's connection to one match.
    #[must_use]
    pub fn subscribe_viewer(&self, match_id: MatchId, recipient: Recipient) -> Subscription {
        self.subscribe(EventFilter::for_viewer(match_id, recipient))
    }

    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[must_use]
    pub fn undelivered(&self) -> u64 {
        self.undelivered.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryEventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventBus {
    async fn publish(&self, event: RushEvent) -> usize {
        self.published.fetch_add(1, Ordering::Relaxed);
        let topic = event.topic();
        let match_id = event.match_id().clone();

        match self.sender.send(event) {
            Ok(receivers) => {
                debug!(topic = ?topic, match_id = %match_id, receivers, "Event published");
                receivers
            }
            Err(_) => {
                // Nobody watching this match right now
                self.undelivered.fetch_add(1, Ordering::Relaxed);
                debug!(topic = ?topic, match_id = %match_id, "Event had no subscribers");
                0
            }
        }
    }

    fn events_published(&self) -> u64 {
        self.published.load(Ordering::Relaxed)
    }
}
