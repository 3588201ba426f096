//! # Match Events
//!
//! Defines all event types that flow through the shared bus.

use serde::{Deserialize, Serialize};
use shared_types::{MatchId, PlayerId};

/// Who a projected payload was computed for.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recipient {
    /// A participant; the payload is that player's projection.
    Player(PlayerId),
    /// Anyone who is not a participant.
    Spectator,
}

/// What happened to the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UpdateKind {
    Created,
    Joined,
    Left,
    Ready,
    Unready,
    Started,
    LevelComplete,
    Skipped,
    Finished,
    Message,
    RatingsSettled,
}

/// Per-recipient match update, ready to hand to a transport.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchUpdate {
    pub match_id: MatchId,
    pub kind: UpdateKind,
    pub recipient: Recipient,
    /// Projection of the match computed for `recipient`.
    pub view: serde_json::Value,
}

/// All events that can be published to the event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RushEvent {
    /// A match changed; one event is published per recipient.
    MatchUpdated(MatchUpdate),

    /// A background task failed on a match and gave up.
    EngineFault {
        /// Affected match.
        match_id: MatchId,
        /// Failure description.
        reason: String,
    },
}

impl RushEvent {
    /// Get the topic for this event (for filtering).
    #[must_use]
    pub fn topic(&self) -> EventTopic {
        match self {
            Self::MatchUpdated(update) => match update.kind {
                UpdateKind::Created
                | UpdateKind::Joined
                | UpdateKind::Left
                | UpdateKind::Ready
                | UpdateKind::Unready => EventTopic::Lobby,
                UpdateKind::Started
                | UpdateKind::LevelComplete
                | UpdateKind::Skipped
                | UpdateKind::Message => EventTopic::Race,
                UpdateKind::Finished | UpdateKind::RatingsSettled => EventTopic::Results,
            },
            Self::EngineFault { .. } => EventTopic::DeadLetterQueue,
        }
    }

    /// Match this event concerns.
    #[must_use]
    pub fn match_id(&self) -> &MatchId {
        match self {
            Self::MatchUpdated(update) => &update.match_id,
            Self::EngineFault { match_id, .. } => match_id,
        }
    }

    /// Recipient of the payload, if the event carries one.
    #[must_use]
    pub fn recipient(&self) -> Option<&Recipient> {
        match self {
            Self::MatchUpdated(update) => Some(&update.recipient),
            Self::EngineFault { .. } => None,
        }
    }
}

/// Event topics for subscription filtering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventTopic {
    /// Pre-start membership and readiness changes.
    Lobby,
    /// In-race progress.
    Race,
    /// Finish and rating settlement.
    Results,
    /// Background failures.
    DeadLetterQueue,
    /// All events (no filtering).
    All,
}

/// Filter for subscribing to specific events.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    /// Topics to include. Empty means all topics.
    pub topics: Vec<EventTopic>,
    /// Matches to include. Empty means all matches.
    pub match_ids: Vec<MatchId>,
    /// Only payloads addressed to this recipient. `None` means any.
    pub recipient: Option<Recipient>,
}

impl EventFilter {
    /// Create a filter that accepts all events.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// Create a filter for specific topics.
    #[must_use]
    pub fn topics(topics: Vec<EventTopic>) -> Self {
        Self {
            topics,
            ..Self::default()
        }
    }

    /// Create a filter for one viewer of one match.
    #[must_use]
    pub fn for_viewer(match_id: MatchId, recipient: Recipient) -> Self {
        Self {
            topics: Vec::new(),
            match_ids: vec![match_id],
            recipient: Some(recipient),
        }
    }

    /// Check if an event matches this filter.
    #[must_use]
    pub fn matches(&self, event: &RushEvent) -> bool {
        let topic_match = self.topics.is_empty()
            || self.topics.contains(&EventTopic::All)
            || self.topics.contains(&event.topic());

        let match_match = self.match_ids.is_empty() || self.match_ids.contains(event.match_id());

        // Events without a recipient (faults) are never addressed to a viewer.
        let recipient_match = match &self.recipient {
            None => true,
            Some(wanted) => event.recipient() == Some(wanted),
        };

        topic_match && match_match && recipient_match
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update(kind: UpdateKind, recipient: Recipient) -> RushEvent {
        RushEvent::MatchUpdated(MatchUpdate {
            match_id: MatchId::from("m1"),
            kind,
            recipient,
            view: serde_json::Value::Null,
        })
    }

    #[test]
    fn test_event_topic_mapping() {
        let event = update(UpdateKind::LevelComplete, Recipient::Spectator);
        assert_eq!(event.topic(), EventTopic::Race);

        let event = update(UpdateKind::Joined, Recipient::Spectator);
        assert_eq!(event.topic(), EventTopic::Lobby);

        let fault = RushEvent::EngineFault {
            match_id: MatchId::from("m1"),
            reason: "boom".into(),
        };
        assert_eq!(fault.topic(), EventTopic::DeadLetterQueue);
    }

    #[test]
    fn test_filter_all() {
        let filter = EventFilter::all();
        assert!(filter.matches(&update(UpdateKind::Started, Recipient::Spectator)));
    }

    #[test]
    fn test_filter_by_topic() {
        let filter = EventFilter::topics(vec![EventTopic::Results]);
        assert!(filter.matches(&update(UpdateKind::Finished, Recipient::Spectator)));
        assert!(!filter.matches(&update(UpdateKind::Skipped, Recipient::Spectator)));
    }

    #[test]
    fn test_filter_by_viewer() {
        let alice = Recipient::Player(PlayerId::from("alice"));
        let bob = Recipient::Player(PlayerId::from("bob"));
        let filter = EventFilter::for_viewer(MatchId::from("m1"), alice.clone());

        assert!(filter.matches(&update(UpdateKind::Started, alice)));
        assert!(!filter.matches(&update(UpdateKind::Started, bob)));
        assert!(!filter.matches(&update(UpdateKind::Started, Recipient::Spectator)));

        let other_match = EventFilter::for_viewer(MatchId::from("m2"), Recipient::Spectator);
        assert!(!other_match.matches(&update(UpdateKind::Started, Recipient::Spectator)));
    }
}
