//! Error types for the match engine
//!
//! User-facing errors carry enough context for a client to resynchronize
//! by refetching its projected view. `Conflict` is internal: the service
//! retries it and never returns it to a caller.

use shared_types::{LevelId, MatchId, MatchState};
use thiserror::Error;

/// Match engine errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Command is illegal in the match's current state
    #[error("Cannot {command} while match is {state}")]
    InvalidTransition {
        command: &'static str,
        state: MatchState,
    },

    /// Caller is not a player in this match
    #[error("Not a participant of this match")]
    NotParticipant,

    /// Player cap reached
    #[error("Match is full ({max_players} players)")]
    MatchFull { max_players: usize },

    /// Player is already in the match
    #[error("Already joined this match")]
    AlreadyJoined,

    /// Private match and no invite capability
    #[error("This match is private and requires an invite")]
    InviteRequired,

    /// Submitted level is not the player's current slot
    #[error("Out of order: expected {expected:?}, got {submitted:?}")]
    OutOfOrder {
        expected: Option<LevelId>,
        submitted: Option<LevelId>,
    },

    /// Solver rejected the proof
    #[error("Solution for level {level} was not validated")]
    Unvalidated { level: LevelId },

    /// Unknown match
    #[error("Match not found: {match_id}")]
    NotFound { match_id: MatchId },

    /// Match is active but the countdown has not elapsed
    #[error("Match starts in {starts_in_ms}ms")]
    NotStarted { starts_in_ms: u64 },

    /// Chat message refused
    #[error("Message rejected: {reason}")]
    MessageRejected { reason: String },

    /// Optimistic write lost a race (retried internally)
    #[error("Concurrent modification of match {match_id}")]
    Conflict { match_id: MatchId },

    /// Optimistic retries exhausted
    #[error("Match {match_id} is too contended, gave up after {attempts} attempts")]
    ContentionExhausted { match_id: MatchId, attempts: u32 },

    /// Match repository failure
    #[error("Storage error: {reason}")]
    Storage { reason: String },

    /// Level store failure
    #[error("Level store error: {reason}")]
    LevelStore { reason: String },

    /// Rating store or updater failure
    #[error("Rating store error: {reason}")]
    RatingStore { reason: String },
}

impl EngineError {
    /// Whether the error describes a caller mistake (as opposed to an
    /// infrastructure failure).
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Self::InvalidTransition { .. }
                | Self::NotParticipant
                | Self::MatchFull { .. }
                | Self::AlreadyJoined
                | Self::InviteRequired
                | Self::OutOfOrder { .. }
                | Self::Unvalidated { .. }
                | Self::NotFound { .. }
                | Self::NotStarted { .. }
                | Self::MessageRejected { .. }
        )
    }

    /// Short label for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidTransition { .. } => "invalid_transition",
            Self::NotParticipant => "not_participant",
            Self::MatchFull { .. } => "match_full",
            Self::AlreadyJoined => "already_joined",
            Self::InviteRequired => "invite_required",
            Self::OutOfOrder { .. } => "out_of_order",
            Self::Unvalidated { .. } => "unvalidated",
            Self::NotFound { .. } => "not_found",
            Self::NotStarted { .. } => "not_started",
            Self::MessageRejected { .. } => "message_rejected",
            Self::Conflict { .. } => "conflict",
            Self::ContentionExhausted { .. } => "contention_exhausted",
            Self::Storage { .. } => "storage",
            Self::LevelStore { .. } => "level_store",
            Self::RatingStore { .. } => "rating_store",
        }
    }
}

/// Result type for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
