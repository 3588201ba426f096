//! Driven Ports (SPI - Outbound Dependencies)

use crate::domain::{
    Level, Match, RatingChange, RatingInput, RatingParams, RatingUpdate, SolutionProof,
};
use crate::error::EngineResult;
use async_trait::async_trait;
use shared_bus::MatchUpdate;
use shared_types::{LevelId, MatchId, MatchState, MatchType, PlayerId, Timestamp};

/// A match document with its storage version.
#[derive(Clone, Debug)]
pub struct VersionedMatch {
    pub record: Match,
    pub version: u64,
}

/// Match persistence with optimistic concurrency.
///
/// `save` is a conditional write: it succeeds only if the stored version
/// still equals `expected_version`, and fails with `EngineError::Conflict`
/// otherwise.
#[async_trait]
pub trait MatchRepository: Send + Sync {
    /// Store a new match at version 1.
    async fn insert(&self, record: &Match) -> EngineResult<()>;

    /// Load a match. Fails with `NotFound` for unknown ids.
    async fn load(&self, match_id: &MatchId) -> EngineResult<VersionedMatch>;

    /// Conditional write. Returns the new version.
    async fn save(&self, record: &Match, expected_version: u64) -> EngineResult<u64>;

    /// Ids of matches currently in `state`.
    async fn ids_in_state(&self, state: MatchState) -> EngineResult<Vec<MatchId>>;

    /// Finished matches whose rating settlement is still pending.
    async fn ids_pending_rating(&self) -> EngineResult<Vec<MatchId>>;

    /// Every match `player` took part in.
    async fn matches_for_player(&self, player: &PlayerId) -> EngineResult<Vec<Match>>;
}

/// Puzzle validator. Pure and synchronous.
pub trait Solver: Send + Sync {
    /// Whether `proof` solves `level`, both in the canonical frame.
    fn validate(&self, level: &Level, proof: &SolutionProof) -> bool;
}

/// Source of puzzle levels.
#[async_trait]
pub trait LevelStore: Send + Sync {
    /// Draw the level sequence for a starting match.
    async fn levels_for(&self, match_type: MatchType, count: usize) -> EngineResult<Vec<LevelId>>;

    /// Canonical board of a level.
    async fn level(&self, level_id: &LevelId) -> EngineResult<Level>;
}

/// Per-bucket rating persistence.
#[async_trait]
pub trait RatingStore: Send + Sync {
    /// Current parameters, defaults for players without history.
    async fn params(&self, player: &PlayerId, match_type: MatchType) -> EngineResult<RatingParams>;

    /// Apply a match's updates and return the resulting rating changes.
    ///
    /// Idempotent per `match_id`: a repeated commit changes nothing and
    /// returns the changes recorded by the first one.
    async fn commit(
        &self,
        match_id: &MatchId,
        match_type: MatchType,
        updates: &[RatingUpdate],
    ) -> EngineResult<Vec<RatingChange>>;
}

/// Rating strategy.
pub trait RatingUpdater: Send + Sync {
    /// New parameters for every participant. Called once per settlement.
    fn update(&self, match_type: MatchType, inputs: &[RatingInput]) -> Vec<RatingUpdate>;
}

/// Invite capability check for private matches.
#[async_trait]
pub trait InviteVerifier: Send + Sync {
    async fn is_invited(&self, match_id: &MatchId, player: &PlayerId) -> bool;
}

/// Fan-out of per-recipient updates to a transport.
#[async_trait]
pub trait MatchNotifier: Send + Sync {
    async fn notify(&self, updates: Vec<MatchUpdate>);

    /// A background task gave up on a match.
    async fn fault(&self, _match_id: &MatchId, _reason: &str) {}
}

/// Time source (ms since the UNIX epoch).
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}
