//! Driving Ports (API - Inbound)

use crate::domain::{MatchView, SolutionProof};
use crate::error::EngineResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared_types::{LevelId, MatchId, MatchType, PlayerId};
use std::collections::BTreeMap;

/// Parameters of a new match.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateMatch {
    pub match_type: MatchType,
    pub private: bool,
    pub rated: bool,
}

impl CreateMatch {
    pub fn rated(match_type: MatchType) -> Self {
        Self {
            match_type,
            private: false,
            rated: true,
        }
    }
}

/// Outcome of one sweeper pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// OPEN matches past the open timeout
    pub abandoned: usize,
    /// ACTIVE matches past their deadline
    pub finished: usize,
    /// Stale rating settlements driven to completion
    pub ratings_settled: usize,
    /// Matches the pass failed on
    pub failures: usize,
}

/// Win/loss/draw tally.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
}

/// A player's results per match type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player: PlayerId,
    pub by_type: BTreeMap<MatchType, Tally>,
}

impl PlayerRecord {
    /// Record with no settled matches.
    pub fn empty(player: PlayerId) -> Self {
        Self {
            player,
            by_type: BTreeMap::new(),
        }
    }

    /// Tally for one match type; zero when the player never finished one.
    pub fn tally(&self, match_type: MatchType) -> Tally {
        self.by_type.get(&match_type).copied().unwrap_or_default()
    }
}

/// Primary match engine API
///
/// Every command is applied by an optimistic read-modify-write of the match
/// document and answers with the caller's projection of the result.
/// Commands that find their effect already applied succeed without
/// broadcasting.
#[async_trait]
pub trait RushEngineApi: Send + Sync {
    /// Create an OPEN match with `creator` as its first player.
    async fn create_match(&self, creator: &PlayerId, request: CreateMatch)
        -> EngineResult<MatchView>;

    async fn join(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView>;

    /// Leave an OPEN match. The last player out cancels it.
    async fn leave(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView>;

    /// Signal readiness; the signal completing the quorum starts the match.
    async fn mark_ready(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView>;

    async fn unmark_ready(&self, match_id: &MatchId, player: &PlayerId)
        -> EngineResult<MatchView>;

    /// Record a solve of the player's current level.
    ///
    /// `proof` is played on the board as displayed to the player.
    async fn submit_level_complete(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        level: &LevelId,
        proof: &SolutionProof,
    ) -> EngineResult<MatchView>;

    /// Forfeit the current level. `level` makes redelivery harmless.
    async fn skip(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        level: Option<&LevelId>,
    ) -> EngineResult<MatchView>;

    /// Append a chat entry to the match log.
    async fn post_message(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        message: &str,
    ) -> EngineResult<MatchView>;

    /// Finish the match if it is due. Returns whether this call finished it.
    async fn check_completion(&self, match_id: &MatchId) -> EngineResult<bool>;

    /// Abandon, finish and settle everything that is overdue.
    async fn sweep(&self) -> EngineResult<SweepReport>;

    /// Projection of a match for `viewer` (`None` for anonymous).
    async fn view(&self, match_id: &MatchId, viewer: Option<&PlayerId>)
        -> EngineResult<MatchView>;

    /// Wins, losses and draws over the player's finished matches.
    async fn player_record(&self, player: &PlayerId) -> EngineResult<PlayerRecord>;
}
