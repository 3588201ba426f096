//! Per-viewer redacted views of a match.
//!
//! | Viewer | OPEN | ACTIVE | FINISHED |
//! |--------|------|--------|----------|
//! | Spectator | metadata | metadata | everything |
//! | Participant | metadata + ready set | own current level (rotated) + scores | everything |
//!
//! A participant never learns which level an opponent is on, only their
//! score, and never sees a level before reaching it.

use serde::{Deserialize, Serialize};
use shared_types::{LevelId, MatchId, MatchState, MatchType, PlayerId, Timestamp};

use super::aggregate::Match;
use super::ledger::{GameTable, ScoreTable};
use super::match_log::{FinishReason, LogEntry};
use super::rating::RatingStatus;
use super::rotation::rotate_level;
use super::tiles::Level;

/// Redacted projection of a match for one viewer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MatchView {
    pub match_id: MatchId,
    pub match_type: MatchType,
    pub state: MatchState,
    pub private: bool,
    pub rated: bool,
    pub created_by: PlayerId,
    pub created_at: Timestamp,
    pub players: Vec<PlayerId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marked_ready: Option<Vec<PlayerId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_start_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_until_end_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub levels: Option<Vec<LevelId>>,
    /// Rotated board of the viewer's current level
    #[serde(skip_serializing_if = "Option::is_none")]
    pub board: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scores: Option<ScoreTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub game_table: Option<GameTable>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_log: Option<Vec<LogEntry>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub winners: Option<Vec<PlayerId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<FinishReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating_status: Option<RatingStatus>,
}

/// Project `m` for `viewer` (`None` is an anonymous spectator).
///
/// `current_board` is the canonical level at the viewer's current slot; it
/// is rotated here and dropped if it is not that level.
pub fn project(
    m: &Match,
    viewer: Option<&PlayerId>,
    now: Timestamp,
    current_board: Option<&Level>,
) -> MatchView {
    let mut view = metadata(m, now);
    let participant = viewer.filter(|v| m.is_participant(v));

    match (m.state(), participant) {
        (MatchState::Finished, _) => {
            view.levels = Some(m.levels().to_vec());
            view.scores = Some(m.score_table());
            view.game_table = Some(m.game_table().clone());
            view.match_log = Some(m.match_log().entries().to_vec());
            view.winners = Some(m.winners().to_vec());
            view.finish_reason = m.finish_reason();
            view.rating_status = Some(m.rating_status());
        }
        (MatchState::Open, Some(_)) => {
            view.marked_ready = Some(m.marked_ready().to_vec());
        }
        (MatchState::Active, Some(player)) => {
            view.scores = Some(m.score_table());
            let started = m.start_time().is_some_and(|start| now >= start);
            let current = m.current_level(player).filter(|_| started);

            view.levels = Some(current.cloned().into_iter().collect());
            view.board = current.and_then(|id| {
                current_board
                    .filter(|board| board.id() == id)
                    .map(|board| rotate_level(board, m.match_id()))
            });
        }
        (_, None) => {}
    }

    view
}

fn metadata(m: &Match, now: Timestamp) -> MatchView {
    let time_until_start_ms = m
        .start_time()
        .filter(|start| *start > now)
        .map(|start| start - now);
    let time_until_end_ms = m
        .deadline()
        .filter(|deadline| m.state() == MatchState::Active && *deadline > now)
        .map(|deadline| deadline - now);

    MatchView {
        match_id: m.match_id().clone(),
        match_type: m.match_type(),
        state: m.state(),
        private: m.is_private(),
        rated: m.is_rated(),
        created_by: m.created_by().clone(),
        created_at: m.created_at(),
        players: m.players().to_vec(),
        marked_ready: None,
        start_time: m.start_time(),
        end_time: m.end_time(),
        time_until_start_ms,
        time_until_end_ms,
        levels: None,
        board: None,
        scores: None,
        game_table: None,
        match_log: None,
        winners: None,
        finish_reason: None,
        rating_status: None,
    }
}
