//! Append-only match journal.
//!
//! `state`, `players` and the game table are maintained incrementally on the
//! aggregate; [`MatchLog::replay`] rebuilds them from the journal alone so
//! the two can be checked against each other.

use serde::{Deserialize, Serialize};
use shared_types::{LevelId, MatchState, PlayerId, Timestamp};

use super::ledger::{GameTable, Outcome};
use super::rating::RatingChange;

/// Why a match reached FINISHED.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FinishReason {
    /// Every ledger is full
    Completed,
    /// Race duration elapsed
    Deadline,
    /// Quorum never reached before the open timeout
    Abandoned,
    /// Last player left the lobby
    Cancelled,
}

impl FinishReason {
    /// Whether the match finished without ever racing.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, FinishReason::Abandoned | FinishReason::Cancelled)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            FinishReason::Completed => "completed",
            FinishReason::Deadline => "deadline",
            FinishReason::Abandoned => "abandoned",
            FinishReason::Cancelled => "cancelled",
        }
    }
}

/// Typed journal event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchEvent {
    Created {
        by: PlayerId,
    },
    Joined {
        player: PlayerId,
    },
    Left {
        player: PlayerId,
    },
    Ready {
        player: PlayerId,
    },
    Unready {
        player: PlayerId,
    },
    MatchStarted {
        levels: Vec<LevelId>,
        start_time: Timestamp,
    },
    LevelComplete {
        player: PlayerId,
        level: LevelId,
        slot: usize,
    },
    Skipped {
        player: PlayerId,
        slot: usize,
    },
    MatchFinished {
        winners: Vec<PlayerId>,
        reason: FinishReason,
    },
    GameRecap {
        changes: Vec<RatingChange>,
    },
    FromUser {
        player: PlayerId,
        message: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub event: MatchEvent,
}

/// Result of replaying a journal.
#[derive(Clone, Debug, PartialEq)]
pub struct Replay {
    pub state: MatchState,
    pub players: Vec<PlayerId>,
    pub game_table: GameTable,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchLog(Vec<LogEntry>);

impl MatchLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, timestamp: Timestamp, event: MatchEvent) {
        self.0.push(LogEntry { timestamp, event });
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Count entries matching a predicate.
    pub fn count(&self, predicate: impl Fn(&MatchEvent) -> bool) -> usize {
        self.0.iter().filter(|e| predicate(&e.event)).count()
    }

    /// Rebuild lifecycle state, membership and ledgers from the journal.
    pub fn replay(&self) -> Replay {
        let mut state = MatchState::Open;
        let mut players: Vec<PlayerId> = Vec::new();
        let mut game_table = GameTable::new();

        for entry in &self.0 {
            match &entry.event {
                MatchEvent::Created { by } => players = vec![by.clone()],
                MatchEvent::Joined { player } => players.push(player.clone()),
                MatchEvent::Left { player } => players.retain(|p| p != player),
                MatchEvent::MatchStarted { .. } => {
                    state = MatchState::Active;
                    game_table = GameTable::for_players(&players);
                }
                MatchEvent::LevelComplete { player, level, .. } => {
                    game_table.append(player, Outcome::Completed(level.clone()))
                }
                MatchEvent::Skipped { player, .. } => game_table.append(player, Outcome::Skipped),
                MatchEvent::MatchFinished { .. } => state = MatchState::Finished,
                MatchEvent::Ready { .. }
                | MatchEvent::Unready { .. }
                | MatchEvent::GameRecap { .. }
                | MatchEvent::FromUser { .. } => {}
            }
        }

        Replay {
            state,
            players,
            game_table,
        }
    }
}
