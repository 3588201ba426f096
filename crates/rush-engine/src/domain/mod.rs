//! Domain module for the match engine
//!
//! ## Core Modules
//! - aggregate: Match document and lifecycle state machine
//! - ledger: Per-player outcomes and derived scores
//! - match_log: Append-only journal and replay
//! - projection: Per-viewer redaction
//!
//! ## Boards
//! - tiles: Tile alphabet, levels, solution proofs
//! - rotation: Per-match board symmetry
//!
//! ## Results
//! - rating: Rating parameters and the bundled Elo strategy

pub mod aggregate;
pub mod ledger;
pub mod match_log;
pub mod projection;
pub mod rating;
pub mod rotation;
pub mod tiles;

pub use aggregate::{Change, Match, Slot};
pub use ledger::{GameTable, Outcome, ScoreTable};
pub use match_log::{FinishReason, LogEntry, MatchEvent, MatchLog, Replay};
pub use projection::{project, MatchView};
pub use rating::{
    EloRatingUpdater, RatingChange, RatingInput, RatingParams, RatingStatus, RatingUpdate,
};
pub use rotation::{rotate_level, Transform};
pub use tiles::{Direction, Level, LevelData, LevelError, Moves, SolutionProof, Tile};
