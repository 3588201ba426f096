//! # rush-engine
//!
//! Match engine for real-time competitive puzzle races.
//!
//! ## Overview
//!
//! Players gather in a lobby, signal readiness, and race through the same
//! ordered sequence of puzzle levels. This crate provides:
//! - **Lifecycle**: OPEN → ACTIVE → FINISHED state machine with quorum start
//! - **Progress Ledger**: Append-only per-player outcomes, scores derived
//! - **Redaction**: Per-viewer projections that never leak unreached levels
//! - **Ratings**: Exactly-once settlement through a pluggable strategy
//!
//! ## Architecture
//!
//! ```text
//! transport ──command──→ RushEngineService ──load/save(version)──→ MatchRepository
//!                              │
//!                              ├── validate ──→ Solver
//!                              ├── draw ──────→ LevelStore
//!                              ├── settle ────→ RatingUpdater + RatingStore
//!                              │
//!                              └── per-viewer MatchUpdate ──→ MatchNotifier
//!
//! CompletionSweeper ──tick──→ sweep() (deadlines, abandoned lobbies, stale ratings)
//! ```
//!
//! ## Match Lifecycle
//!
//! ```text
//! [OPEN] ──all ready, quorum──→ [ACTIVE] ──ledgers full / deadline──→ [FINISHED]
//!    │                                                                     ↑
//!    └──────────────── last player leaves / open timeout ──────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use rush_engine::{CreateMatch, EngineConfig, RushEngineApi, RushEngineService};
//!
//! let engine = RushEngineService::new(EngineConfig::default(), ports);
//!
//! let lobby = engine.create_match(&alice, CreateMatch::rated(MatchType::Blitz)).await?;
//! engine.join(&lobby.match_id, &bob).await?;
//! engine.mark_ready(&lobby.match_id, &alice).await?;
//! engine.mark_ready(&lobby.match_id, &bob).await?; // starts the match
//!
//! let view = engine.view(&lobby.match_id, Some(&alice)).await?;
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod sweeper;

pub use config::{EngineConfig, MatchRules};
pub use domain::{
    Direction, EloRatingUpdater, FinishReason, GameTable, Level, Match, MatchEvent, MatchView,
    Outcome, RatingChange, RatingParams, RatingStatus, ScoreTable, SolutionProof, Transform,
};
pub use error::{EngineError, EngineResult};
pub use ports::inbound::{CreateMatch, PlayerRecord, RushEngineApi, SweepReport, Tally};
pub use service::{EnginePorts, RushEngineService};
pub use sweeper::CompletionSweeper;
