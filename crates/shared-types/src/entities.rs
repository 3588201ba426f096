//! # Core Domain Entities
//!
//! Identifiers and lifecycle enums for puzzle-race matches.
//!
//! ## Clusters
//!
//! - **Identity**: `PlayerId`, `MatchId`, `LevelId`
//! - **Time**: `Timestamp`
//! - **Match Format**: `MatchType`, `MatchState`

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// CLUSTER A: IDENTITY
// =============================================================================

/// Milliseconds since the UNIX epoch.
pub type Timestamp = u64;

/// Authenticated identity of a player.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub String);

impl PlayerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PlayerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Public match identifier.
///
/// Opaque and immutable, handed out to clients. Distinct from the storage
/// record id so that URLs never leak storage keys.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MatchId(pub String);

impl MatchId {
    /// Length of generated identifiers (hex characters).
    pub const GENERATED_LEN: usize = 12;

    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random identifier.
    #[must_use]
    pub fn generate() -> Self {
        let mut simple = Uuid::new_v4().simple().to_string();
        simple.truncate(Self::GENERATED_LEN);
        Self(simple)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for MatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MatchId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Reference to a puzzle level owned by the level store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LevelId(pub String);

impl LevelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LevelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LevelId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

// =============================================================================
// CLUSTER B: MATCH FORMAT
// =============================================================================

/// Race format. Fixed at creation; selects the rules and the rating bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchType {
    Bullet,
    Blitz,
    Rapid,
    Classical,
}

impl MatchType {
    /// All formats, shortest first.
    pub const ALL: [MatchType; 4] = [
        MatchType::Bullet,
        MatchType::Blitz,
        MatchType::Rapid,
        MatchType::Classical,
    ];

    /// Name of the rating bucket for this format.
    pub fn rating_bucket(&self) -> &'static str {
        match self {
            MatchType::Bullet => "RushBullet",
            MatchType::Blitz => "RushBlitz",
            MatchType::Rapid => "RushRapid",
            MatchType::Classical => "RushClassical",
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchType::Bullet => "Bullet",
            MatchType::Blitz => "Blitz",
            MatchType::Rapid => "Rapid",
            MatchType::Classical => "Classical",
        };
        f.write_str(label)
    }
}

/// Match lifecycle state.
///
/// ```text
/// [OPEN] ──quorum ready──→ [ACTIVE] ──all ledgers full / deadline──→ [FINISHED]
///    │                                                                   ↑
///    └──────────────── abandoned / cancelled ────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchState {
    Open,
    Active,
    Finished,
}

impl MatchState {
    /// Whether `self → next` is a legal lifecycle step.
    pub fn can_transition_to(&self, next: MatchState) -> bool {
        matches!(
            (self, next),
            (MatchState::Open, MatchState::Active)
                | (MatchState::Open, MatchState::Finished)
                | (MatchState::Active, MatchState::Finished)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, MatchState::Finished)
    }
}

impl fmt::Display for MatchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchState::Open => "OPEN",
            MatchState::Active => "ACTIVE",
            MatchState::Finished => "FINISHED",
        };
        f.write_str(label)
    }
}
