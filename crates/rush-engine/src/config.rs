//! Engine configuration

use shared_types::MatchType;

/// Per-format rules.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MatchRules {
    pub min_players: usize,
    pub max_players: usize,
    /// Levels drawn at start
    pub level_count: usize,
    /// Race length once the countdown ends
    pub duration_ms: u64,
}

impl MatchRules {
    const fn new(level_count: usize, duration_ms: u64) -> Self {
        Self {
            min_players: 2,
            max_players: 4,
            level_count,
            duration_ms,
        }
    }
}

/// Match engine configuration
#[derive(Clone, Debug)]
pub struct EngineConfig {
    pub bullet: MatchRules,
    pub blitz: MatchRules,
    pub rapid: MatchRules,
    pub classical: MatchRules,
    /// Delay between quorum and the first playable moment
    pub start_countdown_ms: u64,
    /// OPEN matches older than this are abandoned
    pub open_timeout_ms: u64,
    /// Optimistic write attempts per command
    pub max_conflict_retries: u32,
    /// Pending rating settlements older than this are re-driven by the sweeper
    pub rating_claim_timeout_ms: u64,
    /// Maximum chat message length (characters)
    pub max_message_len: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            bullet: MatchRules::new(3, 3 * 60_000),
            blitz: MatchRules::new(5, 5 * 60_000),
            rapid: MatchRules::new(8, 10 * 60_000),
            classical: MatchRules::new(12, 30 * 60_000),
            start_countdown_ms: 10_000,
            open_timeout_ms: 15 * 60_000,
            max_conflict_retries: 8,
            rating_claim_timeout_ms: 30_000,
            max_message_len: 300,
        }
    }
}

impl EngineConfig {
    pub fn rules(&self, match_type: MatchType) -> MatchRules {
        match match_type {
            MatchType::Bullet => self.bullet,
            MatchType::Blitz => self.blitz,
            MatchType::Rapid => self.rapid,
            MatchType::Classical => self.classical,
        }
    }

    pub fn rules_mut(&mut self, match_type: MatchType) -> &mut MatchRules {
        match match_type {
            MatchType::Bullet => &mut self.bullet,
            MatchType::Blitz => &mut self.blitz,
            MatchType::Rapid => &mut self.rapid,
            MatchType::Classical => &mut self.classical,
        }
    }
}
