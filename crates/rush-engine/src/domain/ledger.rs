//! Progress ledger (game table) and the score table derived from it.

use serde::{Deserialize, Serialize};
use shared_types::{LevelId, PlayerId};
use std::collections::BTreeMap;

/// Outcome of one slot of a player's race.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outcome {
    Completed(LevelId),
    Skipped,
}

impl Outcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Outcome::Completed(_))
    }
}

/// Per-player ordered outcomes. Entries are only ever appended.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameTable(BTreeMap<PlayerId, Vec<Outcome>>);

impl GameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty ledgers for every racer.
    pub fn for_players<'a>(players: impl IntoIterator<Item = &'a PlayerId>) -> Self {
        Self(players.into_iter().map(|p| (p.clone(), Vec::new())).collect())
    }

    pub fn entries(&self, player: &PlayerId) -> &[Outcome] {
        self.0.get(player).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Index of the player's next slot.
    pub fn next_slot(&self, player: &PlayerId) -> usize {
        self.entries(player).len()
    }

    pub(crate) fn append(&mut self, player: &PlayerId, outcome: Outcome) {
        self.0.entry(player.clone()).or_default().push(outcome);
    }

    /// Level the player should be solving, if any remain.
    pub fn current_level<'a>(&self, levels: &'a [LevelId], player: &PlayerId) -> Option<&'a LevelId> {
        levels.get(self.next_slot(player))
    }

    /// Whether every ledger has one entry per level.
    pub fn is_complete(&self, level_count: usize) -> bool {
        !self.0.is_empty() && self.0.values().all(|entries| entries.len() == level_count)
    }

    pub fn players(&self) -> impl Iterator<Item = &PlayerId> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, &[Outcome])> {
        self.0.iter().map(|(p, e)| (p, e.as_slice()))
    }

    /// Recompute scores from the ledgers.
    pub fn score_table(&self) -> ScoreTable {
        ScoreTable(
            self.0
                .iter()
                .map(|(player, entries)| {
                    let score = entries.iter().filter(|e| e.is_completed()).count() as u32;
                    (player.clone(), score)
                })
                .collect(),
        )
    }
}

/// Player → number of completed levels.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScoreTable(BTreeMap<PlayerId, u32>);

impl ScoreTable {
    pub fn score(&self, player: &PlayerId) -> u32 {
        self.0.get(player).copied().unwrap_or(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&PlayerId, u32)> {
        self.0.iter().map(|(p, s)| (p, *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every player holding the top score. Ties are draws.
    pub fn winners(&self) -> Vec<PlayerId> {
        let Some(best) = self.0.values().max().copied() else {
            return Vec::new();
        };
        self.0
            .iter()
            .filter(|(_, score)| **score == best)
            .map(|(player, _)| player.clone())
            .collect()
    }

    /// Standard competition ranking ("1224"), best first.
    pub fn placements(&self) -> Vec<(PlayerId, u32)> {
        let mut ordered: Vec<(&PlayerId, u32)> = self.iter().collect();
        ordered.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        let mut placements = Vec::with_capacity(ordered.len());
        let mut rank = 0u32;
        let mut previous = None;
        for (position, (player, score)) in ordered.into_iter().enumerate() {
            if previous != Some(score) {
                rank = position as u32 + 1;
                previous = Some(score);
            }
            placements.push((player.clone(), rank));
        }
        placements
    }
}
