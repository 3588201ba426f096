//! In-memory rating store

use crate::domain::{RatingChange, RatingParams, RatingUpdate};
use crate::error::EngineResult;
use crate::ports::outbound::RatingStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{MatchId, MatchType, PlayerId};
use std::collections::HashMap;
use tracing::info;

#[derive(Default)]
struct Ratings {
    params: HashMap<(PlayerId, MatchType), RatingParams>,
    /// Committed matches and the changes they produced
    committed: HashMap<MatchId, Vec<RatingChange>>,
}

/// Process-local `RatingStore`.
#[derive(Default)]
pub struct InMemoryRatingStore {
    inner: RwLock<Ratings>,
}

impl InMemoryRatingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, player: &PlayerId, match_type: MatchType, params: RatingParams) {
        self.inner
            .write()
            .params
            .insert((player.clone(), match_type), params);
    }

    pub fn get(&self, player: &PlayerId, match_type: MatchType) -> RatingParams {
        self.inner
            .read()
            .params
            .get(&(player.clone(), match_type))
            .copied()
            .unwrap_or_default()
    }

    pub fn committed_matches(&self) -> usize {
        self.inner.read().committed.len()
    }
}

#[async_trait]
impl RatingStore for InMemoryRatingStore {
    async fn params(&self, player: &PlayerId, match_type: MatchType) -> EngineResult<RatingParams> {
        Ok(self.get(player, match_type))
    }

    async fn commit(
        &self,
        match_id: &MatchId,
        match_type: MatchType,
        updates: &[RatingUpdate],
    ) -> EngineResult<Vec<RatingChange>> {
        let mut inner = self.inner.write();
        if let Some(changes) = inner.committed.get(match_id) {
            info!(match_id = %match_id, "[rush] Rating commit already applied");
            return Ok(changes.clone());
        }

        let mut changes = Vec::with_capacity(updates.len());
        for update in updates {
            let key = (update.player.clone(), match_type);
            let before = inner.params.get(&key).copied().unwrap_or_default();
            inner.params.insert(key, update.params);
            changes.push(RatingChange {
                player: update.player.clone(),
                before: before.rating,
                after: update.params.rating,
            });
        }
        inner.committed.insert(match_id.clone(), changes.clone());
        Ok(changes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_commit_is_idempotent_per_match() {
        let store = InMemoryRatingStore::new();
        let a = PlayerId::from("a");
        let update = RatingUpdate {
            player: a.clone(),
            params: RatingParams {
                rating: 1516.0,
                games_played: 1,
                ..RatingParams::default()
            },
        };
        let m1 = MatchId::from("m1");

        let first = store.commit(&m1, MatchType::Blitz, &[update.clone()]).await.unwrap();
        assert_eq!(first[0].before, 1500.0);
        assert_eq!(first[0].after, 1516.0);

        let bumped = RatingUpdate {
            params: RatingParams {
                rating: 1600.0,
                ..update.params
            },
            ..update
        };
        let second = store.commit(&m1, MatchType::Blitz, &[bumped]).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(store.get(&a, MatchType::Blitz).rating, 1516.0);
        assert_eq!(store.get(&a, MatchType::Bullet).rating, 1500.0);
        assert_eq!(store.committed_matches(), 1);
    }
}
