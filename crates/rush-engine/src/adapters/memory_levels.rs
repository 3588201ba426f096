//! In-memory level store
//!
//! Draws are deterministic: the pool is ordered by level id and each draw
//! takes the next `count` levels, wrapping around.

use crate::domain::{Level, LevelError};
use crate::error::{EngineError, EngineResult};
use crate::ports::outbound::LevelStore;
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{LevelId, MatchType};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

#[derive(Default)]
pub struct InMemoryLevelStore {
    levels: RwLock<BTreeMap<LevelId, Level>>,
    cursor: AtomicUsize,
}

impl InMemoryLevelStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, level: Level) {
        self.levels.write().insert(level.id().clone(), level);
    }

    /// Parse and insert a level from its `\n`-joined rows.
    pub fn insert_data(&self, id: impl Into<String>, data: &str) -> Result<(), LevelError> {
        let level = Level::parse(LevelId::new(id), data)?;
        self.insert(level);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.levels.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.read().is_empty()
    }
}

#[async_trait]
impl LevelStore for InMemoryLevelStore {
    async fn levels_for(&self, match_type: MatchType, count: usize) -> EngineResult<Vec<LevelId>> {
        let levels = self.levels.read();
        if levels.len() < count {
            return Err(EngineError::LevelStore {
                reason: format!(
                    "{} levels requested for {match_type}, pool has {}",
                    count,
                    levels.len()
                ),
            });
        }

        let start = self.cursor.fetch_add(count, Ordering::Relaxed);
        let ids: Vec<LevelId> = levels
            .keys()
            .cycle()
            .skip(start % levels.len().max(1))
            .take(count)
            .cloned()
            .collect();
        debug!(match_type = %match_type, count, "[rush] Levels drawn");
        Ok(ids)
    }

    async fn level(&self, level_id: &LevelId) -> EngineResult<Level> {
        self.levels
            .read()
            .get(level_id)
            .cloned()
            .ok_or_else(|| EngineError::LevelStore {
                reason: format!("unknown level {level_id}"),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_draws_rotate_through_pool() {
        let store = InMemoryLevelStore::new();
        for id in ["c", "a", "b"] {
            store.insert_data(id, "43").unwrap();
        }

        let first = store.levels_for(MatchType::Bullet, 2).await.unwrap();
        assert_eq!(first, vec![LevelId::from("a"), LevelId::from("b")]);
        let second = store.levels_for(MatchType::Bullet, 2).await.unwrap();
        assert_eq!(second, vec![LevelId::from("c"), LevelId::from("a")]);
    }

    #[tokio::test]
    async fn test_pool_too_small() {
        let store = InMemoryLevelStore::new();
        store.insert_data("a", "43").unwrap();
        assert!(matches!(
            store.levels_for(MatchType::Classical, 12).await,
            Err(EngineError::LevelStore { .. })
        ));
        assert!(store.level(&LevelId::from("zz")).await.is_err());
    }
}
