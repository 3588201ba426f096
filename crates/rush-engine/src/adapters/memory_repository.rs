//! In-memory match repository
//!
//! Documents are kept as serialized JSON with a version counter, so every
//! load hands out an independent copy, the way a real document store would.

use crate::domain::{Match, RatingStatus};
use crate::error::{EngineError, EngineResult};
use crate::ports::outbound::{MatchRepository, VersionedMatch};
use async_trait::async_trait;
use parking_lot::RwLock;
use shared_types::{MatchId, MatchState, PlayerId};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};

struct StoredMatch {
    bytes: Vec<u8>,
    version: u64,
    state: MatchState,
    rating_pending: bool,
    players: Vec<PlayerId>,
}

impl StoredMatch {
    fn encode(record: &Match, version: u64) -> EngineResult<Self> {
        let bytes = serde_json::to_vec(record).map_err(|e| EngineError::Storage {
            reason: format!("encode {}: {e}", record.match_id()),
        })?;
        Ok(Self {
            bytes,
            version,
            state: record.state(),
            rating_pending: matches!(record.rating_status(), RatingStatus::Pending { .. }),
            players: record.players().to_vec(),
        })
    }

    fn decode(&self) -> EngineResult<Match> {
        serde_json::from_slice(&self.bytes).map_err(|e| EngineError::Storage {
            reason: format!("decode: {e}"),
        })
    }
}

/// Process-local `MatchRepository`.
#[derive(Default)]
pub struct InMemoryMatchRepository {
    matches: RwLock<HashMap<MatchId, StoredMatch>>,
    /// Saves to reject with `Conflict` before honouring writes again
    injected_conflicts: AtomicU32,
}

impl InMemoryMatchRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` saves fail as if another writer won the race.
    pub fn inject_conflicts(&self, count: u32) {
        self.injected_conflicts.store(count, Ordering::SeqCst);
    }

    pub fn version(&self, match_id: &MatchId) -> Option<u64> {
        self.matches.read().get(match_id).map(|s| s.version)
    }

    pub fn len(&self) -> usize {
        self.matches.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.read().is_empty()
    }

    fn take_injected_conflict(&self) -> bool {
        self.injected_conflicts
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
    }
}

#[async_trait]
impl MatchRepository for InMemoryMatchRepository {
    async fn insert(&self, record: &Match) -> EngineResult<()> {
        let stored = StoredMatch::encode(record, 1)?;
        let mut matches = self.matches.write();
        if matches.contains_key(record.match_id()) {
            return Err(EngineError::Storage {
                reason: format!("duplicate match id {}", record.match_id()),
            });
        }
        matches.insert(record.match_id().clone(), stored);
        Ok(())
    }

    async fn load(&self, match_id: &MatchId) -> EngineResult<VersionedMatch> {
        let matches = self.matches.read();
        let stored = matches.get(match_id).ok_or_else(|| EngineError::NotFound {
            match_id: match_id.clone(),
        })?;
        Ok(VersionedMatch {
            record: stored.decode()?,
            version: stored.version,
        })
    }

    async fn save(&self, record: &Match, expected_version: u64) -> EngineResult<u64> {
        let conflict = || EngineError::Conflict {
            match_id: record.match_id().clone(),
        };
        if self.take_injected_conflict() {
            return Err(conflict());
        }

        let next = expected_version + 1;
        let stored = StoredMatch::encode(record, next)?;

        let mut matches = self.matches.write();
        let current = matches
            .get_mut(record.match_id())
            .ok_or_else(|| EngineError::NotFound {
                match_id: record.match_id().clone(),
            })?;
        if current.version != expected_version {
            return Err(conflict());
        }
        *current = stored;
        Ok(next)
    }

    async fn ids_in_state(&self, state: MatchState) -> EngineResult<Vec<MatchId>> {
        let mut ids: Vec<MatchId> = self
            .matches
            .read()
            .iter()
            .filter(|(_, stored)| stored.state == state)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn ids_pending_rating(&self) -> EngineResult<Vec<MatchId>> {
        let mut ids: Vec<MatchId> = self
            .matches
            .read()
            .iter()
            .filter(|(_, stored)| stored.rating_pending)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn matches_for_player(&self, player: &PlayerId) -> EngineResult<Vec<Match>> {
        self.matches
            .read()
            .values()
            .filter(|stored| stored.players.contains(player))
            .map(StoredMatch::decode)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_types::MatchType;

    fn sample() -> Match {
        Match::create(
            MatchId::from("m1"),
            MatchType::Rapid,
            PlayerId::from("a"),
            false,
            true,
            0,
        )
    }

    #[tokio::test]
    async fn test_versioned_save() {
        let repo = InMemoryMatchRepository::new();
        let record = sample();
        repo.insert(&record).await.unwrap();

        let loaded = repo.load(record.match_id()).await.unwrap();
        assert_eq!(loaded.version, 1);
        assert_eq!(loaded.record, record);

        assert_eq!(repo.save(&loaded.record, 1).await, Ok(2));
        assert_eq!(
            repo.save(&loaded.record, 1).await,
            Err(EngineError::Conflict {
                match_id: MatchId::from("m1")
            })
        );
    }

    #[tokio::test]
    async fn test_unknown_match() {
        let repo = InMemoryMatchRepository::new();
        assert!(matches!(
            repo.load(&MatchId::from("nope")).await,
            Err(EngineError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn test_injected_conflicts() {
        let repo = InMemoryMatchRepository::new();
        let record = sample();
        repo.insert(&record).await.unwrap();
        repo.inject_conflicts(1);

        assert!(repo.save(&record, 1).await.is_err());
        assert_eq!(repo.save(&record, 1).await, Ok(2));
    }

    #[tokio::test]
    async fn test_indexes() {
        let repo = InMemoryMatchRepository::new();
        repo.insert(&sample()).await.unwrap();

        assert_eq!(
            repo.ids_in_state(MatchState::Open).await.unwrap(),
            vec![MatchId::from("m1")]
        );
        assert!(repo.ids_pending_rating().await.unwrap().is_empty());
        assert_eq!(
            repo.matches_for_player(&PlayerId::from("a")).await.unwrap().len(),
            1
        );
    }
}
