//! Shared harness for the engine integration tests.

#![allow(dead_code)]

use rush_engine::adapters::{
    AllowListInvites, InMemoryLevelStore, InMemoryMatchRepository, InMemoryRatingStore,
    ManualClock, RecordingNotifier, SokobanSolver,
};
use rush_engine::domain::{
    Direction, EloRatingUpdater, Level, RatingInput, RatingUpdate, SolutionProof,
};
use rush_engine::ports::inbound::{CreateMatch, RushEngineApi};
use rush_engine::domain::{RatingChange, RatingParams};
use rush_engine::ports::outbound::{LevelStore, RatingStore, RatingUpdater};
use rush_engine::{
    EngineConfig, EngineError, EnginePorts, EngineResult, MatchView, RushEngineService,
};
use shared_bus::{Recipient, UpdateKind};
use shared_types::{LevelId, MatchId, MatchType, PlayerId};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

pub const START: u64 = 1_700_000_000_000;

/// Every pooled level is solved by pushing the block right twice.
const BOARD: &str = "4203\n0000";

/// Elo strategy that remembers every invocation.
#[derive(Default)]
pub struct CountingUpdater {
    inner: EloRatingUpdater,
    calls: Mutex<Vec<Vec<RatingInput>>>,
}

impl CountingUpdater {
    pub fn calls(&self) -> Vec<Vec<RatingInput>> {
        self.calls.lock().unwrap().clone()
    }
}

impl RatingUpdater for CountingUpdater {
    fn update(&self, match_type: MatchType, inputs: &[RatingInput]) -> Vec<RatingUpdate> {
        self.calls.lock().unwrap().push(inputs.to_vec());
        self.inner.update(match_type, inputs)
    }
}

/// Level store that hands out the first drawn level for every slot.
pub struct RepeatingLevelStore(pub Arc<InMemoryLevelStore>);

#[async_trait::async_trait]
impl LevelStore for RepeatingLevelStore {
    async fn levels_for(&self, match_type: MatchType, count: usize) -> EngineResult<Vec<LevelId>> {
        let drawn = self.0.levels_for(match_type, count).await?;
        Ok(drawn.iter().take(1).cycle().take(count).cloned().collect())
    }

    async fn level(&self, level_id: &LevelId) -> EngineResult<Level> {
        self.0.level(level_id).await
    }
}

/// Rating store whose next commits can be made to fail.
#[derive(Default)]
pub struct FlakyRatingStore {
    pub inner: InMemoryRatingStore,
    failures: AtomicU32,
}

impl FlakyRatingStore {
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RatingStore for FlakyRatingStore {
    async fn params(&self, player: &PlayerId, match_type: MatchType) -> EngineResult<RatingParams> {
        self.inner.params(player, match_type).await
    }

    async fn commit(
        &self,
        match_id: &MatchId,
        match_type: MatchType,
        updates: &[RatingUpdate],
    ) -> EngineResult<Vec<RatingChange>> {
        let failing = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failing {
            return Err(EngineError::RatingStore {
                reason: "store unavailable".into(),
            });
        }
        self.inner.commit(match_id, match_type, updates).await
    }
}

pub struct Harness {
    pub engine: Arc<RushEngineService>,
    pub config: EngineConfig,
    pub repository: Arc<InMemoryMatchRepository>,
    pub levels: Arc<InMemoryLevelStore>,
    pub ratings: Arc<FlakyRatingStore>,
    pub updater: Arc<CountingUpdater>,
    pub invites: Arc<AllowListInvites>,
    pub notifier: Arc<RecordingNotifier>,
    pub clock: Arc<ManualClock>,
}

pub fn p(id: &str) -> PlayerId {
    PlayerId::from(id)
}

pub fn harness() -> Harness {
    harness_with(EngineConfig::default())
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let levels = pooled_levels();
    assemble(config, levels.clone(), levels)
}

/// Harness whose level draws repeat one level for every slot.
pub fn harness_with_repeating_draws() -> Harness {
    let levels = pooled_levels();
    let draws = Arc::new(RepeatingLevelStore(levels.clone()));
    assemble(EngineConfig::default(), levels, draws)
}

fn pooled_levels() -> Arc<InMemoryLevelStore> {
    let levels = Arc::new(InMemoryLevelStore::new());
    for i in 0..16 {
        levels
            .insert_data(format!("level-{i:02}"), BOARD)
            .unwrap();
    }
    levels
}

fn assemble(
    config: EngineConfig,
    levels: Arc<InMemoryLevelStore>,
    draws: Arc<dyn LevelStore>,
) -> Harness {
    let repository = Arc::new(InMemoryMatchRepository::new());
    let ratings = Arc::new(FlakyRatingStore::default());
    let updater = Arc::new(CountingUpdater::default());
    let invites = Arc::new(AllowListInvites::new());
    let notifier = Arc::new(RecordingNotifier::new());
    let clock = Arc::new(ManualClock::new(START));

    let ports = EnginePorts {
        repository: repository.clone(),
        levels: draws,
        solver: Arc::new(SokobanSolver),
        ratings: ratings.clone(),
        rating_updater: updater.clone(),
        invites: invites.clone(),
        notifier: notifier.clone(),
        clock: clock.clone(),
    };

    Harness {
        engine: Arc::new(RushEngineService::new(config.clone(), ports)),
        config,
        repository,
        levels,
        ratings,
        updater,
        invites,
        notifier,
        clock,
    }
}

impl Harness {
    /// OPEN match created by the first player and joined by the rest.
    pub async fn lobby(&self, match_type: MatchType, players: &[&str]) -> MatchId {
        let created = self
            .engine
            .create_match(&p(players[0]), CreateMatch::rated(match_type))
            .await
            .unwrap();
        for player in &players[1..] {
            self.engine
                .join(&created.match_id, &p(player))
                .await
                .unwrap();
        }
        created.match_id
    }

    /// ACTIVE match past its countdown.
    pub async fn race(&self, match_type: MatchType, players: &[&str]) -> MatchId {
        let match_id = self.lobby(match_type, players).await;
        for player in players {
            self.engine.mark_ready(&match_id, &p(player)).await.unwrap();
        }
        self.clock.advance(self.config.start_countdown_ms);
        match_id
    }

    /// A correct proof as the player sees the board in this match.
    pub fn proof(&self, match_id: &MatchId) -> SolutionProof {
        rush_engine::Transform::for_match(match_id)
            .displayed_proof(&SolutionProof::new(vec![Direction::Right, Direction::Right]))
    }

    /// The single level the player's projection reveals.
    pub async fn current_level(&self, match_id: &MatchId, player: &str) -> LevelId {
        let view = self.engine.view(match_id, Some(&p(player))).await.unwrap();
        view.levels.unwrap().remove(0)
    }

    pub async fn solve(&self, match_id: &MatchId, player: &str) -> EngineResult<MatchView> {
        let level = self.current_level(match_id, player).await;
        self.engine
            .submit_level_complete(match_id, &p(player), &level, &self.proof(match_id))
            .await
    }

    pub async fn skip(&self, match_id: &MatchId, player: &str) -> EngineResult<MatchView> {
        let level = self.current_level(match_id, player).await;
        self.engine.skip(match_id, &p(player), Some(&level)).await
    }

    pub fn kinds(&self) -> Vec<UpdateKind> {
        self.notifier.updates().iter().map(|u| u.kind).collect()
    }

    /// Broadcasts of `kind`, counted once per fan-out (by its spectator copy).
    pub fn count(&self, kind: UpdateKind) -> usize {
        self.notifier
            .updates()
            .iter()
            .filter(|u| u.kind == kind && u.recipient == Recipient::Spectator)
            .count()
    }
}
