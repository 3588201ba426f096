//! Match engine service - command handling and fan-out
//!
//! Every command is a read-modify-write of one match document:
//!
//! ```text
//! load(version) → apply command → [quorum? draw levels + start]
//!               → save(expected_version) ──conflict──→ retry
//!               → broadcast per-recipient projections
//!               → [finished? settle ratings]
//! ```
//!
//! There is no in-process lock; correctness rests on the repository's
//! conditional write.

use crate::config::EngineConfig;
use crate::domain::{
    project, Change, Match, MatchView, RatingInput, RatingStatus, Slot, SolutionProof, Transform,
};
use crate::error::{EngineError, EngineResult};
use crate::metrics;
use crate::ports::inbound::{CreateMatch, PlayerRecord, RushEngineApi, SweepReport};
use crate::ports::outbound::{
    Clock, InviteVerifier, LevelStore, MatchNotifier, MatchRepository, RatingStore,
    RatingUpdater, Solver, VersionedMatch,
};
use async_trait::async_trait;
use shared_bus::{MatchUpdate, Recipient, UpdateKind};
use shared_types::{LevelId, MatchId, MatchState, PlayerId, Timestamp};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Collaborators injected into the engine.
#[derive(Clone)]
pub struct EnginePorts {
    pub repository: Arc<dyn MatchRepository>,
    pub levels: Arc<dyn LevelStore>,
    pub solver: Arc<dyn Solver>,
    pub ratings: Arc<dyn RatingStore>,
    pub rating_updater: Arc<dyn RatingUpdater>,
    pub invites: Arc<dyn InviteVerifier>,
    pub notifier: Arc<dyn MatchNotifier>,
    pub clock: Arc<dyn Clock>,
}

/// A committed (or found already applied) command.
struct Committed {
    record: Match,
    change: Change,
    /// State before the command, as loaded by the winning attempt
    previous: MatchState,
}

/// Result of the deadline check that precedes race commands.
enum DeadlineCheck {
    NotDue,
    /// This call finished the match
    Finished,
    /// Another writer changed the match first
    Lost,
}

/// Match engine service
pub struct RushEngineService {
    config: EngineConfig,
    ports: EnginePorts,
}

impl RushEngineService {
    pub fn new(config: EngineConfig, ports: EnginePorts) -> Self {
        Self { config, ports }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn now(&self) -> Timestamp {
        self.ports.clock.now()
    }

    fn exhausted(&self, match_id: &MatchId) -> EngineError {
        warn!(
            match_id = %match_id,
            attempts = self.config.max_conflict_retries,
            "[rush] Giving up on contended match"
        );
        EngineError::ContentionExhausted {
            match_id: match_id.clone(),
            attempts: self.config.max_conflict_retries,
        }
    }

    /// Conditional write. `Ok(false)` means another writer won the race.
    async fn try_save(&self, record: &Match, version: u64) -> EngineResult<bool> {
        match self.ports.repository.save(record, version).await {
            Ok(_) => Ok(true),
            Err(EngineError::Conflict { match_id }) => {
                metrics::record_write_conflict();
                debug!(match_id = %match_id, version, "[rush] Write conflict, retrying");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }

    async fn draw_levels(&self, record: &Match) -> EngineResult<Vec<LevelId>> {
        let rules = self.config.rules(record.match_type());
        let levels = self
            .ports
            .levels
            .levels_for(record.match_type(), rules.level_count)
            .await?;
        if levels.len() != rules.level_count {
            return Err(EngineError::LevelStore {
                reason: format!(
                    "needed {} levels for {}, got {}",
                    rules.level_count,
                    record.match_type(),
                    levels.len()
                ),
            });
        }
        // A repeated level would collapse into the earlier slot's record.
        let mut seen = HashSet::with_capacity(levels.len());
        if let Some(repeated) = levels.iter().find(|id| !seen.insert(*id)) {
            return Err(EngineError::LevelStore {
                reason: format!(
                    "draw for {} repeats level {repeated}",
                    record.match_type()
                ),
            });
        }
        Ok(levels)
    }

    /// Optimistic read-modify-write of one match.
    ///
    /// After `apply`, an OPEN match that meets its quorum is started in the
    /// same write. The level draw is reused across retries and discarded if
    /// another writer started the match first.
    async fn mutate<F>(&self, match_id: &MatchId, mut apply: F) -> EngineResult<Committed>
    where
        F: FnMut(&mut Match, Timestamp) -> EngineResult<Change> + Send,
    {
        let mut drawn: Option<Vec<LevelId>> = None;

        for _ in 0..self.config.max_conflict_retries {
            let VersionedMatch {
                mut record,
                version,
            } = self.ports.repository.load(match_id).await?;
            let previous = record.state();
            let now = self.now();

            let mut change = apply(&mut record, now)?;

            let rules = self.config.rules(record.match_type());
            if record.quorum_reached(&rules) {
                let levels = match &drawn {
                    Some(levels) => levels.clone(),
                    None => {
                        let levels = self.draw_levels(&record).await?;
                        drawn = Some(levels.clone());
                        levels
                    }
                };
                if record
                    .start(levels, &rules, self.config.start_countdown_ms, now)?
                    .is_applied()
                {
                    change = Change::Applied;
                }
            }

            if !change.is_applied() {
                return Ok(Committed {
                    record,
                    change,
                    previous,
                });
            }
            if self.try_save(&record, version).await? {
                return Ok(Committed {
                    record,
                    change,
                    previous,
                });
            }
        }

        Err(self.exhausted(match_id))
    }

    /// Finish an ACTIVE match whose deadline passed before a race command
    /// lands.
    async fn enforce_deadline(&self, record: &Match, version: u64) -> EngineResult<DeadlineCheck> {
        let previous = record.state();
        if previous != MatchState::Active {
            return Ok(DeadlineCheck::NotDue);
        }
        let mut finished = record.clone();
        if !finished
            .check_completion(self.now(), self.config.open_timeout_ms)
            .is_applied()
        {
            return Ok(DeadlineCheck::NotDue);
        }
        if !self.try_save(&finished, version).await? {
            return Ok(DeadlineCheck::Lost);
        }
        self.after_commit(
            Committed {
                record: finished,
                change: Change::Applied,
                previous,
            },
            UpdateKind::Finished,
        )
        .await;
        Ok(DeadlineCheck::Finished)
    }

    // =========================================================================
    // FAN-OUT
    // =========================================================================

    /// Projection for one viewer, with the viewer's current board if racing.
    async fn view_for(&self, record: &Match, viewer: Option<&PlayerId>, now: Timestamp) -> MatchView {
        let started = record.state() == MatchState::Active
            && record.start_time().is_some_and(|start| now >= start);
        let current = viewer
            .filter(|_| started)
            .and_then(|player| record.current_level(player));

        let board = match current {
            Some(level_id) => match self.ports.levels.level(level_id).await {
                Ok(level) => Some(level),
                Err(e) => {
                    warn!(level = %level_id, error = %e, "[rush] Current board unavailable");
                    None
                }
            },
            None => None,
        };

        project(record, viewer, now, board.as_ref())
    }

    /// One update per participant plus one for spectators.
    async fn broadcast(&self, record: &Match, kind: UpdateKind) {
        let now = self.now();
        let mut recipients: Vec<Option<&PlayerId>> = record.players().iter().map(Some).collect();
        recipients.push(None);

        let mut updates = Vec::with_capacity(recipients.len());
        for viewer in recipients {
            let view = self.view_for(record, viewer, now).await;
            match serde_json::to_value(&view) {
                Ok(view) => updates.push(MatchUpdate {
                    match_id: record.match_id().clone(),
                    kind,
                    recipient: viewer.map_or(Recipient::Spectator, |p| Recipient::Player(p.clone())),
                    view,
                }),
                Err(e) => warn!(match_id = %record.match_id(), error = %e, "[rush] Failed to encode view"),
            }
        }

        self.ports.notifier.notify(updates).await;
    }

    /// Broadcast a committed command and run its lifecycle side effects.
    async fn after_commit(&self, committed: Committed, kind: UpdateKind) {
        if !committed.change.is_applied() {
            return;
        }
        let record = &committed.record;
        self.broadcast(record, kind).await;

        if committed.previous == MatchState::Open && record.state() == MatchState::Active {
            metrics::record_match_started();
            info!(
                match_id = %record.match_id(),
                players = record.players().len(),
                levels = record.levels().len(),
                start_time = ?record.start_time(),
                "[rush] 🏁 Match started"
            );
            self.broadcast(record, UpdateKind::Started).await;
        }

        if committed.previous != MatchState::Finished && record.state() == MatchState::Finished {
            let reason = record.finish_reason().map_or("unknown", |r| r.as_str());
            metrics::record_match_finished(reason);
            info!(
                match_id = %record.match_id(),
                reason,
                winners = ?record.winners(),
                "[rush] Match finished"
            );
            if kind != UpdateKind::Finished {
                self.broadcast(record, UpdateKind::Finished).await;
            }
            if matches!(record.rating_status(), RatingStatus::Pending { .. }) {
                if let Err(e) = self.settle_ratings(record.match_id()).await {
                    warn!(
                        match_id = %record.match_id(),
                        error = %e,
                        "[rush] Rating settlement failed, sweeper will retry"
                    );
                    metrics::record_rating_settlement("failed");
                    self.ports
                        .notifier
                        .fault(record.match_id(), &e.to_string())
                        .await;
                }
            }
        }
    }

    // =========================================================================
    // RATINGS
    // =========================================================================

    /// Invoke the rating strategy for a pending match, commit to the store,
    /// then mark the match settled. Returns whether this call settled it.
    async fn settle_ratings(&self, match_id: &MatchId) -> EngineResult<bool> {
        let VersionedMatch { record, .. } = self.ports.repository.load(match_id).await?;
        if !matches!(record.rating_status(), RatingStatus::Pending { .. }) {
            return Ok(false);
        }

        let match_type = record.match_type();
        let scores = record.score_table();
        let mut inputs = Vec::with_capacity(scores.len());
        for (player, rank) in scores.placements() {
            let prior = self.ports.ratings.params(&player, match_type).await?;
            inputs.push(RatingInput {
                score: scores.score(&player),
                player,
                prior,
                rank,
            });
        }

        let updates = self.ports.rating_updater.update(match_type, &inputs);
        let changes = self
            .ports
            .ratings
            .commit(match_id, match_type, &updates)
            .await?;

        let committed = self
            .mutate(match_id, |m, now| Ok(m.apply_ratings(changes.clone(), now)))
            .await?;
        let settled = committed.change.is_applied();
        if settled {
            metrics::record_rating_settlement("applied");
            info!(
                match_id = %match_id,
                bucket = match_type.rating_bucket(),
                players = changes.len(),
                "[rush] Ratings settled"
            );
            self.broadcast(&committed.record, UpdateKind::RatingsSettled)
                .await;
        }
        Ok(settled)
    }

    // =========================================================================
    // SWEEP
    // =========================================================================

    async fn sweep_match<F>(&self, match_id: &MatchId, apply: F, kind: UpdateKind) -> EngineResult<bool>
    where
        F: FnMut(&mut Match, Timestamp) -> EngineResult<Change> + Send,
    {
        let committed = self.mutate(match_id, apply).await?;
        let applied = committed.change.is_applied();
        self.after_commit(committed, kind).await;
        Ok(applied)
    }

    async fn record_failure(&self, match_id: &MatchId, report: &mut SweepReport, e: EngineError) {
        report.failures += 1;
        warn!(match_id = %match_id, error = %e, "[rush] Sweep failed for match");
        self.ports.notifier.fault(match_id, &e.to_string()).await;
    }
}

/// Record rejected commands for metrics.
fn observe<T>(result: EngineResult<T>) -> EngineResult<T> {
    if let Err(e) = &result {
        metrics::record_submission_rejected(e.reason());
        if e.is_user_facing() {
            debug!(error = %e, "[rush] Command rejected");
        } else {
            warn!(error = %e, "[rush] Command failed");
        }
    }
    result
}

#[async_trait]
impl RushEngineApi for RushEngineService {
    async fn create_match(
        &self,
        creator: &PlayerId,
        request: CreateMatch,
    ) -> EngineResult<MatchView> {
        let now = self.now();
        let record = Match::create(
            MatchId::generate(),
            request.match_type,
            creator.clone(),
            request.private,
            request.rated,
            now,
        );
        observe(self.ports.repository.insert(&record).await)?;

        metrics::record_match_created(&request.match_type.to_string());
        info!(
            match_id = %record.match_id(),
            match_type = %request.match_type,
            creator = %creator,
            private = request.private,
            rated = request.rated,
            "[rush] Match created"
        );
        self.broadcast(&record, UpdateKind::Created).await;
        Ok(self.view_for(&record, Some(creator), now).await)
    }

    async fn join(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView> {
        let invited = self.ports.invites.is_invited(match_id, player).await;

        let committed = observe(
            self.mutate(match_id, |m, now| {
                let rules = self.config.rules(m.match_type());
                m.join(player, &rules, invited, now)
            })
            .await,
        )?;
        info!(match_id = %match_id, player = %player, "[rush] Player joined");

        let view = self.view_for(&committed.record, Some(player), self.now()).await;
        self.after_commit(committed, UpdateKind::Joined).await;
        Ok(view)
    }

    async fn leave(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView> {
        let committed = observe(self.mutate(match_id, |m, now| m.leave(player, now)).await)?;
        info!(match_id = %match_id, player = %player, "[rush] Player left");

        let view = self.view_for(&committed.record, Some(player), self.now()).await;
        self.after_commit(committed, UpdateKind::Left).await;
        Ok(view)
    }

    async fn mark_ready(&self, match_id: &MatchId, player: &PlayerId) -> EngineResult<MatchView> {
        let committed =
            observe(self.mutate(match_id, |m, now| m.mark_ready(player, now)).await)?;
        debug!(
            match_id = %match_id,
            player = %player,
            state = %committed.record.state(),
            "[rush] Player ready"
        );

        let view = self.view_for(&committed.record, Some(player), self.now()).await;
        self.after_commit(committed, UpdateKind::Ready).await;
        Ok(view)
    }

    async fn unmark_ready(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
    ) -> EngineResult<MatchView> {
        let committed =
            observe(self.mutate(match_id, |m, now| m.unmark_ready(player, now)).await)?;

        let view = self.view_for(&committed.record, Some(player), self.now()).await;
        self.after_commit(committed, UpdateKind::Unready).await;
        Ok(view)
    }

    async fn submit_level_complete(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        level: &LevelId,
        proof: &SolutionProof,
    ) -> EngineResult<MatchView> {
        let canonical_proof = Transform::for_match(match_id).canonical_proof(proof);
        let mut verdict: Option<bool> = None;

        for _ in 0..self.config.max_conflict_retries {
            let VersionedMatch {
                mut record,
                version,
            } = observe(self.ports.repository.load(match_id).await)?;
            match self.enforce_deadline(&record, version).await? {
                DeadlineCheck::NotDue => {}
                DeadlineCheck::Lost => continue,
                DeadlineCheck::Finished => {
                    return observe(Err(EngineError::InvalidTransition {
                        command: "submit",
                        state: MatchState::Finished,
                    }))
                }
            }
            let previous = record.state();
            let now = self.now();

            if let Slot::Recorded(slot) = observe(record.submission_slot(player, level, now))? {
                metrics::record_duplicate_submission();
                debug!(
                    match_id = %match_id,
                    player = %player,
                    slot,
                    "[rush] Duplicate submission collapsed"
                );
                return Ok(self.view_for(&record, Some(player), now).await);
            }

            let validated = match verdict {
                Some(validated) => validated,
                None => {
                    let board = observe(self.ports.levels.level(level).await)?;
                    let validated = self.ports.solver.validate(&board, &canonical_proof);
                    verdict = Some(validated);
                    validated
                }
            };

            let change = observe(record.submit_level_complete(player, level, validated, now))?;
            if !self.try_save(&record, version).await? {
                continue;
            }

            metrics::record_submission_accepted("level_complete");
            info!(
                match_id = %match_id,
                player = %player,
                level = %level,
                score = record.score_table().score(player),
                "[rush] Level complete"
            );
            let view = self.view_for(&record, Some(player), self.now()).await;
            self.after_commit(
                Committed {
                    record,
                    change,
                    previous,
                },
                UpdateKind::LevelComplete,
            )
            .await;
            return Ok(view);
        }

        observe(Err(self.exhausted(match_id)))
    }

    async fn skip(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        level: Option<&LevelId>,
    ) -> EngineResult<MatchView> {
        for _ in 0..self.config.max_conflict_retries {
            let VersionedMatch {
                mut record,
                version,
            } = observe(self.ports.repository.load(match_id).await)?;
            match self.enforce_deadline(&record, version).await? {
                DeadlineCheck::NotDue => {}
                DeadlineCheck::Lost => continue,
                DeadlineCheck::Finished => {
                    return observe(Err(EngineError::InvalidTransition {
                        command: "skip",
                        state: MatchState::Finished,
                    }))
                }
            }
            let previous = record.state();
            let now = self.now();

            let change = observe(record.skip(player, level, now))?;
            if !change.is_applied() {
                metrics::record_duplicate_submission();
                return Ok(self.view_for(&record, Some(player), now).await);
            }
            if !self.try_save(&record, version).await? {
                continue;
            }

            metrics::record_submission_accepted("skip");
            info!(match_id = %match_id, player = %player, "[rush] Level skipped");
            let view = self.view_for(&record, Some(player), self.now()).await;
            self.after_commit(
                Committed {
                    record,
                    change,
                    previous,
                },
                UpdateKind::Skipped,
            )
            .await;
            return Ok(view);
        }

        observe(Err(self.exhausted(match_id)))
    }

    async fn post_message(
        &self,
        match_id: &MatchId,
        player: &PlayerId,
        message: &str,
    ) -> EngineResult<MatchView> {
        let max_len = self.config.max_message_len;
        let committed = observe(
            self.mutate(match_id, |m, now| m.post_message(player, message, max_len, now))
                .await,
        )?;

        let view = self.view_for(&committed.record, Some(player), self.now()).await;
        self.after_commit(committed, UpdateKind::Message).await;
        Ok(view)
    }

    async fn check_completion(&self, match_id: &MatchId) -> EngineResult<bool> {
        let open_timeout_ms = self.config.open_timeout_ms;
        observe(
            self.sweep_match(
                match_id,
                |m, now| Ok(m.check_completion(now, open_timeout_ms)),
                UpdateKind::Finished,
            )
            .await,
        )
    }

    async fn sweep(&self) -> EngineResult<SweepReport> {
        let mut report = SweepReport::default();
        let open_timeout_ms = self.config.open_timeout_ms;
        let claim_timeout_ms = self.config.rating_claim_timeout_ms;

        for state in [MatchState::Open, MatchState::Active] {
            for match_id in self.ports.repository.ids_in_state(state).await? {
                let finished = self
                    .sweep_match(
                        &match_id,
                        |m, now| Ok(m.check_completion(now, open_timeout_ms)),
                        UpdateKind::Finished,
                    )
                    .await;
                match finished {
                    Ok(true) if state == MatchState::Open => report.abandoned += 1,
                    Ok(true) => report.finished += 1,
                    Ok(false) => {}
                    Err(e) => self.record_failure(&match_id, &mut report, e).await,
                }
            }
        }

        for match_id in self.ports.repository.ids_pending_rating().await? {
            let claimed = self
                .mutate(&match_id, |m, now| Ok(m.claim_rating(now, claim_timeout_ms)))
                .await;
            let result = match claimed {
                Ok(committed) if committed.change.is_applied() => {
                    info!(match_id = %match_id, "[rush] Re-driving stale rating settlement");
                    self.settle_ratings(&match_id).await
                }
                Ok(_) => Ok(false),
                Err(e) => Err(e),
            };
            match result {
                Ok(true) => report.ratings_settled += 1,
                Ok(false) => {}
                Err(e) => self.record_failure(&match_id, &mut report, e).await,
            }
        }

        if report != SweepReport::default() {
            info!(
                abandoned = report.abandoned,
                finished = report.finished,
                ratings_settled = report.ratings_settled,
                failures = report.failures,
                "[rush] Sweep complete"
            );
        }
        Ok(report)
    }

    async fn view(
        &self,
        match_id: &MatchId,
        viewer: Option<&PlayerId>,
    ) -> EngineResult<MatchView> {
        let VersionedMatch { record, .. } = observe(self.ports.repository.load(match_id).await)?;
        Ok(self.view_for(&record, viewer, self.now()).await)
    }

    async fn player_record(&self, player: &PlayerId) -> EngineResult<PlayerRecord> {
        let matches = self.ports.repository.matches_for_player(player).await?;
        let mut record = PlayerRecord::empty(player.clone());

        for m in matches.iter().filter(|m| {
            m.state() == MatchState::Finished
                && !m.finish_reason().is_some_and(|r| r.is_cancellation())
                && m.is_participant(player)
        }) {
            let tally = record.by_type.entry(m.match_type()).or_default();
            let winners = m.winners();
            if winners.contains(player) {
                if winners.len() == 1 {
                    tally.wins += 1;
                } else {
                    tally.draws += 1;
                }
            } else {
                tally.losses += 1;
            }
        }

        Ok(record)
    }
}
