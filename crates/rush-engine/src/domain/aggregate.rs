//! Match aggregate and lifecycle state machine.
//!
//! ```text
//! [OPEN] ──quorum ready──→ [ACTIVE] ──ledgers full / deadline──→ [FINISHED]
//!    │                                                              ↑
//!    └──────────────── abandoned / last player left ────────────────┘
//! ```
//!
//! Every mutator validates first and mutates second: an `Err` leaves the
//! document untouched. Mutators that find the requested effect already in
//! place return [`Change::Unchanged`] so retried commands are harmless.

use serde::{Deserialize, Serialize};
use shared_types::{LevelId, MatchId, MatchState, MatchType, PlayerId, Timestamp};

use super::ledger::{GameTable, Outcome, ScoreTable};
use super::match_log::{FinishReason, MatchEvent, MatchLog};
use super::rating::{RatingChange, RatingStatus};
use crate::config::MatchRules;
use crate::error::{EngineError, EngineResult};

/// Effect of a command on the document.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Change {
    Applied,
    Unchanged,
}

impl Change {
    pub fn is_applied(&self) -> bool {
        matches!(self, Change::Applied)
    }
}

/// Where a ledger command lands for a player.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Slot {
    /// The same outcome is already recorded at this index
    Recorded(usize),
    /// The player's next free index
    Next(usize),
}

/// The shared match document.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Match {
    match_id: MatchId,
    match_type: MatchType,
    state: MatchState,
    private: bool,
    rated: bool,
    created_by: PlayerId,
    created_at: Timestamp,
    players: Vec<PlayerId>,
    marked_ready: Vec<PlayerId>,
    levels: Vec<LevelId>,
    game_table: GameTable,
    match_log: MatchLog,
    winners: Vec<PlayerId>,
    start_time: Option<Timestamp>,
    deadline: Option<Timestamp>,
    end_time: Option<Timestamp>,
    finish_reason: Option<FinishReason>,
    rating_status: RatingStatus,
}

impl Match {
    /// New OPEN match with the creator as its only player.
    pub fn create(
        match_id: MatchId,
        match_type: MatchType,
        created_by: PlayerId,
        private: bool,
        rated: bool,
        now: Timestamp,
    ) -> Self {
        let mut match_log = MatchLog::new();
        match_log.append(
            now,
            MatchEvent::Created {
                by: created_by.clone(),
            },
        );

        Self {
            match_id,
            match_type,
            state: MatchState::Open,
            private,
            rated,
            players: vec![created_by.clone()],
            created_by,
            created_at: now,
            marked_ready: Vec::new(),
            levels: Vec::new(),
            game_table: GameTable::new(),
            match_log,
            winners: Vec::new(),
            start_time: None,
            deadline: None,
            end_time: None,
            finish_reason: None,
            rating_status: RatingStatus::NotApplicable,
        }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn match_id(&self) -> &MatchId {
        &self.match_id
    }

    pub fn match_type(&self) -> MatchType {
        self.match_type
    }

    pub fn state(&self) -> MatchState {
        self.state
    }

    pub fn is_private(&self) -> bool {
        self.private
    }

    pub fn is_rated(&self) -> bool {
        self.rated
    }

    pub fn created_by(&self) -> &PlayerId {
        &self.created_by
    }

    pub fn created_at(&self) -> Timestamp {
        self.created_at
    }

    pub fn players(&self) -> &[PlayerId] {
        &self.players
    }

    pub fn marked_ready(&self) -> &[PlayerId] {
        &self.marked_ready
    }

    pub fn levels(&self) -> &[LevelId] {
        &self.levels
    }

    pub fn game_table(&self) -> &GameTable {
        &self.game_table
    }

    pub fn match_log(&self) -> &MatchLog {
        &self.match_log
    }

    pub fn winners(&self) -> &[PlayerId] {
        &self.winners
    }

    pub fn start_time(&self) -> Option<Timestamp> {
        self.start_time
    }

    pub fn deadline(&self) -> Option<Timestamp> {
        self.deadline
    }

    pub fn end_time(&self) -> Option<Timestamp> {
        self.end_time
    }

    pub fn finish_reason(&self) -> Option<FinishReason> {
        self.finish_reason
    }

    pub fn rating_status(&self) -> RatingStatus {
        self.rating_status
    }

    pub fn is_participant(&self, player: &PlayerId) -> bool {
        self.players.contains(player)
    }

    pub fn score_table(&self) -> ScoreTable {
        self.game_table.score_table()
    }

    /// Level the player is currently racing on.
    pub fn current_level(&self, player: &PlayerId) -> Option<&LevelId> {
        self.game_table.current_level(&self.levels, player)
    }

    /// Whether the quorum to start is met.
    pub fn quorum_reached(&self, rules: &MatchRules) -> bool {
        self.state == MatchState::Open
            && self.players.len() >= rules.min_players
            && self.players.iter().all(|p| self.marked_ready.contains(p))
    }

    fn require_state(&self, command: &'static str, state: MatchState) -> EngineResult<()> {
        if self.state != state {
            return Err(EngineError::InvalidTransition {
                command,
                state: self.state,
            });
        }
        Ok(())
    }

    fn require_participant(&self, player: &PlayerId) -> EngineResult<()> {
        if !self.is_participant(player) {
            return Err(EngineError::NotParticipant);
        }
        Ok(())
    }

    fn transition(&mut self, next: MatchState) {
        debug_assert!(self.state.can_transition_to(next));
        self.state = next;
    }

    // =========================================================================
    // LOBBY
    // =========================================================================

    pub fn join(
        &mut self,
        player: &PlayerId,
        rules: &MatchRules,
        invited: bool,
        now: Timestamp,
    ) -> EngineResult<Change> {
        self.require_state("join", MatchState::Open)?;
        if self.is_participant(player) {
            return Err(EngineError::AlreadyJoined);
        }
        if self.private && !invited {
            return Err(EngineError::InviteRequired);
        }
        if self.players.len() >= rules.max_players {
            return Err(EngineError::MatchFull {
                max_players: rules.max_players,
            });
        }

        self.players.push(player.clone());
        self.match_log.append(
            now,
            MatchEvent::Joined {
                player: player.clone(),
            },
        );
        Ok(Change::Applied)
    }

    /// Leave the lobby. The last player out cancels the match.
    pub fn leave(&mut self, player: &PlayerId, now: Timestamp) -> EngineResult<Change> {
        self.require_state("leave", MatchState::Open)?;
        self.require_participant(player)?;

        self.players.retain(|p| p != player);
        self.marked_ready.retain(|p| p != player);
        self.match_log.append(
            now,
            MatchEvent::Left {
                player: player.clone(),
            },
        );

        if self.players.is_empty() {
            self.finish(FinishReason::Cancelled, now);
        }
        Ok(Change::Applied)
    }

    pub fn mark_ready(&mut self, player: &PlayerId, now: Timestamp) -> EngineResult<Change> {
        match self.state {
            MatchState::Open => {}
            // Lost the race to the ready signal that started the match.
            MatchState::Active if self.is_participant(player) => return Ok(Change::Unchanged),
            MatchState::Active => return Err(EngineError::NotParticipant),
            MatchState::Finished => {
                return Err(EngineError::InvalidTransition {
                    command: "mark ready",
                    state: self.state,
                })
            }
        }
        self.require_participant(player)?;
        if self.marked_ready.contains(player) {
            return Ok(Change::Unchanged);
        }

        self.marked_ready.push(player.clone());
        self.match_log.append(
            now,
            MatchEvent::Ready {
                player: player.clone(),
            },
        );
        Ok(Change::Applied)
    }

    pub fn unmark_ready(&mut self, player: &PlayerId, now: Timestamp) -> EngineResult<Change> {
        self.require_state("unmark ready", MatchState::Open)?;
        self.require_participant(player)?;
        if !self.marked_ready.contains(player) {
            return Ok(Change::Unchanged);
        }

        self.marked_ready.retain(|p| p != player);
        self.match_log.append(
            now,
            MatchEvent::Unready {
                player: player.clone(),
            },
        );
        Ok(Change::Applied)
    }

    /// OPEN → ACTIVE with the drawn level sequence.
    ///
    /// The race begins after `countdown_ms`; its deadline is fixed here.
    pub fn start(
        &mut self,
        levels: Vec<LevelId>,
        rules: &MatchRules,
        countdown_ms: u64,
        now: Timestamp,
    ) -> EngineResult<Change> {
        self.require_state("start", MatchState::Open)?;
        if !self.quorum_reached(rules) {
            return Ok(Change::Unchanged);
        }

        let start_time = now + countdown_ms;
        self.game_table = GameTable::for_players(&self.players);
        self.levels = levels;
        self.start_time = Some(start_time);
        self.deadline = Some(start_time + rules.duration_ms);
        self.marked_ready.clear();
        self.transition(MatchState::Active);
        self.match_log.append(
            now,
            MatchEvent::MatchStarted {
                levels: self.levels.clone(),
                start_time,
            },
        );
        Ok(Change::Applied)
    }

    // =========================================================================
    // RACE
    // =========================================================================

    /// Index at which `outcome` lands for `player`.
    ///
    /// `Recorded` when an identical outcome for `level` already sits in an
    /// earlier slot, so a redelivered command collapses to a no-op.
    fn slot_for(
        &self,
        player: &PlayerId,
        level: Option<&LevelId>,
        outcome: &Outcome,
    ) -> EngineResult<Slot> {
        let entries = self.game_table.entries(player);
        let next = entries.len();

        if let Some(level) = level {
            let recorded = entries
                .iter()
                .enumerate()
                .find(|(i, entry)| *entry == outcome && self.levels.get(*i) == Some(level));
            if let Some((i, _)) = recorded {
                return Ok(Slot::Recorded(i));
            }
        }

        let expected = self.levels.get(next);
        match (expected, level) {
            (Some(expected), Some(level)) if expected != level => Err(EngineError::OutOfOrder {
                expected: Some(expected.clone()),
                submitted: Some(level.clone()),
            }),
            (Some(_), _) => Ok(Slot::Next(next)),
            (None, submitted) => Err(EngineError::OutOfOrder {
                expected: None,
                submitted: submitted.cloned(),
            }),
        }
    }

    /// Validate a ledger command against state, membership and countdown.
    fn race_slot(
        &self,
        command: &'static str,
        player: &PlayerId,
        level: Option<&LevelId>,
        outcome: &Outcome,
        now: Timestamp,
    ) -> EngineResult<Slot> {
        self.require_participant(player)?;
        match self.state {
            MatchState::Active => {}
            // A redelivered final submission after the match finished.
            MatchState::Finished if level.is_some() => {
                if let Ok(Slot::Recorded(i)) = self.slot_for(player, level, outcome) {
                    return Ok(Slot::Recorded(i));
                }
                return Err(EngineError::InvalidTransition {
                    command,
                    state: self.state,
                });
            }
            state => return Err(EngineError::InvalidTransition { command, state }),
        }
        if let Some(start_time) = self.start_time {
            if now < start_time {
                return Err(EngineError::NotStarted {
                    starts_in_ms: start_time - now,
                });
            }
        }
        self.slot_for(player, level, outcome)
    }

    /// Where a completion of `level` by `player` would land.
    pub fn submission_slot(
        &self,
        player: &PlayerId,
        level: &LevelId,
        now: Timestamp,
    ) -> EngineResult<Slot> {
        self.race_slot(
            "submit",
            player,
            Some(level),
            &Outcome::Completed(level.clone()),
            now,
        )
    }

    /// Append a completion. `validated` is the solver's verdict for the proof.
    ///
    /// Finishes the match in the same mutation when the ledgers fill up.
    pub fn submit_level_complete(
        &mut self,
        player: &PlayerId,
        level: &LevelId,
        validated: bool,
        now: Timestamp,
    ) -> EngineResult<Change> {
        let slot = match self.submission_slot(player, level, now)? {
            Slot::Recorded(_) => return Ok(Change::Unchanged),
            Slot::Next(slot) => slot,
        };
        if !validated {
            return Err(EngineError::Unvalidated {
                level: level.clone(),
            });
        }

        self.game_table
            .append(player, Outcome::Completed(level.clone()));
        self.match_log.append(
            now,
            MatchEvent::LevelComplete {
                player: player.clone(),
                level: level.clone(),
                slot,
            },
        );
        self.finish_if_complete(now);
        Ok(Change::Applied)
    }

    /// Forfeit the current slot. With `level`, duplicates collapse to no-ops.
    pub fn skip(
        &mut self,
        player: &PlayerId,
        level: Option<&LevelId>,
        now: Timestamp,
    ) -> EngineResult<Change> {
        let slot = match self.race_slot("skip", player, level, &Outcome::Skipped, now)? {
            Slot::Recorded(_) => return Ok(Change::Unchanged),
            Slot::Next(slot) => slot,
        };

        self.game_table.append(player, Outcome::Skipped);
        self.match_log.append(
            now,
            MatchEvent::Skipped {
                player: player.clone(),
                slot,
            },
        );
        self.finish_if_complete(now);
        Ok(Change::Applied)
    }

    pub fn post_message(
        &mut self,
        player: &PlayerId,
        message: &str,
        max_len: usize,
        now: Timestamp,
    ) -> EngineResult<Change> {
        self.require_participant(player)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(EngineError::MessageRejected {
                reason: "message is empty".into(),
            });
        }
        if message.chars().count() > max_len {
            return Err(EngineError::MessageRejected {
                reason: format!("message exceeds {max_len} characters"),
            });
        }

        self.match_log.append(
            now,
            MatchEvent::FromUser {
                player: player.clone(),
                message: message.to_string(),
            },
        );
        Ok(Change::Applied)
    }

    // =========================================================================
    // COMPLETION
    // =========================================================================

    fn finish_if_complete(&mut self, now: Timestamp) {
        if self.state == MatchState::Active && self.game_table.is_complete(self.levels.len()) {
            self.finish(FinishReason::Completed, now);
        }
    }

    /// Finish the match if its ledgers are full, its deadline passed, or
    /// (while OPEN) it sat unstarted past `open_timeout_ms`.
    pub fn check_completion(&mut self, now: Timestamp, open_timeout_ms: u64) -> Change {
        let reason = match self.state {
            MatchState::Active if self.game_table.is_complete(self.levels.len()) => {
                Some(FinishReason::Completed)
            }
            MatchState::Active if self.deadline.is_some_and(|d| now >= d) => {
                Some(FinishReason::Deadline)
            }
            MatchState::Open if now >= self.created_at + open_timeout_ms => {
                Some(FinishReason::Abandoned)
            }
            _ => None,
        };

        match reason {
            Some(reason) => {
                self.finish(reason, now);
                Change::Applied
            }
            None => Change::Unchanged,
        }
    }

    /// Freeze ledgers, fix winners and end time, and mark ratings owed.
    fn finish(&mut self, reason: FinishReason, now: Timestamp) {
        self.winners = if reason.is_cancellation() {
            Vec::new()
        } else {
            self.game_table.score_table().winners()
        };
        self.rating_status =
            if self.rated && !reason.is_cancellation() && self.players.len() >= 2 {
                RatingStatus::Pending { since: now }
            } else {
                RatingStatus::NotApplicable
            };
        self.end_time = Some(now);
        self.finish_reason = Some(reason);
        self.marked_ready.clear();
        self.transition(MatchState::Finished);
        self.match_log.append(
            now,
            MatchEvent::MatchFinished {
                winners: self.winners.clone(),
                reason,
            },
        );
    }

    // =========================================================================
    // RATINGS
    // =========================================================================

    /// Re-claim a stale pending settlement.
    pub fn claim_rating(&mut self, now: Timestamp, claim_timeout_ms: u64) -> Change {
        match self.rating_status {
            RatingStatus::Pending { since } if now >= since + claim_timeout_ms => {
                self.rating_status = RatingStatus::Pending { since: now };
                Change::Applied
            }
            _ => Change::Unchanged,
        }
    }

    /// Record a committed settlement.
    pub fn apply_ratings(&mut self, changes: Vec<RatingChange>, now: Timestamp) -> Change {
        if !matches!(self.rating_status, RatingStatus::Pending { .. }) {
            return Change::Unchanged;
        }
        self.rating_status = RatingStatus::Applied;
        self.match_log
            .append(now, MatchEvent::GameRecap { changes });
        Change::Applied
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const COUNTDOWN: u64 = 1_000;

    fn rules() -> MatchRules {
        MatchRules {
            min_players: 2,
            max_players: 3,
            level_count: 2,
            duration_ms: 60_000,
        }
    }

    fn p(id: &str) -> PlayerId {
        PlayerId::from(id)
    }

    fn l(id: &str) -> LevelId {
        LevelId::from(id)
    }

    fn lobby() -> Match {
        let mut m = Match::create(MatchId::from("m1"), MatchType::Blitz, p("a"), false, true, 0);
        m.join(&p("b"), &rules(), false, 1).unwrap();
        m
    }

    fn active() -> Match {
        let mut m = lobby();
        m.mark_ready(&p("a"), 2).unwrap();
        m.mark_ready(&p("b"), 3).unwrap();
        assert!(m.quorum_reached(&rules()));
        m.start(vec![l("l0"), l("l1")], &rules(), COUNTDOWN, 3).unwrap();
        m
    }

    #[test]
    fn test_join_rules() {
        let mut m = lobby();
        assert_eq!(m.join(&p("b"), &rules(), false, 2), Err(EngineError::AlreadyJoined));
        m.join(&p("c"), &rules(), false, 2).unwrap();
        assert_eq!(
            m.join(&p("d"), &rules(), false, 3),
            Err(EngineError::MatchFull { max_players: 3 })
        );

        let mut private = Match::create(MatchId::from("m2"), MatchType::Bullet, p("a"), true, false, 0);
        assert_eq!(
            private.join(&p("b"), &rules(), false, 1),
            Err(EngineError::InviteRequired)
        );
        assert!(private.join(&p("b"), &rules(), true, 1).is_ok());
    }

    #[test]
    fn test_start_fixes_schedule() {
        let m = active();
        assert_eq!(m.state(), MatchState::Active);
        assert_eq!(m.start_time(), Some(3 + COUNTDOWN));
        assert_eq!(m.deadline(), Some(3 + COUNTDOWN + 60_000));
        assert!(m.marked_ready().is_empty());
        assert_eq!(m.score_table().len(), 2);
    }

    #[test]
    fn test_mark_ready_after_start_is_noop() {
        let mut m = active();
        let log_len = m.match_log().len();
        assert_eq!(m.mark_ready(&p("a"), 5), Ok(Change::Unchanged));
        assert_eq!(m.mark_ready(&p("z"), 5), Err(EngineError::NotParticipant));
        assert_eq!(m.match_log().len(), log_len);
    }

    #[test]
    fn test_join_after_start_is_invalid() {
        let mut m = active();
        assert_eq!(
            m.join(&p("c"), &rules(), false, 5),
            Err(EngineError::InvalidTransition {
                command: "join",
                state: MatchState::Active
            })
        );
    }

    #[test]
    fn test_submission_before_start_time() {
        let mut m = active();
        assert_eq!(
            m.submit_level_complete(&p("a"), &l("l0"), true, 500),
            Err(EngineError::NotStarted { starts_in_ms: 503 })
        );
    }

    #[test]
    fn test_out_of_order_and_unvalidated() {
        let mut m = active();
        let now = 2_000;
        assert_eq!(
            m.submit_level_complete(&p("a"), &l("l1"), true, now),
            Err(EngineError::OutOfOrder {
                expected: Some(l("l0")),
                submitted: Some(l("l1"))
            })
        );
        assert_eq!(
            m.submit_level_complete(&p("a"), &l("l0"), false, now),
            Err(EngineError::Unvalidated { level: l("l0") })
        );
        assert!(m.game_table().entries(&p("a")).is_empty());
    }

    #[test]
    fn test_duplicate_submission_is_noop() {
        let mut m = active();
        let now = 2_000;
        assert_eq!(
            m.submit_level_complete(&p("a"), &l("l0"), true, now),
            Ok(Change::Applied)
        );
        assert_eq!(
            m.submit_level_complete(&p("a"), &l("l0"), true, now + 1),
            Ok(Change::Unchanged)
        );
        assert_eq!(m.game_table().entries(&p("a")).len(), 1);
        assert_eq!(m.score_table().score(&p("a")), 1);
    }

    #[test]
    fn test_full_ledgers_finish_with_draw() {
        let mut m = active();
        let now = 2_000;
        m.submit_level_complete(&p("a"), &l("l0"), true, now).unwrap();
        m.skip(&p("a"), Some(&l("l1")), now).unwrap();
        m.skip(&p("b"), None, now).unwrap();
        assert_eq!(m.state(), MatchState::Active);
        m.submit_level_complete(&p("b"), &l("l1"), true, now + 5).unwrap();

        assert_eq!(m.state(), MatchState::Finished);
        assert_eq!(m.winners(), &[p("a"), p("b")]);
        assert_eq!(m.end_time(), Some(now + 5));
        assert_eq!(m.finish_reason(), Some(FinishReason::Completed));
        assert_eq!(m.rating_status(), RatingStatus::Pending { since: now + 5 });

        // redelivered final submission after finish
        assert_eq!(
            m.submit_level_complete(&p("b"), &l("l1"), true, now + 6),
            Ok(Change::Unchanged)
        );
        assert!(matches!(
            m.skip(&p("a"), None, now + 6),
            Err(EngineError::InvalidTransition { .. })
        ));
    }

    #[test]
    fn test_deadline_and_abandonment() {
        let mut m = active();
        let deadline = m.deadline().unwrap();
        assert_eq!(m.check_completion(deadline - 1, 0), Change::Unchanged);
        assert_eq!(m.check_completion(deadline, 0), Change::Applied);
        assert_eq!(m.finish_reason(), Some(FinishReason::Deadline));

        let mut open = lobby();
        assert_eq!(open.check_completion(999, 1_000), Change::Unchanged);
        assert_eq!(open.check_completion(1_000, 1_000), Change::Applied);
        assert!(open.winners().is_empty());
        assert_eq!(open.rating_status(), RatingStatus::NotApplicable);
    }

    #[test]
    fn test_last_player_leaving_cancels() {
        let mut m = lobby();
        m.leave(&p("a"), 5).unwrap();
        assert_eq!(m.state(), MatchState::Open);
        m.leave(&p("b"), 6).unwrap();
        assert_eq!(m.state(), MatchState::Finished);
        assert_eq!(m.finish_reason(), Some(FinishReason::Cancelled));
    }

    #[test]
    fn test_rating_claim_and_apply() {
        let mut m = active();
        m.check_completion(m.deadline().unwrap(), 0);
        let since = m.end_time().unwrap();

        assert_eq!(m.claim_rating(since + 10, 100), Change::Unchanged);
        assert_eq!(m.claim_rating(since + 100, 100), Change::Applied);
        assert_eq!(m.apply_ratings(Vec::new(), since + 101), Change::Applied);
        assert_eq!(m.apply_ratings(Vec::new(), since + 102), Change::Unchanged);
        assert_eq!(m.rating_status(), RatingStatus::Applied);
    }

    #[test]
    fn test_log_replay_matches_document() {
        let mut m = active();
        m.submit_level_complete(&p("a"), &l("l0"), true, 2_000).unwrap();
        m.skip(&p("b"), None, 2_001).unwrap();
        m.post_message(&p("b"), "gg", 300, 2_002).unwrap();

        let replay = m.match_log().replay();
        assert_eq!(replay.state, m.state());
        assert_eq!(replay.players, m.players());
        assert_eq!(&replay.game_table, m.game_table());
    }

    #[test]
    fn test_message_limits() {
        let mut m = lobby();
        assert!(matches!(
            m.post_message(&p("a"), "   ", 10, 1),
            Err(EngineError::MessageRejected { .. })
        ));
        assert!(matches!(
            m.post_message(&p("a"), "this is too long", 10, 1),
            Err(EngineError::MessageRejected { .. })
        ));
        assert_eq!(
            m.post_message(&p("z"), "hi", 10, 1),
            Err(EngineError::NotParticipant)
        );
    }
}
