//! # Idempotence and Retry Tests
//!
//! Redelivered commands collapse to no-ops; lost optimistic writes are
//! retried until the retry budget runs out.

mod common;

use common::{harness, harness_with_repeating_draws, p};
use rush_engine::domain::{Direction, MatchEvent, Outcome, SolutionProof};
use rush_engine::ports::inbound::RushEngineApi;
use rush_engine::ports::outbound::MatchRepository;
use rush_engine::EngineError;
use shared_bus::UpdateKind;
use shared_types::{MatchState, MatchType};

#[tokio::test]
async fn test_duplicate_submission_is_collapsed() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let level = h.current_level(&match_id, "alice").await;
    let proof = h.proof(&match_id);

    h.engine
        .submit_level_complete(&match_id, &p("alice"), &level, &proof)
        .await
        .unwrap();
    let version = h.repository.version(&match_id);
    let view = h
        .engine
        .submit_level_complete(&match_id, &p("alice"), &level, &proof)
        .await
        .unwrap();

    assert_eq!(view.scores.unwrap().score(&p("alice")), 1);
    assert_eq!(h.repository.version(&match_id), version);
    assert_eq!(h.count(UpdateKind::LevelComplete), 1);

    let record = h.repository.load(&match_id).await.unwrap().record;
    assert_eq!(
        record.game_table().entries(&p("alice")),
        &[Outcome::Completed(level)]
    );
}

#[tokio::test]
async fn test_duplicate_skip_is_collapsed() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let level = h.current_level(&match_id, "bob").await;

    h.engine.skip(&match_id, &p("bob"), Some(&level)).await.unwrap();
    h.engine.skip(&match_id, &p("bob"), Some(&level)).await.unwrap();

    let record = h.repository.load(&match_id).await.unwrap().record;
    assert_eq!(record.game_table().entries(&p("bob")), &[Outcome::Skipped]);
    assert_eq!(h.count(UpdateKind::Skipped), 1);

    // Without a level every skip lands on the next slot.
    h.engine.skip(&match_id, &p("bob"), None).await.unwrap();
    let record = h.repository.load(&match_id).await.unwrap().record;
    assert_eq!(record.game_table().entries(&p("bob")).len(), 2);
}

#[tokio::test]
async fn test_out_of_order_submission() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let levels = h
        .repository
        .load(&match_id)
        .await
        .unwrap()
        .record
        .levels()
        .to_vec();

    let err = h
        .engine
        .submit_level_complete(&match_id, &p("alice"), &levels[2], &h.proof(&match_id))
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::OutOfOrder {
            expected: Some(levels[0].clone()),
            submitted: Some(levels[2].clone()),
        }
    );
}

#[tokio::test]
async fn test_invalid_proof_is_rejected() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let level = h.current_level(&match_id, "alice").await;

    let err = h
        .engine
        .submit_level_complete(
            &match_id,
            &p("alice"),
            &level,
            &SolutionProof::new(Vec::<Direction>::new()),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::Unvalidated { level });

    let record = h.repository.load(&match_id).await.unwrap().record;
    assert!(record.game_table().entries(&p("alice")).is_empty());
}

#[tokio::test]
async fn test_submission_during_countdown() {
    let h = harness();
    let match_id = h.lobby(MatchType::Blitz, &["alice", "bob"]).await;
    h.engine.mark_ready(&match_id, &p("alice")).await.unwrap();
    h.engine.mark_ready(&match_id, &p("bob")).await.unwrap();
    h.clock.advance(1_000);

    let err = h.engine.skip(&match_id, &p("alice"), None).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::NotStarted {
            starts_in_ms: h.config.start_countdown_ms - 1_000
        }
    );
}

#[tokio::test]
async fn test_outsider_cannot_submit() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let err = h.engine.skip(&match_id, &p("mallory"), None).await.unwrap_err();
    assert_eq!(err, EngineError::NotParticipant);
}

#[tokio::test]
async fn test_lost_writes_are_retried() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;

    h.repository.inject_conflicts(3);
    h.solve(&match_id, "alice").await.unwrap();

    let record = h.repository.load(&match_id).await.unwrap().record;
    assert_eq!(record.game_table().entries(&p("alice")).len(), 1);
    assert_eq!(
        record
            .match_log()
            .count(|e| matches!(e, MatchEvent::LevelComplete { .. })),
        1
    );
}

#[tokio::test]
async fn test_contention_exhausted() {
    let h = harness();
    let match_id = h.race(MatchType::Blitz, &["alice", "bob"]).await;
    let attempts = h.config.max_conflict_retries;

    h.repository.inject_conflicts(attempts);
    let err = h.solve(&match_id, "alice").await.unwrap_err();
    assert_eq!(
        err,
        EngineError::ContentionExhausted {
            match_id: match_id.clone(),
            attempts,
        }
    );
    let record = h.repository.load(&match_id).await.unwrap().record;
    assert!(record.game_table().entries(&p("alice")).is_empty());

    // The budget is per command.
    h.solve(&match_id, "alice").await.unwrap();
}

#[tokio::test]
async fn test_final_submission_redelivered_after_finish() {
    let h = harness();
    let match_id = h.race(MatchType::Bullet, &["alice", "bob"]).await;
    for _ in 0..3 {
        h.skip(&match_id, "bob").await.unwrap();
    }
    for _ in 0..2 {
        h.solve(&match_id, "alice").await.unwrap();
    }
    let last = h.current_level(&match_id, "alice").await;
    let proof = h.proof(&match_id);

    let view = h
        .engine
        .submit_level_complete(&match_id, &p("alice"), &last, &proof)
        .await
        .unwrap();
    assert_eq!(view.state, MatchState::Finished);

    let again = h
        .engine
        .submit_level_complete(&match_id, &p("alice"), &last, &proof)
        .await
        .unwrap();
    assert_eq!(again.state, MatchState::Finished);
    assert_eq!(h.count(UpdateKind::Finished), 1);
    assert_eq!(h.updater.calls().len(), 1);

    let err = h.engine.skip(&match_id, &p("bob"), None).await.unwrap_err();
    assert_eq!(
        err,
        EngineError::InvalidTransition {
            command: "skip",
            state: MatchState::Finished,
        }
    );
}

#[tokio::test]
async fn test_draw_repeating_a_level_never_starts_the_race() {
    let h = harness_with_repeating_draws();
    let match_id = h.lobby(MatchType::Blitz, &["alice", "bob"]).await;

    h.engine.mark_ready(&match_id, &p("alice")).await.unwrap();
    let err = h.engine.mark_ready(&match_id, &p("bob")).await.unwrap_err();
    assert!(matches!(err, EngineError::LevelStore { .. }));

    // a ledger keyed on [X, X] would fold slot 1 into slot 0's record
    let record = h.repository.load(&match_id).await.unwrap().record;
    assert_eq!(record.state(), MatchState::Open);
    assert!(record.levels().is_empty());
    assert_eq!(record.marked_ready(), &[p("alice")]);
    assert_eq!(h.count(UpdateKind::Started), 0);
}
