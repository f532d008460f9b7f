//! End-to-end session state machine tests using the mock collaborators.

use std::sync::Arc;

use viva_core::clock::ClockEvent;
use viva_core::error::SessionError;
use viva_core::model::{Difficulty, Question};
use viva_core::session::{ClockOutcome, Phase, SessionConfig, SessionController};
use viva_core::traits::{Mood, NarratorDirective, RewardLedger};

use viva_services::ledger::InMemoryLedger;
use viva_services::mock::{MockEvaluator, MockSource, RecordingNarrator};

fn questions(n: usize) -> Vec<Question> {
    (0..n)
        .map(|i| Question {
            id: format!("q{i}"),
            text: format!("Question {i}?"),
            key_points: vec!["skills".into()],
            difficulty: Difficulty::Medium,
            points_available: 10,
            time_limit_secs: 60,
        })
        .collect()
}

struct Harness {
    controller: SessionController,
    clock_rx: tokio::sync::mpsc::UnboundedReceiver<ClockEvent>,
    source: Arc<MockSource>,
    evaluator: Arc<MockEvaluator>,
    ledger: Arc<InMemoryLedger>,
    narrator: Arc<RecordingNarrator>,
}

fn harness(total: usize, points_earned: u32, confidence_bonus: u32) -> Harness {
    let source = Arc::new(MockSource::new(questions(total)));
    let evaluator = Arc::new(MockEvaluator::with_fixed_score(
        points_earned,
        confidence_bonus,
    ));
    let ledger = Arc::new(InMemoryLedger::new());
    let narrator = Arc::new(RecordingNarrator::new());

    let config = SessionConfig {
        deck_id: "test-deck".into(),
        total_questions: total,
        ..SessionConfig::default()
    };
    let (controller, clock_rx) = SessionController::new(
        config,
        source.clone(),
        evaluator.clone(),
        ledger.clone(),
        narrator.clone(),
    );
    Harness {
        controller,
        clock_rx,
        source,
        evaluator,
        ledger,
        narrator,
    }
}

#[tokio::test]
async fn full_session_reaches_summary() {
    let mut h = harness(2, 8, 2);

    assert_eq!(h.controller.phase(), Phase::Intro);
    h.controller.start().await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Question);
    assert!(h.controller.results().len() <= 2);

    h.controller.submit("my skills are broad", 70).await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Feedback);
    assert_eq!(h.controller.results().len(), 1);

    h.controller.advance().await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Question);
    assert_eq!(h.controller.question_index(), 1);

    h.controller.submit("more skills", 70).await.unwrap();
    h.controller.advance().await.unwrap();

    assert_eq!(h.controller.phase(), Phase::Summary);
    assert_eq!(h.controller.results().len(), 2);

    let summary = h.controller.summary().unwrap();
    assert_eq!(summary.total_score, 20); // 2 * (8 + 2)
    assert!((summary.correctness_ratio - 1.0).abs() < f64::EPSILON);

    // Reward issued exactly once, for the full score.
    let reward = h.controller.reward().unwrap();
    assert_eq!(reward.points_delta, 20);
    assert_eq!(h.ledger.balance(), 20);
    assert_eq!(h.source.call_count(), 2);

    // Closing narration mentions the results.
    let spoken = h.narrator.spoken();
    assert!(spoken.last().unwrap().contains("completed the interview"));
}

#[tokio::test]
async fn total_score_law_holds() {
    let mut h = harness(3, 6, 3);
    h.controller.start().await.unwrap();
    for _ in 0..3 {
        h.controller.submit("answer", 30).await.unwrap();
        h.controller.advance().await.unwrap();
    }

    let expected: u32 = h
        .controller
        .results()
        .entries
        .iter()
        .map(|e| e.feedback.points_earned + e.feedback.confidence_bonus)
        .sum();
    assert_eq!(h.controller.summary().unwrap().total_score, expected);
    assert_eq!(expected, 27);
}

#[tokio::test]
async fn evaluator_points_are_clamped() {
    // Evaluator claims 50 points on a 10-point question.
    let mut h = harness(1, 50, 0);
    h.controller.start().await.unwrap();
    h.controller.submit("answer", 0).await.unwrap();

    let entry = &h.controller.results().entries[0];
    assert_eq!(entry.feedback.points_earned, 10);
    assert_eq!(entry.question.points_available, 10);
}

#[tokio::test(start_paused = true)]
async fn timeout_auto_submits_sentinel_answer() {
    let mut h = harness(1, 0, 0);
    h.controller.start().await.unwrap();

    // Drive clock events until expiry fires the auto-submit.
    loop {
        let event = h.clock_rx.recv().await.expect("clock channel open");
        match h.controller.handle_clock(event).await.unwrap() {
            ClockOutcome::AutoSubmitted => break,
            ClockOutcome::Ticked { .. } | ClockOutcome::Ignored => continue,
        }
    }

    assert_eq!(h.controller.phase(), Phase::Feedback);
    let answer = h.evaluator.last_answer().unwrap();
    assert!(answer.is_no_answer());
    assert_eq!(answer.time_spent_secs, 60);

    // A submission arriving just after the timeout must not fire a second
    // transition.
    let err = h.controller.submit("too late", 50).await.unwrap_err();
    assert!(matches!(err, SessionError::WrongPhase { .. }));
    assert_eq!(h.controller.results().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timeout_auto_submits_typed_draft() {
    let mut h = harness(1, 5, 0);
    h.controller.start().await.unwrap();
    h.controller.update_draft("half-typed thought", 65);

    loop {
        let event = h.clock_rx.recv().await.expect("clock channel open");
        if h.controller.handle_clock(event).await.unwrap() == ClockOutcome::AutoSubmitted {
            break;
        }
    }

    let answer = h.evaluator.last_answer().unwrap();
    assert_eq!(answer.text, "half-typed thought");
    assert_eq!(answer.confidence_level, 65);
    assert_eq!(answer.time_spent_secs, 60);
}

#[tokio::test]
async fn stale_expiry_after_submit_is_ignored() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();

    // The first arm uses generation 1 (the constructor's clock starts at 0
    // and arming bumps it).
    h.controller.submit("beat the clock", 50).await.unwrap();
    assert_eq!(h.controller.results().len(), 1);

    // The expiry that was racing the submission arrives now, stale.
    let outcome = h
        .controller
        .handle_clock(ClockEvent::Expired { generation: 1 })
        .await
        .unwrap();
    assert_eq!(outcome, ClockOutcome::Ignored);
    assert_eq!(h.controller.results().len(), 1);
    assert_eq!(h.evaluator.call_count(), 1);
}

#[tokio::test]
async fn single_question_scoring_scenario() {
    // pointsAvailable=10, evaluator returns 8 + 2 bonus.
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();
    h.controller.submit("answer", 20).await.unwrap();
    h.controller.advance().await.unwrap();

    let summary = h.controller.summary().unwrap();
    assert_eq!(summary.total_score, 10);
    assert!((summary.correctness_ratio - 1.0).abs() < f64::EPSILON);
    assert_eq!(summary.tokens_earned, 4);
}

#[tokio::test]
async fn evaluation_failure_preserves_answer_for_retry() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();
    h.evaluator.fail_next(1);

    let err = h.controller.submit("my answer", 50).await.unwrap_err();
    assert!(matches!(err, SessionError::EvaluationFailed(_)));
    assert!(err.is_retryable());
    assert_eq!(h.controller.phase(), Phase::Evaluating);
    assert_eq!(h.controller.results().len(), 0, "no entry until success");

    h.controller.retry_evaluation().await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Feedback);
    assert_eq!(h.controller.results().len(), 1, "exactly one entry after retry");
    assert_eq!(h.evaluator.call_count(), 2);
    assert_eq!(h.evaluator.last_answer().unwrap().text, "my answer");
}

#[tokio::test]
async fn reward_failure_retries_without_recomputation() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();
    h.controller.submit("answer", 50).await.unwrap();

    h.ledger.fail_next(1);
    let err = h.controller.advance().await.unwrap_err();
    assert!(matches!(err, SessionError::RewardFailed(_)));
    assert_eq!(h.controller.phase(), Phase::Summary);
    assert!(h.controller.summary().is_some(), "summary retained");
    assert!(h.controller.reward().is_none());

    h.controller.retry_reward().await.unwrap();
    let reward = h.controller.reward().unwrap().clone();
    assert_eq!(reward.points_delta, 10);

    // A duplicate issuance (e.g. retry after a timeout that actually
    // landed) returns the original transaction; the balance is unchanged.
    let again = h.ledger.credit(h.controller.id(), 10).await.unwrap();
    assert_eq!(again, reward);
    assert_eq!(h.ledger.balance(), 10);
}

#[tokio::test]
async fn source_failure_keeps_phase_for_retry() {
    let mut h = harness(2, 8, 2);
    h.source.fail_next(1);

    let err = h.controller.start().await.unwrap_err();
    assert!(matches!(err, SessionError::SourceUnavailable(_)));
    assert_eq!(h.controller.phase(), Phase::Intro);

    h.controller.start().await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Question);

    // Same recovery mid-session, on advance.
    h.controller.submit("answer", 50).await.unwrap();
    h.source.fail_next(1);
    assert!(h.controller.advance().await.is_err());
    assert_eq!(h.controller.phase(), Phase::Feedback);
    assert_eq!(h.controller.question_index(), 0, "index unchanged on failure");

    h.controller.advance().await.unwrap();
    assert_eq!(h.controller.question_index(), 1);
}

#[tokio::test]
async fn empty_submission_is_rejected_locally() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();

    let err = h.controller.submit("   ", 50).await.unwrap_err();
    assert!(matches!(err, SessionError::InvalidAnswer(_)));
    assert_eq!(h.controller.phase(), Phase::Question);
    assert_eq!(h.evaluator.call_count(), 0, "rejected before any call");

    // The question can still be answered.
    h.controller.submit("real answer", 50).await.unwrap();
    assert_eq!(h.controller.phase(), Phase::Feedback);
}

#[tokio::test]
async fn abandoned_session_stops_transitioning() {
    let mut h = harness(2, 8, 2);
    h.controller.start().await.unwrap();
    h.controller.abandon();

    assert!(matches!(
        h.controller.submit("answer", 50).await,
        Err(SessionError::Cancelled)
    ));
    assert!(matches!(
        h.controller
            .handle_clock(ClockEvent::Expired { generation: 1 })
            .await,
        Err(SessionError::Cancelled)
    ));
    assert_eq!(h.controller.results().len(), 0);
    assert_eq!(h.ledger.balance(), 0, "abandoned sessions earn nothing");
}

#[tokio::test]
async fn cancel_handle_tears_down_from_outside() {
    let mut h = harness(1, 8, 2);
    let handle = h.controller.cancel_handle();
    h.controller.start().await.unwrap();

    handle.cancel();
    assert!(matches!(
        h.controller.submit("answer", 50).await,
        Err(SessionError::Cancelled)
    ));
    assert!(h.controller.is_cancelled());
}

#[tokio::test]
async fn mood_follows_score_ratio() {
    // 8/10 -> pleased
    let mut h = harness(1, 8, 0);
    h.controller.start().await.unwrap();
    h.controller.submit("answer", 50).await.unwrap();
    assert!(h
        .narrator
        .directives()
        .contains(&NarratorDirective::Mood(Mood::Pleased)));

    // 3/10 -> concerned
    let mut h = harness(1, 3, 0);
    h.controller.start().await.unwrap();
    h.controller.submit("answer", 50).await.unwrap();
    assert!(h
        .narrator
        .directives()
        .contains(&NarratorDirective::Mood(Mood::Concerned)));
}

#[tokio::test]
async fn phase_guards_reject_out_of_order_operations() {
    let mut h = harness(1, 8, 2);

    // Cannot advance or submit before starting.
    assert!(matches!(
        h.controller.advance().await,
        Err(SessionError::WrongPhase { .. })
    ));
    assert!(matches!(
        h.controller.submit("answer", 50).await,
        Err(SessionError::WrongPhase { .. })
    ));

    h.controller.start().await.unwrap();
    // Cannot start twice or retry an evaluation that isn't pending.
    assert!(matches!(
        h.controller.start().await,
        Err(SessionError::WrongPhase { .. })
    ));
    assert!(matches!(
        h.controller.retry_evaluation().await,
        Err(SessionError::WrongPhase { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn ticks_report_remaining_time() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();

    let event = h.clock_rx.recv().await.unwrap();
    let outcome = h.controller.handle_clock(event).await.unwrap();
    assert_eq!(outcome, ClockOutcome::Ticked { remaining_secs: 59 });
}

#[tokio::test(start_paused = true)]
async fn elapsed_time_recorded_on_submit() {
    let mut h = harness(1, 8, 2);
    h.controller.start().await.unwrap();

    tokio::time::advance(std::time::Duration::from_secs(5)).await;
    h.controller.submit("quick answer", 50).await.unwrap();

    let answer = h.evaluator.last_answer().unwrap();
    assert_eq!(answer.time_spent_secs, 5);
}
