//! Integration tests for the task session controller.
//!
//! Time-dependent tests run on tokio's paused clock, so round deadlines are
//! reached instantly and deterministically.

mod common;

use std::sync::Arc;
use std::time::Duration;

use blackbox::adapters::{InMemoryProgressStore, MockOracle};
use blackbox::domain::errors::{OracleError, SessionError};
use blackbox::domain::models::{
    progress_user_key, ProgressRecord, SessionStatus, TaskCategory, TaskDescriptor, Verdict,
    TIMEOUT_INPUT,
};
use blackbox::domain::ports::ProgressStore;
use blackbox::services::{EndOutcome, TaskSessionController, TimeoutOutcome};
use common::{inputs, start_session, ROUND};
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio::time::Instant;

#[tokio::test(start_paused = true)]
async fn test_full_round_trip_budget_accounting() {
    common::setup_test_logging();
    let h = start_session(10, 3).await;
    let c = &h.controller;

    let outcome = c.submit_query(inputs(&["1", "2", "3"])).await.unwrap();
    assert_eq!(outcome.queries_used, 3);
    assert_eq!(outcome.charged, 3);

    let outcome = c.submit_query(inputs(&["4", "5"])).await.unwrap();
    assert_eq!(outcome.queries_used, 5);

    let fired = c.wait_for_deadline().await.unwrap();
    let timeout = c.handle_timeout(fired).await.unwrap();
    assert_eq!(
        timeout,
        TimeoutOutcome::Charged {
            charged: 3,
            queries_used: 8,
            remaining: 2
        }
    );
    let snapshot = c.snapshot().await;
    assert_eq!(snapshot.session.failed_queries(), 3);
    assert_eq!(snapshot.session.query_history().len(), 8);
    assert!(snapshot.session.query_history()[5..]
        .iter()
        .all(|q| q.input == TIMEOUT_INPUT));

    let judged = c.submit_hypothesis("outputs 1 for primes").await.unwrap();
    assert_eq!(judged.verdict, Verdict::Incorrect);
    assert!(!judged.completed);
    assert_eq!(judged.remaining, 2);
    assert_eq!(judged.rule_description, None);

    let err = c.submit_hypothesis("outputs 1 for odd numbers").await.unwrap_err();
    assert!(matches!(err, SessionError::HypothesisOutOfTurn));
    assert_eq!(h.oracle.calls().await.hypothesis, 1);

    let outcome = c.submit_query(inputs(&["6", "7"])).await.unwrap();
    assert_eq!(outcome.queries_used, 10);
    assert_eq!(outcome.remaining, 0);

    h.oracle.push_hypothesis_reply(true, "Correct").await;
    let judged = c.submit_hypothesis("outputs 1 for odd numbers").await.unwrap();
    assert_eq!(judged.verdict, Verdict::Correct);
    assert!(judged.completed);
    assert_eq!(
        judged.rule_description.as_deref(),
        Some("Outputs 1 for odd integers and 0 otherwise")
    );
    assert_eq!(judged.progress_error, None);

    let progress = h.store.get(&progress_user_key("ada")).await.unwrap();
    assert_eq!(
        progress.get("odd"),
        Some(&ProgressRecord::completed("odd", 10, 10, true))
    );

    assert_eq!(
        c.end_task().await.unwrap(),
        EndOutcome::Ended {
            status: SessionStatus::Completed
        }
    );
    assert_eq!(c.end_task().await.unwrap(), EndOutcome::AlreadyEnded);
    assert_eq!(h.store.write_count().await, 1);
}

#[tokio::test]
async fn test_batch_limits_are_preconditions() {
    let h = start_session(4, 3).await;
    let c = &h.controller;

    let err = c.submit_query(inputs(&["1", "2", "3", "4"])).await.unwrap_err();
    assert!(matches!(err, SessionError::BatchTooLarge { size: 4, limit: 3 }));

    c.submit_query(inputs(&["1", "2"])).await.unwrap();
    let err = c.submit_query(inputs(&["3", "4", "5"])).await.unwrap_err();
    assert!(matches!(
        err,
        SessionError::OutOfBudget {
            requested: 3,
            remaining: 2
        }
    ));
    assert!(err.is_precondition());
    assert_eq!(h.oracle.calls().await.query, 1);
}

#[tokio::test]
async fn test_final_attempt_on_empty_budget_completes_without_success() {
    let h = start_session(3, 3).await;
    let c = &h.controller;

    c.submit_query(inputs(&["1", "2", "3"])).await.unwrap();
    let judged = c.submit_hypothesis("no idea").await.unwrap();
    assert!(judged.completed);
    assert_eq!(judged.verdict, Verdict::Incorrect);

    let snapshot = c.snapshot().await;
    assert_eq!(snapshot.session.status(), SessionStatus::Completed);
    assert!(!snapshot.session.succeeded());
    assert_eq!(
        h.store.get(&progress_user_key("ada")).await.unwrap()["odd"],
        ProgressRecord::completed("odd", 3, 3, false)
    );
}

#[tokio::test]
async fn test_vague_feedback_is_classified() {
    let h = start_session(10, 3).await;
    h.oracle
        .push_hypothesis_reply(false, "That's too vague to be a real rule")
        .await;

    let judged = h.controller.submit_hypothesis("something with numbers").await.unwrap();
    assert_eq!(judged.verdict, Verdict::Vague);
    assert!(!judged.completed);
}

#[tokio::test(start_paused = true)]
async fn test_completed_session_is_frozen() {
    let h = start_session(10, 3).await;
    let c = &h.controller;
    c.submit_query(inputs(&["1"])).await.unwrap();
    h.oracle.push_hypothesis_reply(true, "Correct").await;
    c.submit_hypothesis("odd numbers").await.unwrap();
    let before = c.snapshot().await;
    assert_eq!(before.deadline, None);

    let err = c.submit_query(inputs(&["2"])).await.unwrap_err();
    assert!(matches!(err, SessionError::SessionCompleted));
    let err = c.submit_hypothesis("again").await.unwrap_err();
    assert!(matches!(err, SessionError::SessionCompleted));
    assert_eq!(
        c.handle_timeout(Instant::now()).await.unwrap(),
        TimeoutOutcome::Inactive
    );
    assert_eq!(c.wait_for_deadline().await, None);

    let after = c.snapshot().await;
    assert_eq!(after.session.queries_used(), before.session.queries_used());
    assert_eq!(after.session.query_history(), before.session.query_history());
    assert_eq!(
        after.session.submission_history(),
        before.session.submission_history()
    );
}

#[tokio::test]
async fn test_transient_hypothesis_failure_changes_nothing() {
    let h = start_session(10, 3).await;
    let c = &h.controller;
    h.oracle
        .fail_next_hypothesis(OracleError::Rejected("Session not found".into()))
        .await;

    let err = c.submit_hypothesis("odd numbers").await.unwrap_err();
    assert!(err.is_transient());

    let snapshot = c.snapshot().await;
    assert!(snapshot.session.submission_history().is_empty());
    assert!(!snapshot.session.last_action_was_hypothesis());
    assert!(c.submit_hypothesis("odd numbers").await.is_ok());
}

#[tokio::test]
async fn test_progress_write_failure_is_retried_by_end_task() {
    let h = start_session(10, 3).await;
    let c = &h.controller;
    h.store.fail_next_writes(1).await;
    h.oracle.push_hypothesis_reply(true, "Correct").await;

    let judged = c.submit_hypothesis("odd numbers").await.unwrap();
    assert!(judged.completed);
    assert!(judged.progress_error.is_some());
    assert_eq!(h.store.write_count().await, 0);
    assert_eq!(c.snapshot().await.session.status(), SessionStatus::Completed);

    c.end_task().await.unwrap();
    assert_eq!(h.store.write_count().await, 1);
    c.end_task().await.unwrap();
    assert_eq!(h.store.write_count().await, 1);
}

#[tokio::test(start_paused = true)]
async fn test_timer_task_rearms_after_queries() {
    let h = start_session(10, 3).await;
    let c = h.controller.clone();
    let started = Instant::now();
    let (tx, mut rx) = mpsc::unbounded_channel();
    let timer = tokio::spawn(c.clone().run_timer(tx));

    let first = rx.recv().await.unwrap();
    assert_eq!(
        first,
        TimeoutOutcome::Charged {
            charged: 3,
            queries_used: 3,
            remaining: 7
        }
    );
    assert_eq!(started.elapsed(), ROUND);

    tokio::time::advance(Duration::from_secs(100)).await;
    c.submit_query(inputs(&["1"])).await.unwrap();

    let second = rx.recv().await.unwrap();
    assert_eq!(
        second,
        TimeoutOutcome::Charged {
            charged: 3,
            queries_used: 7,
            remaining: 3
        }
    );
    assert_eq!(started.elapsed(), ROUND * 2 + Duration::from_secs(100));

    c.end_task().await.unwrap();
    timer.await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn test_timeouts_never_overdraw_the_budget() {
    let h = start_session(4, 3).await;
    let c = &h.controller;

    let mut charges = Vec::new();
    for _ in 0..3 {
        let fired = c.wait_for_deadline().await.unwrap();
        if let TimeoutOutcome::Charged { charged, .. } = c.handle_timeout(fired).await.unwrap() {
            charges.push(charged);
        }
    }

    assert_eq!(charges, vec![3, 1, 0]);
    let snapshot = c.snapshot().await;
    assert_eq!(snapshot.session.queries_used(), 4);
    assert_eq!(snapshot.session.failed_queries(), 4);
    assert!(snapshot.deadline.is_some());

    let judged = c.submit_hypothesis("no idea").await.unwrap();
    assert!(judged.completed);
}

#[tokio::test(start_paused = true)]
async fn test_timeout_during_query_call_both_apply() {
    let h = start_session(10, 3).await;
    let c = h.controller.clone();
    let started = Instant::now();
    h.oracle.set_query_delay(Duration::from_secs(5)).await;

    tokio::time::advance(Duration::from_secs(178)).await;
    let query = {
        let c = c.clone();
        tokio::spawn(async move { c.submit_query(inputs(&["1"])).await })
    };

    let fired = c.wait_for_deadline().await.unwrap();
    assert_eq!(fired, started + ROUND);
    assert!(matches!(
        c.handle_timeout(fired).await.unwrap(),
        TimeoutOutcome::Charged { charged: 3, .. }
    ));

    let outcome = query.await.unwrap().unwrap();
    assert_eq!(outcome.queries_used, 4);

    let snapshot = c.snapshot().await;
    assert_eq!(snapshot.session.failed_queries(), 3);
    assert_eq!(
        snapshot.deadline,
        Some(started + Duration::from_secs(183) + ROUND)
    );
    assert_eq!(
        c.handle_timeout(started + Duration::from_secs(180) + ROUND)
            .await
            .unwrap(),
        TimeoutOutcome::Stale
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_during_last_query_keeps_its_results() {
    let h = start_session(10, 3).await;
    let c = h.controller.clone();
    c.submit_query(inputs(&["1", "2", "3"])).await.unwrap();
    c.submit_query(inputs(&["4", "5"])).await.unwrap();

    let fired = c.wait_for_deadline().await.unwrap();
    assert_eq!(
        c.handle_timeout(fired).await.unwrap(),
        TimeoutOutcome::Charged {
            charged: 3,
            queries_used: 8,
            remaining: 2
        }
    );

    h.oracle.set_query_delay(Duration::from_secs(5)).await;
    tokio::time::advance(ROUND - Duration::from_secs(2)).await;
    let query = {
        let c = c.clone();
        tokio::spawn(async move { c.submit_query(inputs(&["9", "10"])).await })
    };

    let fired = c.wait_for_deadline().await.unwrap();
    assert_eq!(
        c.handle_timeout(fired).await.unwrap(),
        TimeoutOutcome::Charged {
            charged: 0,
            queries_used: 8,
            remaining: 2
        }
    );

    let outcome = query.await.unwrap().unwrap();
    assert_eq!(outcome.charged, 2);
    assert_eq!(outcome.queries_used, 10);
    assert_eq!(outcome.remaining, 0);

    let snapshot = c.snapshot().await;
    assert_eq!(snapshot.session.failed_queries(), 3);
    assert_eq!(snapshot.session.query_history().len(), 10);
    assert_eq!(snapshot.session.query_history()[9].input, "10");
    assert_eq!(h.oracle.calls().await.query, 3);
}

#[tokio::test]
async fn test_lexical_rule_session() {
    let oracle = MockOracle::new(6, 2)
        .with_rule(|input: &str| Value::from(input.chars().rev().collect::<String>()));
    let store = Arc::new(InMemoryProgressStore::new());
    let descriptor = TaskDescriptor::new("reverse_word", TaskCategory::Lexical, 6, 2);
    let c = TaskSessionController::start(
        Arc::new(oracle.clone()),
        store.clone(),
        "ada",
        &descriptor,
        ROUND,
    )
    .await
    .unwrap();

    let outcome = c.submit_query(inputs(&["abc", "level"])).await.unwrap();
    let outputs: Vec<_> = outcome.results.iter().map(|r| r.output.clone()).collect();
    assert_eq!(outputs, vec![json!("cba"), json!("level")]);

    oracle.push_hypothesis_reply(true, "Correct").await;
    let judged = c.submit_hypothesis("reverses the word").await.unwrap();
    assert!(judged.completed);
    assert_eq!(oracle.hypotheses().await, vec!["reverses the word".to_string()]);
    assert_eq!(
        store.get(&progress_user_key("ada")).await.unwrap()["reverse_word"],
        ProgressRecord::completed("reverse_word", 2, 6, true)
    );
}

#[tokio::test(start_paused = true)]
async fn test_end_task_during_hypothesis_wins() {
    let h = start_session(10, 3).await;
    let c = h.controller.clone();
    h.oracle.set_hypothesis_delay(Duration::from_secs(2)).await;
    h.oracle.push_hypothesis_reply(true, "Correct").await;

    let pending = {
        let c = c.clone();
        tokio::spawn(async move { c.submit_hypothesis("odd numbers").await })
    };
    tokio::task::yield_now().await;

    let err = c.submit_hypothesis("odd numbers").await.unwrap_err();
    assert!(matches!(err, SessionError::CallInFlight("hypothesis")));

    assert_eq!(
        c.end_task().await.unwrap(),
        EndOutcome::Ended {
            status: SessionStatus::Abandoned
        }
    );

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, SessionError::SessionEnded));
    assert_eq!(h.store.write_count().await, 0);
    assert!(c.snapshot().await.session.submission_history().is_empty());
}
