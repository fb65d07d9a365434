// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::test_helpers::{drain, transitions, Harness};
use hl_core::test_support::{error_result, session, session_with_status, success_result};

fn pair(old: &str, new: &str) -> (String, String) {
    (old.to_string(), new.to_string())
}

fn sid(id: &str) -> SessionId {
    SessionId::new(id)
}

#[tokio::test]
async fn running_then_completed_publishes_each_step() {
    let h = Harness::new();
    h.store.create_session(&session("s1")).unwrap();
    let mut sub = h.subscribe();

    h.lifecycle.transition_to_running(&sid("s1")).unwrap();
    h.lifecycle
        .complete_session(&sid("s1"), &success_result(0.002, 1000, 1), Duration::from_secs(2))
        .unwrap();

    let events = drain(&mut sub);
    assert_eq!(
        transitions(&events),
        vec![pair("starting", "running"), pair("running", "completed")]
    );
    assert_eq!(events[0].run_id(), Some("run-s1"));

    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.cost_usd, Some(0.002));
    assert_eq!(row.duration_ms, Some(1000));
    assert_eq!(row.num_turns, Some(1));
    assert_eq!(row.total_tokens, Some(150));
    assert_eq!(row.result_content.as_deref(), Some("done"));
    assert!(row.completed_at.is_some());
}

#[tokio::test]
async fn elapsed_time_fills_missing_duration() {
    let h = Harness::new();
    h.store.create_session(&session("s1")).unwrap();
    let result = ResultEvent {
        subtype: "success".into(),
        ..ResultEvent::default()
    };
    h.lifecycle
        .complete_session(&sid("s1"), &result, Duration::from_millis(1500))
        .unwrap();
    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.duration_ms, Some(1500));
}

#[tokio::test]
async fn error_result_fails_the_session() {
    let h = Harness::new();
    h.store
        .create_session(&session_with_status("s1", SessionStatus::Running))
        .unwrap();
    h.lifecycle
        .handle_session_result_error(&sid("s1"), &error_result("rate limited"))
        .unwrap();

    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.status, SessionStatus::Failed);
    assert_eq!(row.error_message.as_deref(), Some("rate limited"));
}

#[tokio::test]
async fn interrupt_then_error_completes_with_interrupt_message() {
    let h = Harness::new();
    h.store
        .create_session(&session_with_status("s1", SessionStatus::Running))
        .unwrap();
    let mut sub = h.subscribe();

    h.lifecycle.transition_to_completing(&sid("s1")).unwrap();
    assert_eq!(h.store.get_session(&sid("s1")).unwrap().completed_at, None);

    h.clock.advance(chrono::Duration::seconds(3));
    h.lifecycle
        .handle_session_error(&sid("s1"), &"signal: 2 (SIGINT)")
        .unwrap();

    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.completed_at, Some(h.clock.now()));
    assert!(row.error_message.unwrap().contains("interrupt"));
    assert_eq!(
        transitions(&drain(&mut sub)),
        vec![pair("running", "completing"), pair("completing", "completed")]
    );
}

#[tokio::test]
async fn natural_result_after_interrupt_completes() {
    let h = Harness::new();
    h.store
        .create_session(&session_with_status("s1", SessionStatus::Running))
        .unwrap();
    h.lifecycle.transition_to_completing(&sid("s1")).unwrap();
    h.clock.advance(chrono::Duration::seconds(5));
    h.lifecycle
        .handle_session_result_error(&sid("s1"), &error_result("aborted"))
        .unwrap();

    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.completed_at, Some(h.clock.now()));
    assert_eq!(row.error_message.as_deref(), Some(INTERRUPT_MESSAGE));
}

#[tokio::test]
async fn process_error_fails_running_session() {
    let h = Harness::new();
    h.store
        .create_session(&session_with_status("s1", SessionStatus::Running))
        .unwrap();
    h.lifecycle
        .handle_session_error(&sid("s1"), &"process was killed")
        .unwrap();

    let row = h.store.get_session(&sid("s1")).unwrap();
    assert_eq!(row.status, SessionStatus::Failed);
    assert_eq!(row.error_message.as_deref(), Some("process was killed"));
}

#[yare::parameterized(
    completed   = { SessionStatus::Completed },
    failed      = { SessionStatus::Failed },
    interrupted = { SessionStatus::Interrupted },
)]
fn terminal_sessions_never_move(status: SessionStatus) {
    let h = Harness::new();
    h.store
        .create_session(&session_with_status("s1", status))
        .unwrap();

    h.lifecycle.transition_to_running(&sid("s1")).unwrap();
    h.lifecycle.transition_to_completing(&sid("s1")).unwrap();
    h.lifecycle.handle_session_error(&sid("s1"), &"late").unwrap();
    h.lifecycle
        .record_result(&sid("s1"), &error_result("late"), None)
        .unwrap();

    assert_eq!(h.status("s1"), status);
}

#[tokio::test]
async fn repeated_transition_publishes_once() {
    let h = Harness::new();
    h.store.create_session(&session("s1")).unwrap();
    let mut sub = h.subscribe();
    h.lifecycle.transition_to_running(&sid("s1")).unwrap();
    h.lifecycle.transition_to_running(&sid("s1")).unwrap();
    assert_eq!(transitions(&drain(&mut sub)).len(), 1);
}

#[tokio::test]
async fn cleanup_clears_pending_query() {
    let h = Harness::new();
    h.injector.store_pending(&sid("s1"), "q");
    h.lifecycle.cleanup(&sid("s1"));
    h.lifecycle.cleanup(&sid("s1"));
    assert!(!h.injector.has_pending(&sid("s1")));
}

#[tokio::test]
async fn missing_session_is_not_found() {
    let h = Harness::new();
    let err = h.lifecycle.transition_to_running(&sid("nope")).unwrap_err();
    assert!(err.is_not_found());
}
