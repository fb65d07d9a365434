// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;
use hl_core::test_support::epoch;
use serde_json::json;

fn store() -> Store {
    Store::in_memory().unwrap()
}

fn pending(id: &str, session: &str, offset_secs: i64) -> Approval {
    Approval::pending(
        ApprovalId::new(id),
        format!("run-{session}").into(),
        SessionId::new(session),
        "Bash",
        json!({"command": "rm -rf build"}),
        epoch() + Duration::seconds(offset_secs),
    )
    .with_tool_use_id(Some("T1".into()))
}

#[test]
fn create_then_get_round_trips() {
    let store = store();
    let approval = pending("ap-1", "s1", 0);
    store.create_approval(&approval).unwrap();
    assert_eq!(store.get_approval(&approval.id).unwrap(), approval);
}

#[test]
fn missing_approval_is_not_found() {
    let err = store().get_approval(&"ghost".into()).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "approval", .. }));

    let err = store()
        .update_approval_response(&"ghost".into(), ApprovalStatus::LocalApproved, None, epoch())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn decision_is_recorded_with_comment() {
    let store = store();
    store.create_approval(&pending("ap-1", "s1", 0)).unwrap();
    let at = epoch() + Duration::seconds(30);

    let decided = store
        .update_approval_response(&"ap-1".into(), ApprovalStatus::LocalDenied, Some("too risky"), at)
        .unwrap();
    assert_eq!(decided.status, ApprovalStatus::LocalDenied);
    assert_eq!(store.get_approval(&"ap-1".into()).unwrap(), decided);
    assert_eq!(decided.comment.as_deref(), Some("too risky"));
    assert_eq!(decided.responded_at, Some(at));
}

#[yare::parameterized(
    approved_then_denied  = { ApprovalStatus::LocalApproved, ApprovalStatus::LocalDenied },
    denied_then_approved  = { ApprovalStatus::LocalDenied,   ApprovalStatus::LocalApproved },
    approved_twice        = { ApprovalStatus::LocalApproved, ApprovalStatus::LocalApproved },
)]
fn second_decision_is_rejected(first: ApprovalStatus, second: ApprovalStatus) {
    let store = store();
    store.create_approval(&pending("ap-1", "s1", 0)).unwrap();
    store
        .update_approval_response(&"ap-1".into(), first, None, epoch())
        .unwrap();

    let err = store
        .update_approval_response(&"ap-1".into(), second, Some("late"), epoch())
        .unwrap_err();
    assert!(matches!(
        err,
        StoreError::AlreadyDecided { current_status, .. } if current_status == first
    ));

    let stored = store.get_approval(&"ap-1".into()).unwrap();
    assert_eq!(stored.status, first);
    assert_eq!(stored.comment, None);
}

#[test]
fn pending_is_not_a_response() {
    let store = store();
    store.create_approval(&pending("ap-1", "s1", 0)).unwrap();
    let err = store
        .update_approval_response(&"ap-1".into(), ApprovalStatus::LocalPending, None, epoch())
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidStatus(_)));
}

#[test]
fn pending_list_excludes_decided_and_other_sessions() {
    let store = store();
    store.create_approval(&pending("ap-late", "s1", 20)).unwrap();
    store.create_approval(&pending("ap-early", "s1", 10)).unwrap();
    store.create_approval(&pending("ap-done", "s1", 5)).unwrap();
    store.create_approval(&pending("ap-other", "s2", 0)).unwrap();
    store
        .update_approval_response(&"ap-done".into(), ApprovalStatus::LocalApproved, None, epoch())
        .unwrap();

    let ids: Vec<String> = store
        .list_pending_approvals(&"s1".into())
        .unwrap()
        .into_iter()
        .map(|a| a.id.to_string())
        .collect();
    assert_eq!(ids, vec!["ap-early", "ap-late"]);
}
