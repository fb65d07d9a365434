// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Duration;
use hl_core::test_support::{self, epoch};
use hl_core::{ProviderKind, SessionStatus};

fn store() -> Store {
    Store::in_memory().unwrap()
}

fn full_session(id: &str) -> Session {
    let mut s = test_support::session(id);
    s.assistant_session_id = "asst-x".into();
    s.parent_session_id = Some(SessionId::new("parent"));
    s.provider = ProviderKind::OpenCode;
    s.title = "Refactor the parser".into();
    s.model = "opus".into();
    s.max_turns = Some(7);
    s.system_prompt = "S".into();
    s.append_system_prompt = "A".into();
    s.custom_instructions = "C".into();
    s.permission_prompt_tool = "mcp__approvals__request".into();
    s.allowed_tools = vec!["Read".into(), "Write".into()];
    s.disallowed_tools = vec!["Bash".into()];
    s.auto_accept_edits = true;
    s.dangerously_skip_permissions = true;
    s.dangerously_skip_permissions_expires_at = Some(epoch() + Duration::minutes(15));
    s.cost_usd = Some(0.25);
    s.total_tokens = Some(1234);
    s.duration_ms = Some(9000);
    s.num_turns = Some(3);
    s.result_content = Some(String::new());
    s.error_message = None;
    s
}

#[test]
fn create_then_get_round_trips() {
    let store = store();
    let session = full_session("s1");
    store.create_session(&session).unwrap();
    assert_eq!(store.get_session(&session.id).unwrap(), session);
}

#[test]
fn missing_session_is_not_found() {
    let err = store().get_session(&SessionId::new("nope")).unwrap_err();
    assert!(matches!(err, StoreError::NotFound { kind: "session", ref id } if id == "nope"));
}

#[test]
fn lookup_by_run_id_returns_none_when_absent() {
    let store = store();
    store.create_session(&test_support::session("s1")).unwrap();
    assert_eq!(store.get_session_by_run_id("run-s1").unwrap().map(|s| s.id), Some("s1".into()));
    assert!(store.get_session_by_run_id("run-zzz").unwrap().is_none());
}

#[test]
fn run_id_is_unique() {
    let store = store();
    store.create_session(&test_support::session("s1")).unwrap();
    let mut dup = test_support::session("s2");
    dup.run_id = "run-s1".into();
    assert!(matches!(store.create_session(&dup), Err(StoreError::Sqlite(_))));
}

#[test]
fn partial_update_touches_only_given_fields() {
    let store = store();
    let session = full_session("s1");
    store.create_session(&session).unwrap();

    let later = epoch() + Duration::seconds(5);
    store
        .update_session(
            &session.id,
            &SessionUpdate {
                model: Some("sonnet".into()),
                last_activity_at: Some(later),
                ..SessionUpdate::default()
            },
        )
        .unwrap();

    let got = store.get_session(&session.id).unwrap();
    assert_eq!(got.model, "sonnet");
    assert_eq!(got.last_activity_at, later);
    assert_eq!(got.system_prompt, "S");
    assert_eq!(got.allowed_tools, session.allowed_tools);
}

#[test]
fn update_of_missing_session_is_not_found() {
    let err = store()
        .update_session(&"ghost".into(), &SessionUpdate::status(SessionStatus::Running))
        .unwrap_err();
    assert!(err.is_not_found());

    let err = store()
        .update_session(&"ghost".into(), &SessionUpdate::default())
        .unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn assistant_session_id_is_write_once() {
    let store = store();
    let session = test_support::session("s1");
    store.create_session(&session).unwrap();

    let set = |id: &str| SessionUpdate {
        assistant_session_id: Some(id.into()),
        ..SessionUpdate::default()
    };
    store.update_session(&session.id, &set("first")).unwrap();
    store.update_session(&session.id, &set("second")).unwrap();

    assert_eq!(
        store.get_session(&session.id).unwrap().assistant_session_id,
        "first"
    );
}

#[yare::parameterized(
    completed   = { SessionStatus::Completed },
    failed      = { SessionStatus::Failed },
    interrupted = { SessionStatus::Interrupted },
)]
fn terminal_status_is_sticky(terminal: SessionStatus) {
    let store = store();
    let session = test_support::session_with_status("s1", terminal);
    store.create_session(&session).unwrap();

    store
        .update_session(&session.id, &SessionUpdate::status(SessionStatus::Running))
        .unwrap();
    assert_eq!(store.get_session(&session.id).unwrap().status, terminal);
}

#[test]
fn completing_can_still_complete() {
    let store = store();
    let session = test_support::session_with_status("s1", SessionStatus::Completing);
    store.create_session(&session).unwrap();
    store
        .update_session(&session.id, &SessionUpdate::status(SessionStatus::Completed))
        .unwrap();
    assert_eq!(
        store.get_session(&session.id).unwrap().status,
        SessionStatus::Completed
    );
}

#[test]
fn expiry_can_be_cleared() {
    let store = store();
    let session = full_session("s1");
    store.create_session(&session).unwrap();
    store
        .update_session(
            &session.id,
            &SessionUpdate {
                dangerously_skip_permissions: Some(false),
                dangerously_skip_permissions_expires_at: Some(None),
                ..SessionUpdate::default()
            },
        )
        .unwrap();
    let got = store.get_session(&session.id).unwrap();
    assert!(!got.dangerously_skip_permissions);
    assert_eq!(got.dangerously_skip_permissions_expires_at, None);
}

#[test]
fn list_orders_by_recent_activity() {
    let store = store();
    for (id, offset) in [("old", 0), ("new", 60), ("mid", 30)] {
        let mut s = test_support::session(id);
        s.last_activity_at = epoch() + Duration::seconds(offset);
        store.create_session(&s).unwrap();
    }
    let ids: Vec<String> = store
        .list_sessions()
        .unwrap()
        .into_iter()
        .map(|s| s.id.to_string())
        .collect();
    assert_eq!(ids, vec!["new", "mid", "old"]);
}

#[test]
fn title_search_is_case_insensitive_substring() {
    let store = store();
    for (id, title) in [("a", "Fix Login Bug"), ("b", "add logging"), ("c", "unrelated")] {
        let mut s = test_support::session(id);
        s.title = title.into();
        store.create_session(&s).unwrap();
    }
    let mut ids: Vec<String> = store
        .search_sessions_by_title("LOG", 0)
        .unwrap()
        .into_iter()
        .map(|s| s.id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["a", "b"]);
}

#[yare::parameterized(
    zero_means_default = { 0,   SEARCH_DEFAULT_LIMIT },
    explicit           = { 3,   3 },
    capped             = { 500, SEARCH_MAX_LIMIT },
)]
fn title_search_limits(limit: usize, expected: usize) {
    let store = store();
    for i in 0..60 {
        let mut s = test_support::session(&format!("s{i}"));
        s.title = format!("task {i}");
        store.create_session(&s).unwrap();
    }
    assert_eq!(store.search_sessions_by_title("task", limit).unwrap().len(), expected);
}

#[test]
fn expired_elevations_are_found() {
    let store = store();
    let now = epoch() + Duration::hours(1);

    let mut expired = test_support::session("expired");
    expired.dangerously_skip_permissions = true;
    expired.dangerously_skip_permissions_expires_at = Some(now - Duration::seconds(1));

    let mut live = test_support::session("live");
    live.dangerously_skip_permissions = true;
    live.dangerously_skip_permissions_expires_at = Some(now + Duration::minutes(5));

    let mut forever = test_support::session("forever");
    forever.dangerously_skip_permissions = true;

    let mut off = test_support::session("off");
    off.dangerously_skip_permissions_expires_at = Some(now - Duration::minutes(5));

    for s in [&expired, &live, &forever, &off] {
        store.create_session(s).unwrap();
    }

    let found: Vec<String> = store
        .get_expired_dangerous_permissions_sessions(now)
        .unwrap()
        .into_iter()
        .map(|s| s.id.to_string())
        .collect();
    assert_eq!(found, vec!["expired"]);
}

#[test]
fn children_are_listed_oldest_first() {
    let store = store();
    store.create_session(&test_support::session("root")).unwrap();
    for (id, offset) in [("c2", 20), ("c1", 10)] {
        let mut s = test_support::session(id);
        s.parent_session_id = Some("root".into());
        s.created_at = epoch() + Duration::seconds(offset);
        store.create_session(&s).unwrap();
    }
    let ids: Vec<String> = store
        .list_child_sessions(&"root".into())
        .unwrap()
        .into_iter()
        .map(|s| s.id.to_string())
        .collect();
    assert_eq!(ids, vec!["c1", "c2"]);
}
