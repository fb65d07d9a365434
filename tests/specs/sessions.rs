// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session recording specs: what a launched or continued session leaves
//! behind in the database.

use crate::prelude::*;
use hl_adapters::FakeScript;
use hl_core::test_support::{happy_stream, success_result};
use hl_core::{AssistantSessionId, Role, SessionStatus, StreamEvent};
use hl_engine::ContinueConfig;
use hl_storage::Store;

#[tokio::test]
async fn recorded_conversation_survives_reopening_the_database() {
    let h = Harness::new();
    h.provider
        .push_script(FakeScript::new(happy_stream("A1", "Write hello world")));

    let session = h
        .manager
        .launch(&h.scope, h.request("Write hello world"))
        .await
        .unwrap();
    h.wait_for_cleanup(&session.id).await;

    let reopened = Store::open(&h.db_path()).unwrap();
    let row = reopened.get_session(&session.id).unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.query, "Write hello world");
    assert_eq!(row.run_id, session.run_id);

    let events = reopened
        .get_conversation(&AssistantSessionId::new("A1"))
        .unwrap();
    assert_eq!(events.len(), 5);
    assert!(events[0].is_user_message());
    let call = events.iter().find(|e| e.tool_id.as_deref() == Some("T1")).unwrap();
    assert!(call.is_completed);
    assert_eq!(call.tool_name.as_deref(), Some("Read"));
    let result = events
        .iter()
        .find(|e| e.tool_result_for_id.as_deref() == Some("T1"))
        .unwrap();
    assert_eq!(result.tool_result_content.as_deref(), Some("hi"));
}

#[tokio::test]
async fn concurrent_sessions_keep_dense_sequences() {
    let h = Harness::new();
    for n in 1..=3 {
        h.provider.push_script(FakeScript::new(happy_stream(
            &format!("A{n}"),
            &format!("query {n}"),
        )));
    }

    let launches = (1..=3).map(|n| {
        let manager = h.manager.clone();
        let scope = h.scope.clone();
        let request = h.request(&format!("query {n}"));
        tokio::spawn(async move { manager.launch(&scope, request).await.unwrap() })
    });
    let mut sessions = Vec::new();
    for launch in launches {
        sessions.push(launch.await.unwrap());
    }
    for session in &sessions {
        h.wait_for_cleanup(&session.id).await;
    }

    for session in &sessions {
        let row = h.store.get_session(&session.id).unwrap();
        assert_eq!(row.status, SessionStatus::Completed);
        let events = h.store.get_conversation(&row.assistant_session_id).unwrap();
        let sequences: Vec<i64> = events.iter().map(|e| e.sequence).collect();
        let expected: Vec<i64> = (1..=events.len() as i64).collect();
        assert_eq!(sequences, expected, "session {}", row.id);
        assert_eq!(events[0].content, row.query);
    }
}

#[tokio::test]
async fn continued_session_reads_back_the_whole_chain() {
    let h = Harness::new();
    h.provider
        .push_script(FakeScript::new(happy_stream("A1", "first question")));
    let parent = h
        .manager
        .launch(&h.scope, h.request("first question"))
        .await
        .unwrap();
    h.wait_for_cleanup(&parent.id).await;

    h.provider.push_script(FakeScript::new(vec![
        StreamEvent::session_created("A2"),
        StreamEvent::text("A2", Role::Assistant, "and again"),
        StreamEvent::result("A2", success_result(0.001, 500, 1)),
    ]));
    let child = h
        .manager
        .continue_session(&h.scope, ContinueConfig::new(parent.id.clone(), "second question"))
        .await
        .unwrap();
    h.wait_for_cleanup(&child.id).await;

    assert_eq!(h.status(&child.id), SessionStatus::Completed);
    assert_eq!(
        h.provider.launches()[1].session_id,
        "A1",
        "child resumes the parent's assistant session"
    );

    let chain = h.manager.get_session_conversation(&child.id).unwrap();
    let users: Vec<&str> = chain
        .iter()
        .filter(|e| e.is_user_message())
        .map(|e| e.content.as_str())
        .collect();
    assert_eq!(users, vec!["first question", "second question"]);
    assert_eq!(chain.last().unwrap().content, "and again");
}

#[tokio::test]
async fn draft_launches_later_with_its_prompt() {
    let h = Harness::new();
    let draft = h.manager.create_draft(h.request("")).unwrap();
    assert_eq!(h.status(&draft.id), SessionStatus::Draft);
    assert!(h.provider.launches().is_empty());

    h.provider
        .push_script(FakeScript::new(happy_stream("A1", "from the draft")));
    h.manager
        .launch_draft(&h.scope, &draft.id, "from the draft", false)
        .await
        .unwrap();
    h.wait_for_cleanup(&draft.id).await;

    let row = h.store.get_session(&draft.id).unwrap();
    assert_eq!(row.status, SessionStatus::Completed);
    assert_eq!(row.query, "from the draft");
    assert_eq!(row.summary, "from the draft");
}
