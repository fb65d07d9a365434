// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval specs: a tool call in a live session waits on a human decision.

use crate::prelude::*;
use hl_adapters::FakeScript;
use hl_core::{ApprovalDecision, EventFilter, Role, StreamEvent, ToolApprovalStatus};
use hl_engine::SettingsUpdate;
use serde_json::json;
use serial_test::serial;
use std::time::Duration;

/// Reports its id, asks for a Bash tool call and keeps running
fn bash_call(asid: &str) -> FakeScript {
    FakeScript::new(vec![
        StreamEvent::session_created(asid),
        StreamEvent::text(asid, Role::Assistant, "running a command"),
        StreamEvent::tool_use(asid, "T1", "Bash", json!({"command": "ls"})),
    ])
    .held_open()
}

fn tool_row(h: &Harness, asid: &str) -> Option<hl_core::ConversationEvent> {
    h.store
        .get_conversation(&hl_core::AssistantSessionId::new(asid))
        .unwrap()
        .into_iter()
        .find(|e| e.tool_id.as_deref() == Some("T1"))
}

#[tokio::test]
#[serial(auto_deny)]
async fn approval_request_waits_for_the_decision() {
    std::env::remove_var("MCP_AUTO_DENY_ALL");
    let h = Harness::new();
    h.provider.push_script(bash_call("A1"));
    let session = h.manager.launch(&h.scope, h.request("list files")).await.unwrap();
    assert!(wait_for(|| tool_row(&h, "A1").is_some()).await);
    let mut resolved = h
        .bus
        .subscribe(&h.scope, EventFilter::for_session(session.id.as_str()));

    let approvals = h.manager.approvals().clone();
    let scope = h.scope.clone();
    let run_id = session.run_id.as_str().to_string();
    let request = tokio::spawn(async move {
        approvals
            .request_approval(&scope, &run_id, "Bash", json!({"command": "ls"}), Some("T1".into()))
            .await
    });

    assert!(wait_for(|| {
        h.manager
            .approvals()
            .list_pending_approvals(&session.id)
            .unwrap()
            .len()
            == 1
    })
    .await);
    let pending = h
        .manager
        .approvals()
        .list_pending_approvals(&session.id)
        .unwrap();
    let row = tool_row(&h, "A1").unwrap();
    assert_eq!(row.approval_status, Some(ToolApprovalStatus::Pending));
    assert_eq!(row.approval_id, Some(pending[0].id.clone()));

    h.manager
        .approvals()
        .decide_approval(&pending[0].id, ApprovalDecision::Approve, Some("fine"))
        .unwrap();

    let payload = tokio::time::timeout(Duration::from_secs(2), request)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(
        payload,
        json!({"behavior": "allow", "updatedInput": {"command": "ls"}})
    );
    assert_eq!(
        tool_row(&h, "A1").unwrap().approval_status,
        Some(ToolApprovalStatus::Approved)
    );

    let mut kinds = Vec::new();
    while let Ok(event) = resolved.events.try_recv() {
        kinds.push(event.event_type.as_str());
    }
    assert!(kinds.contains(&"new_approval"), "{kinds:?}");
    assert!(kinds.contains(&"approval_resolved"), "{kinds:?}");

    h.manager.stop_all(Duration::from_millis(500)).await.unwrap();
}

#[tokio::test]
#[serial(auto_deny)]
async fn elevated_session_is_approved_without_asking() {
    std::env::remove_var("MCP_AUTO_DENY_ALL");
    let h = Harness::new();
    h.provider.push_script(bash_call("A1"));
    let session = h.manager.launch(&h.scope, h.request("list files")).await.unwrap();
    assert!(wait_for(|| tool_row(&h, "A1").is_some()).await);
    h.manager
        .update_session_settings(
            &session.id,
            SettingsUpdate {
                dangerously_skip_permissions: Some(true),
                dangerously_skip_permissions_timeout: Some(Duration::from_secs(600)),
                ..SettingsUpdate::default()
            },
        )
        .unwrap();

    let payload = tokio::time::timeout(
        Duration::from_secs(2),
        h.manager.approvals().request_approval(
            &h.scope,
            session.run_id.as_str(),
            "Bash",
            json!({"command": "ls"}),
            Some("T1".into()),
        ),
    )
    .await
    .unwrap()
    .unwrap();

    assert_eq!(payload["behavior"], "allow");
    assert_eq!(
        tool_row(&h, "A1").unwrap().approval_status,
        Some(ToolApprovalStatus::Approved)
    );
    h.manager.stop_all(Duration::from_millis(500)).await.unwrap();
}

#[tokio::test]
#[serial(auto_deny)]
async fn auto_deny_toggle_short_circuits() {
    std::env::set_var("MCP_AUTO_DENY_ALL", "true");
    let h = Harness::new();

    let payload = h
        .manager
        .approvals()
        .request_approval(&h.scope, "no-such-run", "Bash", json!({}), None)
        .await
        .unwrap();
    std::env::remove_var("MCP_AUTO_DENY_ALL");

    assert_eq!(
        payload,
        json!({"behavior": "deny", "message": "Auto-denied for testing"})
    );
}
