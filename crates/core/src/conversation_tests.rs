// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ToolApprovalStatus::*;

fn ids() -> (SessionId, AssistantSessionId) {
    (SessionId::new("sess-1"), AssistantSessionId::new("asst-1"))
}

#[yare::parameterized(
    unset_to_pending     = { None,            Pending,  true },
    unset_to_approved    = { None,            Approved, false },
    pending_to_approved  = { Some(Pending),   Approved, true },
    pending_to_denied    = { Some(Pending),   Denied,   true },
    pending_to_pending   = { Some(Pending),   Pending,  false },
    approved_to_denied   = { Some(Approved),  Denied,   false },
    denied_to_pending    = { Some(Denied),    Pending,  false },
)]
fn approval_status_progression(
    current: Option<ToolApprovalStatus>,
    next: ToolApprovalStatus,
    allowed: bool,
) {
    assert_eq!(ToolApprovalStatus::can_advance(current, next), allowed);
}

#[yare::parameterized(
    message     = { ConversationEventType::Message },
    tool_call   = { ConversationEventType::ToolCall },
    tool_result = { ConversationEventType::ToolResult },
    thinking    = { ConversationEventType::Thinking },
    system      = { ConversationEventType::System },
)]
fn event_type_parses_its_own_name(kind: ConversationEventType) {
    assert_eq!(kind.as_str().parse::<ConversationEventType>().unwrap(), kind);
}

#[test]
fn tool_call_starts_pending_and_unapproved() {
    let (sid, aid) = ids();
    let event = ConversationEvent::tool_call(sid, aid, "T1", "Read", r#"{"file_path":"x"}"#);
    assert!(event.is_pending_tool_call());
    assert_eq!(event.approval_status, None);
    assert_eq!(event.tool_id.as_deref(), Some("T1"));
    assert_eq!(event.sequence, 0);
}

#[test]
fn user_message_detection() {
    let (sid, aid) = ids();
    assert!(ConversationEvent::message(sid.clone(), aid.clone(), Role::User, "hi").is_user_message());
    assert!(!ConversationEvent::message(sid.clone(), aid.clone(), Role::Assistant, "hi").is_user_message());
    assert!(!ConversationEvent::system(sid, aid, "hi").is_user_message());
}

#[test]
fn tool_result_serializes_without_absent_fields() {
    let (sid, aid) = ids();
    let event = ConversationEvent::tool_result(sid, aid, "T1", "");
    let json = serde_json::to_value(&event).unwrap();
    assert_eq!(json["tool_result_for_id"], "T1");
    // An empty result body is still present, distinct from a missing one
    assert_eq!(json["tool_result_content"], "");
    assert!(json.get("tool_id").is_none());
    assert!(json.get("approval_status").is_none());
}
