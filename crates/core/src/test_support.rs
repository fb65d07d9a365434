// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{
    AssistantSessionId, ConversationEvent, ContentBlock, ResultEvent, Role, RunId, Session,
    SessionId, SessionStatus, StreamEvent, TokenUsage,
};
use chrono::{DateTime, Utc};

/// Fixed instant used by builders (2026-01-01T00:00:00Z)
pub fn epoch() -> DateTime<Utc> {
    DateTime::from_timestamp(1_767_225_600, 0).unwrap_or_default()
}

// ── Session builders ────────────────────────────────────────────────────────

pub fn session(id: &str) -> Session {
    let mut session = Session::new(SessionId::new(id), RunId::new(format!("run-{id}")), epoch());
    session.query = "test query".to_string();
    session.summary = "test query".to_string();
    session.working_dir = "/tmp".to_string();
    session
}

pub fn session_with_status(id: &str, status: SessionStatus) -> Session {
    let mut session = session(id);
    session.status = status;
    if status.is_terminal() {
        session.completed_at = Some(epoch());
    }
    session
}

pub fn draft_session(id: &str) -> Session {
    let mut session = session(id);
    session.status = SessionStatus::Draft;
    session.query = String::new();
    session.summary = String::new();
    session
}

// ── Conversation builders ───────────────────────────────────────────────────

pub fn user_message(session_id: &str, assistant_id: &str, content: &str) -> ConversationEvent {
    ConversationEvent::message(
        SessionId::new(session_id),
        AssistantSessionId::new(assistant_id),
        Role::User,
        content,
    )
    .at(epoch())
}

pub fn assistant_message(session_id: &str, assistant_id: &str, content: &str) -> ConversationEvent {
    ConversationEvent::message(
        SessionId::new(session_id),
        AssistantSessionId::new(assistant_id),
        Role::Assistant,
        content,
    )
    .at(epoch())
}

pub fn tool_call(
    session_id: &str,
    assistant_id: &str,
    tool_id: &str,
    tool_name: &str,
) -> ConversationEvent {
    ConversationEvent::tool_call(
        SessionId::new(session_id),
        AssistantSessionId::new(assistant_id),
        tool_id,
        tool_name,
        "{}",
    )
    .at(epoch())
}

pub fn tool_result(
    session_id: &str,
    assistant_id: &str,
    tool_id: &str,
    content: &str,
) -> ConversationEvent {
    ConversationEvent::tool_result(
        SessionId::new(session_id),
        AssistantSessionId::new(assistant_id),
        tool_id,
        content,
    )
    .at(epoch())
}

// ── Stream scripts ──────────────────────────────────────────────────────────

pub fn success_result(cost_usd: f64, duration_ms: u64, num_turns: u32) -> ResultEvent {
    ResultEvent {
        subtype: "success".to_string(),
        is_error: false,
        cost_usd: Some(cost_usd),
        duration_ms: Some(duration_ms),
        num_turns: Some(num_turns),
        result: Some("done".to_string()),
        usage: Some(TokenUsage {
            input_tokens: 100,
            output_tokens: 50,
            ..TokenUsage::default()
        }),
        ..ResultEvent::default()
    }
}

pub fn error_result(message: &str) -> ResultEvent {
    ResultEvent {
        subtype: "error_during_execution".to_string(),
        is_error: true,
        error: Some(message.to_string()),
        ..ResultEvent::default()
    }
}

/// The canonical "happy stream": session created, echoed query, reply,
/// one `Read` tool round trip, success.
pub fn happy_stream(assistant_id: &str, query: &str) -> Vec<StreamEvent> {
    vec![
        StreamEvent::session_created(assistant_id),
        StreamEvent::text(assistant_id, Role::User, query),
        StreamEvent::text(assistant_id, Role::Assistant, "Here you go"),
        StreamEvent::tool_use(
            assistant_id,
            "T1",
            "Read",
            serde_json::json!({"file_path": "x.txt"}),
        ),
        StreamEvent::tool_result(assistant_id, "T1", "hi"),
        StreamEvent::result(assistant_id, success_result(0.002, 1000, 1)),
    ]
}

pub fn thinking(assistant_id: &str, text: &str) -> StreamEvent {
    StreamEvent::message(
        assistant_id,
        Role::Assistant,
        vec![ContentBlock::Thinking {
            thinking: text.to_string(),
        }],
    )
}
