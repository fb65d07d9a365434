// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hl_core::SystemEvent;
use serde_json::json;

fn feed(stream: &mut OpenCodeStream, lines: &[Value]) -> Vec<StreamEvent> {
    lines
        .iter()
        .flat_map(|l| stream.parse_line(&l.to_string()).unwrap())
        .collect()
}

fn step_finish(cost: f64, input: u64, output: u64) -> Value {
    json!({"type": "step_finish", "sessionID": "ses_1", "part": {
        "type": "step-finish", "cost": cost,
        "tokens": {"input": input, "output": output, "reasoning": 0, "cache": {"read": 0, "write": 0}}
    }})
}

#[test]
fn first_session_id_is_announced() {
    let mut stream = OpenCodeStream::default();
    let events = feed(
        &mut stream,
        &[json!({"type": "step_start", "sessionID": "ses_1", "part": {}})],
    );
    assert_eq!(events[0].kind, StreamEventKind::System(SystemEvent::SessionCreated));
    assert_eq!(events[1].kind, StreamEventKind::StepStart);
    assert_eq!(events[1].assistant_session_id, "ses_1");
}

#[test]
fn completed_tool_yields_call_and_result() {
    let mut stream = OpenCodeStream::default();
    let events = feed(
        &mut stream,
        &[json!({"type": "tool_use", "sessionID": "ses_1", "part": {
            "type": "tool", "callID": "call_1", "tool": "read",
            "state": {"status": "completed", "input": {"filePath": "x.txt"}, "output": "hi"}
        }})],
    );
    assert_eq!(events.len(), 3);
    assert_eq!(
        events[1],
        StreamEvent::tool_use("ses_1", "call_1", "Read", json!({"filePath": "x.txt"}))
    );
    assert_eq!(events[2], StreamEvent::tool_result("ses_1", "call_1", "hi"));
}

#[test]
fn failed_tool_result_is_flagged() {
    let mut stream = OpenCodeStream::default();
    let events = feed(
        &mut stream,
        &[json!({"type": "tool_use", "sessionID": "ses_1", "part": {
            "callID": "c", "tool": "bash", "state": {"status": "error", "error": "exit 2"}
        }})],
    );
    let StreamEventKind::Message(message) = &events[2].kind else {
        panic!("expected message");
    };
    assert!(matches!(
        &message.content[0],
        ContentBlock::ToolResult { is_error: true, content, .. } if content.as_text() == "exit 2"
    ));
}

#[test]
fn running_tool_has_no_result_yet() {
    let mut stream = OpenCodeStream::default();
    let events = feed(
        &mut stream,
        &[json!({"type": "tool_use", "sessionID": "ses_1", "part": {
            "callID": "c", "tool": "bash", "state": {"status": "running", "input": {}}
        }})],
    );
    assert_eq!(events.len(), 2);
}

#[test]
fn step_totals_roll_into_synthesized_result() {
    let mut stream = OpenCodeStream::default();
    feed(
        &mut stream,
        &[
            json!({"type": "text", "sessionID": "ses_1", "part": {"type": "text", "text": "first"}}),
            step_finish(0.01, 100, 20),
            json!({"type": "text", "sessionID": "ses_1", "part": {"type": "text", "text": "final answer"}}),
            step_finish(0.02, 50, 10),
        ],
    );
    let finished = stream.finish();
    let result = finished[0].as_result().unwrap();
    assert!(!result.is_error);
    assert_eq!(result.num_turns, Some(2));
    assert!((result.cost_usd.unwrap() - 0.03).abs() < 1e-9);
    assert_eq!(result.total_tokens(), Some(180));
    assert_eq!(result.result.as_deref(), Some("final answer"));
    assert_eq!(result.session_id.as_deref(), Some("ses_1"));
}

#[test]
fn error_line_makes_result_an_error() {
    let mut stream = OpenCodeStream::default();
    feed(
        &mut stream,
        &[json!({"type": "error", "sessionID": "ses_1",
                 "error": {"name": "ProviderAuthError", "data": {"message": "no credentials"}}})],
    );
    let finished = stream.finish();
    let result = finished[0].as_result().unwrap();
    assert!(result.is_error);
    assert_eq!(result.error_message().as_deref(), Some("no credentials"));
}

#[test]
fn empty_stream_synthesizes_nothing() {
    assert!(OpenCodeStream::default().finish().is_empty());
}

#[test]
fn reasoning_becomes_thinking() {
    let mut stream = OpenCodeStream::default();
    let events = feed(
        &mut stream,
        &[json!({"type": "reasoning", "sessionID": "ses_1", "part": {"text": "pondering"}})],
    );
    let StreamEventKind::Message(message) = &events[1].kind else {
        panic!("expected message");
    };
    assert_eq!(
        message.content,
        vec![ContentBlock::Thinking {
            thinking: "pondering".into()
        }]
    );
}

#[yare::parameterized(
    read      = { "read",      "Read" },
    multiedit = { "multiedit", "MultiEdit" },
    custom    = { "mcp_tool",  "mcp_tool" },
)]
fn tool_names_are_normalized(raw: &str, expected: &str) {
    assert_eq!(normalize_tool_name(raw), expected);
}
