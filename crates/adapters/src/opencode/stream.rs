// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode `run --format json` dialect.
//!
//! Lines carry `type` (`step_start`, `text`, `reasoning`, `tool_use`,
//! `step_finish`, `error`), a `sessionID` and a `part`. OpenCode has no
//! terminal result line, so one is synthesized at EOF from the
//! accumulated `step_finish` totals.

use crate::error::ProviderError;
use crate::process::Dialect;
use hl_core::{
    ContentBlock, ResultEvent, Role, StepFinish, StreamEvent, StreamEventKind, TokenUsage,
    ToolResultContent,
};
use serde::Deserialize;
use serde_json::Value;
use std::time::Instant;

#[derive(Debug, Deserialize)]
struct Line {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default, rename = "sessionID")]
    session_id: String,
    #[serde(default)]
    part: Value,
    #[serde(default)]
    error: Option<WireError>,
}

#[derive(Debug, Deserialize)]
struct ToolPart {
    #[serde(rename = "callID")]
    call_id: String,
    tool: String,
    #[serde(default)]
    state: ToolState,
}

#[derive(Debug, Default, Deserialize)]
struct ToolState {
    #[serde(default)]
    status: String,
    #[serde(default)]
    input: Value,
    #[serde(default)]
    output: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct StepFinishPart {
    #[serde(default)]
    cost: Option<f64>,
    #[serde(default)]
    tokens: Option<WireTokens>,
}

#[derive(Debug, Default, Deserialize)]
struct WireTokens {
    #[serde(default)]
    input: u64,
    #[serde(default)]
    output: u64,
    #[serde(default)]
    reasoning: u64,
    #[serde(default)]
    cache: WireCache,
}

#[derive(Debug, Default, Deserialize)]
struct WireCache {
    #[serde(default)]
    read: u64,
    #[serde(default)]
    write: u64,
}

#[derive(Debug, Deserialize)]
struct WireError {
    #[serde(default)]
    name: String,
    #[serde(default)]
    data: Value,
}

impl WireError {
    fn message(&self) -> String {
        match self.data.get("message").and_then(Value::as_str) {
            Some(message) if !message.is_empty() => message.to_string(),
            _ if !self.name.is_empty() => self.name.clone(),
            _ => "opencode reported an error".to_string(),
        }
    }
}

impl From<WireTokens> for TokenUsage {
    fn from(t: WireTokens) -> Self {
        TokenUsage {
            input_tokens: t.input,
            output_tokens: t.output + t.reasoning,
            cache_creation_input_tokens: t.cache.write,
            cache_read_input_tokens: t.cache.read,
        }
    }
}

/// OpenCode tool ids are lowercase; map the common ones onto the names the
/// rest of the daemon keys on (`Read`, `Edit`, ...).
pub(crate) fn normalize_tool_name(tool: &str) -> String {
    match tool {
        "read" => "Read",
        "write" => "Write",
        "edit" => "Edit",
        "multiedit" => "MultiEdit",
        "bash" => "Bash",
        "glob" => "Glob",
        "grep" => "Grep",
        "list" => "LS",
        "webfetch" => "WebFetch",
        "todowrite" => "TodoWrite",
        "task" => "Task",
        other => other,
    }
    .to_string()
}

fn parse_part<T: for<'de> Deserialize<'de>>(part: Value) -> Result<T, ProviderError> {
    serde_json::from_value(part).map_err(|e| ProviderError::ParseFailed(e.to_string()))
}

pub(crate) struct OpenCodeStream {
    session_id: String,
    started: Instant,
    steps: u32,
    cost: Option<f64>,
    usage: Option<TokenUsage>,
    last_text: Option<String>,
    error: Option<String>,
}

impl Default for OpenCodeStream {
    fn default() -> Self {
        Self {
            session_id: String::new(),
            started: Instant::now(),
            steps: 0,
            cost: None,
            usage: None,
            last_text: None,
            error: None,
        }
    }
}

impl OpenCodeStream {
    fn event(&self, kind: StreamEventKind) -> StreamEvent {
        StreamEvent::new(self.session_id.as_str(), kind)
    }

    fn tool_events(&self, part: ToolPart) -> Vec<StreamEvent> {
        let name = normalize_tool_name(&part.tool);
        let mut events = vec![StreamEvent::tool_use(
            &self.session_id,
            &part.call_id,
            &name,
            part.state.input,
        )];
        let (content, is_error) = match part.state.status.as_str() {
            "completed" => (part.state.output.unwrap_or_default(), false),
            "error" => (part.state.error.unwrap_or_default(), true),
            _ => return events,
        };
        events.push(StreamEvent::message(
            &self.session_id,
            Role::User,
            vec![ContentBlock::ToolResult {
                tool_use_id: part.call_id,
                content: ToolResultContent::Text(content),
                is_error,
            }],
        ));
        events
    }
}

impl Dialect for OpenCodeStream {
    fn parse_line(&mut self, raw: &str) -> Result<Vec<StreamEvent>, ProviderError> {
        let line: Line =
            serde_json::from_str(raw).map_err(|e| ProviderError::ParseFailed(e.to_string()))?;

        let mut events = Vec::new();
        if self.session_id.is_empty() && !line.session_id.is_empty() {
            self.session_id = line.session_id.clone();
            events.push(StreamEvent::session_created(&self.session_id));
        }

        match line.kind.as_str() {
            "step_start" => events.push(self.event(StreamEventKind::StepStart)),
            "text" | "reasoning" => {
                let text = line
                    .part
                    .get("text")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                if text.is_empty() {
                    return Ok(events);
                }
                let block = if line.kind == "text" {
                    self.last_text = Some(text.clone());
                    ContentBlock::Text { text }
                } else {
                    ContentBlock::Thinking { thinking: text }
                };
                events.push(StreamEvent::message(
                    &self.session_id,
                    Role::Assistant,
                    vec![block],
                ));
            }
            "tool_use" => {
                let part: ToolPart = parse_part(line.part)?;
                events.extend(self.tool_events(part));
            }
            "step_finish" => {
                let part: StepFinishPart = parse_part(line.part)?;
                let usage = part.tokens.map(TokenUsage::from);
                self.steps += 1;
                if let Some(cost) = part.cost {
                    *self.cost.get_or_insert(0.0) += cost;
                }
                if let Some(u) = &usage {
                    self.usage.get_or_insert_with(TokenUsage::default).add(u);
                }
                events.push(self.event(StreamEventKind::StepFinish(StepFinish {
                    cost_usd: part.cost,
                    usage,
                })));
            }
            "error" => {
                let message = line
                    .error
                    .map(|e| e.message())
                    .unwrap_or_else(|| "opencode reported an error".to_string());
                self.error = Some(message);
            }
            other => tracing::trace!(kind = other, "ignoring opencode line"),
        }
        Ok(events)
    }

    fn finish(&mut self) -> Vec<StreamEvent> {
        if self.steps == 0 && self.error.is_none() {
            return Vec::new();
        }
        let is_error = self.error.is_some();
        let result = ResultEvent {
            subtype: if is_error { "error" } else { "success" }.to_string(),
            is_error,
            error: self.error.take(),
            cost_usd: self.cost,
            duration_ms: Some(self.started.elapsed().as_millis() as u64),
            num_turns: Some(self.steps),
            result: self.last_text.take(),
            usage: self.usage,
            session_id: Some(self.session_id.clone()).filter(|s| !s.is_empty()),
        };
        vec![StreamEvent::result(&self.session_id, result)]
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
