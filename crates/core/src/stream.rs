// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Normalized assistant stream events.
//!
//! Every provider dialect is translated into these variants before the
//! supervisor sees it:
//!
//! ```text
//! system (init | session_created) ─┐
//! message (text | thinking |       │
//!          tool_use | tool_result) ├─▶ StreamEvent { assistant_session_id, kind }
//! step_start | step_finish         │
//! result                          ─┘
//! ```

use crate::conversation::Role;
use crate::id::AssistantSessionId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One normalized event from an assistant subprocess
#[derive(Debug, Clone, PartialEq)]
pub struct StreamEvent {
    /// Empty for events emitted before the assistant reported its id
    pub assistant_session_id: AssistantSessionId,
    pub kind: StreamEventKind,
    /// Original protocol line, when the provider kept it
    pub raw: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StreamEventKind {
    System(SystemEvent),
    Message(MessageEvent),
    StepStart,
    StepFinish(StepFinish),
    Result(ResultEvent),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SystemEvent {
    Init(InitInfo),
    /// First sighting of the assistant's own session id
    SessionCreated,
    Other { subtype: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitInfo {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub cwd: String,
    #[serde(default, rename = "permissionMode", alias = "permission_mode")]
    pub permission_mode: String,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub mcp_servers: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MessageEvent {
    pub role: Role,
    pub content: Vec<ContentBlock>,
    /// Set for events produced inside a sub-agent tool call
    pub parent_tool_use_id: Option<String>,
}

/// A block inside an assistant or user message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: ToolResultContent,
        #[serde(default)]
        is_error: bool,
    },
    /// Images and other block kinds the supervisor does not record
    #[serde(other)]
    Unsupported,
}

/// `tool_result.content`: a plain string or an array of typed blocks.
///
/// Any other JSON shape is a parse error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResultContent {
    Text(String),
    Blocks(Vec<ToolResultBlock>),
}

impl Default for ToolResultContent {
    fn default() -> Self {
        ToolResultContent::Text(String::new())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResultBlock {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl ToolResultContent {
    /// Text projection: text blocks joined with `\n`, everything else dropped.
    pub fn as_text(&self) -> String {
        match self {
            ToolResultContent::Text(s) => s.clone(),
            ToolResultContent::Blocks(blocks) => blocks
                .iter()
                .filter(|b| b.kind == "text")
                .filter_map(|b| b.text.as_deref())
                .collect::<Vec<_>>()
                .join("\n"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input_tokens
            + self.output_tokens
            + self.cache_creation_input_tokens
            + self.cache_read_input_tokens
    }

    pub fn add(&mut self, other: &TokenUsage) {
        self.input_tokens += other.input_tokens;
        self.output_tokens += other.output_tokens;
        self.cache_creation_input_tokens += other.cache_creation_input_tokens;
        self.cache_read_input_tokens += other.cache_read_input_tokens;
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct StepFinish {
    pub cost_usd: Option<f64>,
    pub usage: Option<TokenUsage>,
}

/// Terminal summary of an assistant run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultEvent {
    #[serde(default)]
    pub subtype: String,
    #[serde(default)]
    pub is_error: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, alias = "total_cost_usd", skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<TokenUsage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,
}

impl ResultEvent {
    /// Message to record when the run failed
    pub fn error_message(&self) -> Option<String> {
        if let Some(error) = self.error.as_ref().filter(|e| !e.is_empty()) {
            return Some(error.clone());
        }
        if !self.is_error {
            return None;
        }
        match self.result.as_ref().filter(|r| !r.is_empty()) {
            Some(result) => Some(result.clone()),
            None if !self.subtype.is_empty() => Some(self.subtype.clone()),
            None => Some("assistant reported an error".to_string()),
        }
    }

    pub fn total_tokens(&self) -> Option<u64> {
        self.usage.map(|u| u.total())
    }
}

impl StreamEvent {
    pub fn new(assistant_session_id: impl Into<AssistantSessionId>, kind: StreamEventKind) -> Self {
        Self {
            assistant_session_id: assistant_session_id.into(),
            kind,
            raw: None,
        }
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    pub fn session_created(assistant_session_id: &str) -> Self {
        Self::new(
            assistant_session_id,
            StreamEventKind::System(SystemEvent::SessionCreated),
        )
    }

    pub fn init(assistant_session_id: &str, info: InitInfo) -> Self {
        Self::new(
            assistant_session_id,
            StreamEventKind::System(SystemEvent::Init(info)),
        )
    }

    pub fn message(assistant_session_id: &str, role: Role, content: Vec<ContentBlock>) -> Self {
        Self::new(
            assistant_session_id,
            StreamEventKind::Message(MessageEvent {
                role,
                content,
                parent_tool_use_id: None,
            }),
        )
    }

    pub fn text(assistant_session_id: &str, role: Role, text: &str) -> Self {
        Self::message(
            assistant_session_id,
            role,
            vec![ContentBlock::Text {
                text: text.to_string(),
            }],
        )
    }

    pub fn tool_use(assistant_session_id: &str, id: &str, name: &str, input: Value) -> Self {
        Self::message(
            assistant_session_id,
            Role::Assistant,
            vec![ContentBlock::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
                input,
            }],
        )
    }

    pub fn tool_result(assistant_session_id: &str, tool_use_id: &str, content: &str) -> Self {
        Self::message(
            assistant_session_id,
            Role::User,
            vec![ContentBlock::ToolResult {
                tool_use_id: tool_use_id.to_string(),
                content: ToolResultContent::Text(content.to_string()),
                is_error: false,
            }],
        )
    }

    pub fn result(assistant_session_id: &str, result: ResultEvent) -> Self {
        Self::new(assistant_session_id, StreamEventKind::Result(result))
    }

    pub fn has_session_id(&self) -> bool {
        !self.assistant_session_id.is_empty()
    }

    pub fn as_result(&self) -> Option<&ResultEvent> {
        match &self.kind {
            StreamEventKind::Result(r) => Some(r),
            _ => None,
        }
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
