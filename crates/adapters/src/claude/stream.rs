// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude `stream-json` dialect.
//!
//! Every line is one JSON object tagged by `type`: `system`, `assistant`,
//! `user`, `result`. Other types are ignored.

use crate::error::ProviderError;
use crate::process::Dialect;
use hl_core::{
    ContentBlock, InitInfo, MessageEvent, ResultEvent, Role, StreamEvent, StreamEventKind,
    SystemEvent,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum Line {
    System {
        #[serde(default)]
        subtype: String,
        #[serde(default)]
        session_id: String,
        #[serde(flatten)]
        info: InitInfo,
    },
    Assistant(MessageLine),
    User(MessageLine),
    Result(ResultEvent),
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct MessageLine {
    message: WireMessage,
    #[serde(default)]
    session_id: String,
    #[serde(default)]
    parent_tool_use_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    role: Option<Role>,
    content: WireContent,
}

/// User prompts arrive as a bare string, everything else as blocks
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum WireContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
}

impl Line {
    fn session_id(&self) -> &str {
        match self {
            Line::System { session_id, .. } => session_id,
            Line::Assistant(m) | Line::User(m) => &m.session_id,
            Line::Result(r) => r.session_id.as_deref().unwrap_or(""),
            Line::Other => "",
        }
    }
}

/// Stateful translator; latches the first session id it sees
#[derive(Debug, Default)]
pub(crate) struct ClaudeStream {
    session_id: String,
}

impl ClaudeStream {
    fn message(&self, line: MessageLine, default_role: Role) -> Option<StreamEvent> {
        let content = match line.message.content {
            WireContent::Text(text) => vec![ContentBlock::Text { text }],
            WireContent::Blocks(blocks) => blocks,
        };
        if content.is_empty() {
            return None;
        }
        Some(StreamEvent::new(
            self.session_id.as_str(),
            StreamEventKind::Message(MessageEvent {
                role: line.message.role.unwrap_or(default_role),
                content,
                parent_tool_use_id: line.parent_tool_use_id.filter(|id| !id.is_empty()),
            }),
        ))
    }
}

impl Dialect for ClaudeStream {
    fn parse_line(&mut self, raw: &str) -> Result<Vec<StreamEvent>, ProviderError> {
        let line: Line =
            serde_json::from_str(raw).map_err(|e| ProviderError::ParseFailed(e.to_string()))?;

        let mut events = Vec::new();
        let reported = line.session_id();
        if self.session_id.is_empty() && !reported.is_empty() {
            self.session_id = reported.to_string();
            events.push(StreamEvent::session_created(&self.session_id));
        }

        match line {
            Line::System {
                subtype, info, ..
            } => {
                let system = if subtype == "init" {
                    SystemEvent::Init(info)
                } else {
                    SystemEvent::Other { subtype }
                };
                events.push(StreamEvent::new(
                    self.session_id.as_str(),
                    StreamEventKind::System(system),
                ));
            }
            Line::Assistant(m) => events.extend(self.message(m, Role::Assistant)),
            Line::User(m) => events.extend(self.message(m, Role::User)),
            Line::Result(r) => events.push(StreamEvent::result(&self.session_id, r)),
            Line::Other => {}
        }
        Ok(events)
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
