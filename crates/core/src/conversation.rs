// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation events: the append-only log scoped to one assistant session.

use crate::id::{ApprovalId, AssistantSessionId, SessionId};
use crate::session::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of a conversation log entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationEventType {
    Message,
    ToolCall,
    ToolResult,
    Thinking,
    System,
}

impl ConversationEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationEventType::Message => "message",
            ConversationEventType::ToolCall => "tool_call",
            ConversationEventType::ToolResult => "tool_result",
            ConversationEventType::Thinking => "thinking",
            ConversationEventType::System => "system",
        }
    }
}

impl fmt::Display for ConversationEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConversationEventType {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "message" => ConversationEventType::Message,
            "tool_call" => ConversationEventType::ToolCall,
            "tool_result" => ConversationEventType::ToolResult,
            "thinking" => ConversationEventType::Thinking,
            "system" => ConversationEventType::System,
            other => return Err(UnknownVariant::new("event type", other)),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "user" => Role::User,
            "assistant" => Role::Assistant,
            "system" => Role::System,
            other => return Err(UnknownVariant::new("role", other)),
        })
    }
}

/// Approval state of a tool call row.
///
/// Unset is represented by `Option::None` on the row; the only legal
/// progression is `None -> Pending -> {Approved, Denied}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolApprovalStatus {
    Pending,
    Approved,
    Denied,
}

impl ToolApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToolApprovalStatus::Pending => "pending",
            ToolApprovalStatus::Approved => "approved",
            ToolApprovalStatus::Denied => "denied",
        }
    }

    pub fn is_decided(&self) -> bool {
        !matches!(self, ToolApprovalStatus::Pending)
    }

    /// Whether a row at `current` may move to `next`.
    pub fn can_advance(current: Option<ToolApprovalStatus>, next: ToolApprovalStatus) -> bool {
        match (current, next) {
            (None, ToolApprovalStatus::Pending) => true,
            (Some(ToolApprovalStatus::Pending), n) => n.is_decided(),
            _ => false,
        }
    }
}

impl fmt::Display for ToolApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolApprovalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "pending" => ToolApprovalStatus::Pending,
            "approved" => ToolApprovalStatus::Approved,
            "denied" => ToolApprovalStatus::Denied,
            other => return Err(UnknownVariant::new("approval status", other)),
        })
    }
}

/// One row of the conversation log.
///
/// `id` and `sequence` are assigned by the store on insert; callers build
/// events with both at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationEvent {
    #[serde(default)]
    pub id: i64,
    pub session_id: SessionId,
    pub assistant_session_id: AssistantSessionId,
    #[serde(default)]
    pub sequence: i64,
    pub event_type: ConversationEventType,
    pub created_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_input_json: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_tool_use_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_for_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_result_content: Option<String>,

    #[serde(default)]
    pub is_completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_status: Option<ToolApprovalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_id: Option<ApprovalId>,
}

impl ConversationEvent {
    fn base(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        event_type: ConversationEventType,
    ) -> Self {
        Self {
            id: 0,
            session_id,
            assistant_session_id,
            sequence: 0,
            event_type,
            created_at: Utc::now(),
            role: None,
            content: String::new(),
            tool_id: None,
            tool_name: None,
            tool_input_json: None,
            parent_tool_use_id: None,
            tool_result_for_id: None,
            tool_result_content: None,
            is_completed: false,
            approval_status: None,
            approval_id: None,
        }
    }

    pub fn message(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        role: Role,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            session_id,
            assistant_session_id,
            ConversationEventType::Message,
        );
        event.role = Some(role);
        event.content = content.into();
        event
    }

    pub fn thinking(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            session_id,
            assistant_session_id,
            ConversationEventType::Thinking,
        );
        event.role = Some(Role::Assistant);
        event.content = content.into();
        event
    }

    pub fn system(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            session_id,
            assistant_session_id,
            ConversationEventType::System,
        );
        event.role = Some(Role::System);
        event.content = content.into();
        event
    }

    pub fn tool_call(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        tool_id: impl Into<String>,
        tool_name: impl Into<String>,
        tool_input_json: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            session_id,
            assistant_session_id,
            ConversationEventType::ToolCall,
        );
        event.role = Some(Role::Assistant);
        event.tool_id = Some(tool_id.into());
        event.tool_name = Some(tool_name.into());
        event.tool_input_json = Some(tool_input_json.into());
        event
    }

    pub fn tool_result(
        session_id: SessionId,
        assistant_session_id: AssistantSessionId,
        tool_result_for_id: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        let mut event = Self::base(
            session_id,
            assistant_session_id,
            ConversationEventType::ToolResult,
        );
        event.role = Some(Role::User);
        event.tool_result_for_id = Some(tool_result_for_id.into());
        event.tool_result_content = Some(content.into());
        event
    }

    pub fn with_parent_tool_use_id(mut self, parent: Option<String>) -> Self {
        self.parent_tool_use_id = parent;
        self
    }

    pub fn at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    pub fn is_user_message(&self) -> bool {
        self.event_type == ConversationEventType::Message && self.role == Some(Role::User)
    }

    /// Uncompleted tool call
    pub fn is_pending_tool_call(&self) -> bool {
        self.event_type == ConversationEventType::ToolCall && !self.is_completed
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
