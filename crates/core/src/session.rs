// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session records: the canonical row for one supervised assistant run.

use crate::id::{AssistantSessionId, RunId, SessionId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error parsing a persisted enum value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind}: {value}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    pub(crate) fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_string(),
        }
    }
}

/// Lifecycle status of a session.
///
/// ```text
/// draft ──launch──▶ starting ──first event──▶ running ──result──▶ completed | failed
///                                            running ──interrupt──▶ completing ──EOF──▶ completed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Draft,
    Starting,
    Running,
    WaitingInput,
    Completing,
    Completed,
    Interrupted,
    Failed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Draft => "draft",
            SessionStatus::Starting => "starting",
            SessionStatus::Running => "running",
            SessionStatus::WaitingInput => "waiting_input",
            SessionStatus::Completing => "completing",
            SessionStatus::Completed => "completed",
            SessionStatus::Interrupted => "interrupted",
            SessionStatus::Failed => "failed",
        }
    }

    /// Terminal statuses never transition again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionStatus::Completed | SessionStatus::Failed | SessionStatus::Interrupted
        )
    }

    /// Only finished sessions may be continued.
    pub fn can_continue(&self) -> bool {
        self.is_terminal()
    }

    /// Statuses for which an interrupt is meaningful.
    pub fn is_interruptible(&self) -> bool {
        matches!(self, SessionStatus::Running | SessionStatus::WaitingInput)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SessionStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "draft" => SessionStatus::Draft,
            "starting" => SessionStatus::Starting,
            "running" => SessionStatus::Running,
            "waiting_input" => SessionStatus::WaitingInput,
            "completing" => SessionStatus::Completing,
            "completed" => SessionStatus::Completed,
            "interrupted" => SessionStatus::Interrupted,
            "failed" => SessionStatus::Failed,
            other => return Err(UnknownVariant::new("session status", other)),
        })
    }
}

/// Which assistant CLI backs a session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    #[default]
    Claude,
    #[serde(rename = "opencode")]
    OpenCode,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Claude => "claude",
            ProviderKind::OpenCode => "opencode",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "claude" | "" => Ok(ProviderKind::Claude),
            "opencode" => Ok(ProviderKind::OpenCode),
            other => Err(UnknownVariant::new("provider", other)),
        }
    }
}

/// Canonical record of one supervised run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub run_id: RunId,
    /// Assigned once the subprocess reports it; immutable afterwards.
    #[serde(default)]
    pub assistant_session_id: AssistantSessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_session_id: Option<SessionId>,
    #[serde(default)]
    pub provider: ProviderKind,

    // -- launch configuration --
    pub query: String,
    pub summary: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub working_dir: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_turns: Option<u32>,
    #[serde(default)]
    pub system_prompt: String,
    #[serde(default)]
    pub append_system_prompt: String,
    #[serde(default)]
    pub custom_instructions: String,
    #[serde(default)]
    pub permission_prompt_tool: String,
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default)]
    pub disallowed_tools: Vec<String>,

    // -- elevation --
    #[serde(default)]
    pub auto_accept_edits: bool,
    #[serde(default)]
    pub dangerously_skip_permissions: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dangerously_skip_permissions_expires_at: Option<DateTime<Utc>>,

    // -- runtime --
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,

    // -- results --
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_tokens: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_turns: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

impl Session {
    /// A fresh `starting` session with empty launch configuration.
    pub fn new(id: SessionId, run_id: RunId, now: DateTime<Utc>) -> Self {
        Self {
            id,
            run_id,
            assistant_session_id: AssistantSessionId::default(),
            parent_session_id: None,
            provider: ProviderKind::default(),
            query: String::new(),
            summary: String::new(),
            title: String::new(),
            model: String::new(),
            working_dir: String::new(),
            max_turns: None,
            system_prompt: String::new(),
            append_system_prompt: String::new(),
            custom_instructions: String::new(),
            permission_prompt_tool: String::new(),
            allowed_tools: Vec::new(),
            disallowed_tools: Vec::new(),
            auto_accept_edits: false,
            dangerously_skip_permissions: false,
            dangerously_skip_permissions_expires_at: None,
            status: SessionStatus::Starting,
            created_at: now,
            last_activity_at: now,
            completed_at: None,
            cost_usd: None,
            total_tokens: None,
            duration_ms: None,
            num_turns: None,
            result_content: None,
            error_message: None,
        }
    }

    /// Whether `dangerously_skip_permissions` is in force at `now`.
    ///
    /// A flag without an expiry never lapses on its own.
    pub fn skip_permissions_active(&self, now: DateTime<Utc>) -> bool {
        if !self.dangerously_skip_permissions {
            return false;
        }
        match self.dangerously_skip_permissions_expires_at {
            Some(expires_at) => expires_at > now,
            None => true,
        }
    }
}

/// Partial update of a session row; `None` fields are left untouched.
///
/// `dangerously_skip_permissions_expires_at` is doubly optional so callers
/// can clear it (`Some(None)`).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionUpdate {
    pub assistant_session_id: Option<AssistantSessionId>,
    pub status: Option<SessionStatus>,
    pub query: Option<String>,
    pub summary: Option<String>,
    pub title: Option<String>,
    pub model: Option<String>,
    pub working_dir: Option<String>,
    pub last_activity_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cost_usd: Option<f64>,
    pub total_tokens: Option<u64>,
    pub duration_ms: Option<u64>,
    pub num_turns: Option<u32>,
    pub result_content: Option<String>,
    pub error_message: Option<String>,
    pub auto_accept_edits: Option<bool>,
    pub dangerously_skip_permissions: Option<bool>,
    pub dangerously_skip_permissions_expires_at: Option<Option<DateTime<Utc>>>,
}

impl SessionUpdate {
    pub fn status(status: SessionStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    pub fn touch(at: DateTime<Utc>) -> Self {
        Self {
            last_activity_at: Some(at),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
