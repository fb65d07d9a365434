// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool-use approvals registered by the approval source.

use crate::conversation::ToolApprovalStatus;
use crate::id::{ApprovalId, RunId, SessionId};
use crate::session::UnknownVariant;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    LocalPending,
    LocalApproved,
    LocalDenied,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalStatus::LocalPending => "local_pending",
            ApprovalStatus::LocalApproved => "local_approved",
            ApprovalStatus::LocalDenied => "local_denied",
        }
    }

    /// Decided approvals are immutable.
    pub fn is_decided(&self) -> bool {
        !matches!(self, ApprovalStatus::LocalPending)
    }

    /// The matching state for correlated conversation rows
    pub fn tool_status(&self) -> ToolApprovalStatus {
        match self {
            ApprovalStatus::LocalPending => ToolApprovalStatus::Pending,
            ApprovalStatus::LocalApproved => ToolApprovalStatus::Approved,
            ApprovalStatus::LocalDenied => ToolApprovalStatus::Denied,
        }
    }
}

impl fmt::Display for ApprovalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ApprovalStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "local_pending" => ApprovalStatus::LocalPending,
            "local_approved" => ApprovalStatus::LocalApproved,
            "local_denied" => ApprovalStatus::LocalDenied,
            other => return Err(UnknownVariant::new("approval status", other)),
        })
    }
}

/// Decision a user makes on a pending approval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Deny,
}

impl ApprovalDecision {
    pub fn status(&self) -> ApprovalStatus {
        match self {
            ApprovalDecision::Approve => ApprovalStatus::LocalApproved,
            ApprovalDecision::Deny => ApprovalStatus::LocalDenied,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Approval {
    pub id: ApprovalId,
    pub run_id: RunId,
    pub session_id: SessionId,
    pub status: ApprovalStatus,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responded_at: Option<DateTime<Utc>>,
    pub tool_name: String,
    #[serde(default)]
    pub tool_input: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_use_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

impl Approval {
    pub fn pending(
        id: ApprovalId,
        run_id: RunId,
        session_id: SessionId,
        tool_name: impl Into<String>,
        tool_input: serde_json::Value,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            run_id,
            session_id,
            status: ApprovalStatus::LocalPending,
            created_at,
            responded_at: None,
            tool_name: tool_name.into(),
            tool_input,
            tool_use_id: None,
            comment: None,
        }
    }

    pub fn with_tool_use_id(mut self, tool_use_id: Option<String>) -> Self {
        self.tool_use_id = tool_use_id.filter(|id| !id.is_empty());
        self
    }
}

#[cfg(test)]
#[path = "approval_tests.rs"]
mod tests;
