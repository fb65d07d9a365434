// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch and continue requests, and the rules that turn a parent session
//! plus a continue request into a child's launch config.

use chrono::{DateTime, Utc};
use hl_adapters::{LaunchConfig, OutputFormat};
use hl_core::{
    calculate_summary, AssistantSessionId, McpServer, McpServerConfig, ProviderKind, RunId,
    Session, SessionId,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// A request to launch one session
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub provider: ProviderKind,
    pub query: String,
    pub title: String,
    pub model: String,
    pub working_dir: Option<PathBuf>,
    pub max_turns: Option<u32>,
    pub system_prompt: String,
    pub append_system_prompt: String,
    pub custom_instructions: String,
    pub permission_prompt_tool: String,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub additional_directories: Vec<PathBuf>,
    pub mcp_servers: IndexMap<String, McpServerConfig>,
    pub env: BTreeMap<String, String>,
    pub auto_accept_edits: bool,
    pub dangerously_skip_permissions: bool,
    pub dangerously_skip_permissions_expires_at: Option<DateTime<Utc>>,
    pub output_format: OutputFormat,
    /// Wall-clock budget for the run
    #[serde(skip)]
    pub timeout: Option<Duration>,

    /// Set on continuations
    pub parent_session_id: Option<SessionId>,
    /// Assistant conversation to resume
    pub resume_session_id: AssistantSessionId,
    pub fork_session: bool,
}

impl SessionConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    /// Point every stdio MCP server at `run_id`
    pub fn stamp_run_id(&mut self, run_id: &RunId) {
        for server in self.mcp_servers.values_mut() {
            server.stamp_run_id(run_id);
        }
    }

    /// MCP servers in launch order, as the store takes them
    pub fn mcp_server_list(&self) -> Vec<(String, McpServerConfig)> {
        self.mcp_servers
            .iter()
            .map(|(name, config)| (name.clone(), config.clone()))
            .collect()
    }

    /// The session row this request starts as
    pub fn to_session(&self, id: SessionId, run_id: RunId, now: DateTime<Utc>) -> Session {
        let mut session = Session::new(id, run_id, now);
        session.parent_session_id = self.parent_session_id.clone();
        session.provider = self.provider;
        session.query = self.query.clone();
        session.summary = calculate_summary(&self.query);
        session.title = self.title.clone();
        session.model = self.model.clone();
        session.working_dir = self
            .working_dir
            .as_ref()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default();
        session.max_turns = self.max_turns;
        session.system_prompt = self.system_prompt.clone();
        session.append_system_prompt = self.append_system_prompt.clone();
        session.custom_instructions = self.custom_instructions.clone();
        session.permission_prompt_tool = self.permission_prompt_tool.clone();
        session.allowed_tools = self.allowed_tools.clone();
        session.disallowed_tools = self.disallowed_tools.clone();
        session.auto_accept_edits = self.auto_accept_edits;
        session.dangerously_skip_permissions = self.dangerously_skip_permissions;
        session.dangerously_skip_permissions_expires_at = if self.dangerously_skip_permissions {
            self.dangerously_skip_permissions_expires_at
        } else {
            None
        };
        session
    }

    /// Provider-facing config for a run owned by `run_id`
    pub fn to_launch_config(&self, run_id: &RunId) -> LaunchConfig {
        let mut config = LaunchConfig {
            query: self.query.clone(),
            session_id: self.resume_session_id.to_string(),
            fork_session: self.fork_session,
            model: self.model.clone(),
            working_dir: self.working_dir.clone(),
            max_turns: self.max_turns,
            system_prompt: self.system_prompt.clone(),
            append_system_prompt: self.append_system_prompt.clone(),
            custom_instructions: self.custom_instructions.clone(),
            allowed_tools: self.allowed_tools.clone(),
            disallowed_tools: self.disallowed_tools.clone(),
            additional_directories: self.additional_directories.clone(),
            env: self.env.clone(),
            mcp_servers: self.mcp_servers.clone(),
            permission_prompt_tool: self.permission_prompt_tool.clone(),
            title: self.title.clone(),
            output_format: self.output_format,
            timeout: self.timeout,
            ..LaunchConfig::default()
        };
        config.stamp_run_id(run_id);
        config
    }

    /// Rebuild a launch request from a stored draft row
    pub fn from_draft(draft: &Session, mcp: &[McpServer]) -> Self {
        Self {
            provider: draft.provider,
            query: draft.query.clone(),
            title: draft.title.clone(),
            model: draft.model.clone(),
            working_dir: non_empty_path(&draft.working_dir),
            max_turns: draft.max_turns,
            system_prompt: draft.system_prompt.clone(),
            append_system_prompt: draft.append_system_prompt.clone(),
            custom_instructions: draft.custom_instructions.clone(),
            permission_prompt_tool: draft.permission_prompt_tool.clone(),
            allowed_tools: draft.allowed_tools.clone(),
            disallowed_tools: draft.disallowed_tools.clone(),
            mcp_servers: mcp_map(mcp),
            auto_accept_edits: draft.auto_accept_edits,
            dangerously_skip_permissions: draft.dangerously_skip_permissions,
            dangerously_skip_permissions_expires_at: draft.dangerously_skip_permissions_expires_at,
            parent_session_id: draft.parent_session_id.clone(),
            ..Self::default()
        }
    }
}

/// A request to continue (or fork) a finished session.
///
/// Empty strings, empty lists and `None` mean "inherit from the parent".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContinueConfig {
    pub parent_session_id: SessionId,
    pub query: String,
    pub title: String,
    pub model: String,
    pub working_dir: Option<PathBuf>,
    pub max_turns: Option<u32>,
    pub system_prompt: String,
    pub append_system_prompt: String,
    pub custom_instructions: String,
    pub permission_prompt_tool: String,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub additional_directories: Vec<PathBuf>,
    /// Replaces the inherited list outright
    pub mcp_servers: Option<IndexMap<String, McpServerConfig>>,
    pub env: BTreeMap<String, String>,
    pub auto_accept_edits: Option<bool>,
    pub dangerously_skip_permissions: Option<bool>,
    #[serde(skip)]
    pub dangerously_skip_permissions_timeout: Option<Duration>,
    pub fork_session: bool,
    pub output_format: OutputFormat,
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl ContinueConfig {
    pub fn new(parent_session_id: impl Into<SessionId>, query: impl Into<String>) -> Self {
        Self {
            parent_session_id: parent_session_id.into(),
            query: query.into(),
            ..Self::default()
        }
    }
}

/// `now + timeout`, or `None` when either is unrepresentable
pub fn expiry_after(now: DateTime<Utc>, timeout: Duration) -> Option<DateTime<Utc>> {
    chrono::Duration::from_std(timeout)
        .ok()
        .and_then(|d| now.checked_add_signed(d))
}

fn non_empty_path(s: &str) -> Option<PathBuf> {
    (!s.is_empty()).then(|| PathBuf::from(s))
}

fn mcp_map(servers: &[McpServer]) -> IndexMap<String, McpServerConfig> {
    servers
        .iter()
        .map(|s| (s.name.clone(), s.config.clone()))
        .collect()
}

fn pick(requested: &str, inherited: &str) -> String {
    if requested.is_empty() {
        inherited.to_string()
    } else {
        requested.to_string()
    }
}

fn pick_list(requested: &[String], inherited: &[String]) -> Vec<String> {
    if requested.is_empty() {
        inherited.to_vec()
    } else {
        requested.to_vec()
    }
}

/// Child launch config for `request` continuing `parent`.
///
/// `max_turns` and `title` never carry over. Dangerous-skip carries over
/// only with an expiry still ahead of `now`; an open-ended grant stays
/// with the parent.
pub fn merge_continue(
    parent: &Session,
    parent_mcp: &[McpServer],
    request: &ContinueConfig,
    now: DateTime<Utc>,
) -> SessionConfig {
    let (skip, skip_expires_at) = match request.dangerously_skip_permissions {
        Some(true) => (
            true,
            request
                .dangerously_skip_permissions_timeout
                .and_then(|t| expiry_after(now, t)),
        ),
        Some(false) => (false, None),
        None => match parent.dangerously_skip_permissions_expires_at {
            Some(expires_at) if parent.dangerously_skip_permissions && expires_at > now => {
                (true, Some(expires_at))
            }
            _ => (false, None),
        },
    };

    SessionConfig {
        provider: parent.provider,
        query: request.query.clone(),
        title: request.title.clone(),
        model: pick(&request.model, &parent.model),
        working_dir: request
            .working_dir
            .clone()
            .or_else(|| non_empty_path(&parent.working_dir)),
        max_turns: request.max_turns,
        system_prompt: pick(&request.system_prompt, &parent.system_prompt),
        append_system_prompt: pick(&request.append_system_prompt, &parent.append_system_prompt),
        custom_instructions: pick(&request.custom_instructions, &parent.custom_instructions),
        permission_prompt_tool: pick(
            &request.permission_prompt_tool,
            &parent.permission_prompt_tool,
        ),
        allowed_tools: pick_list(&request.allowed_tools, &parent.allowed_tools),
        disallowed_tools: pick_list(&request.disallowed_tools, &parent.disallowed_tools),
        additional_directories: request.additional_directories.clone(),
        mcp_servers: match &request.mcp_servers {
            Some(servers) => servers.clone(),
            None => mcp_map(parent_mcp),
        },
        env: request.env.clone(),
        auto_accept_edits: request.auto_accept_edits.unwrap_or(parent.auto_accept_edits),
        dangerously_skip_permissions: skip,
        dangerously_skip_permissions_expires_at: skip_expires_at,
        output_format: request.output_format,
        timeout: request.timeout,
        parent_session_id: Some(parent.id.clone()),
        resume_session_id: parent.assistant_session_id.clone(),
        fork_session: request.fork_session,
    }
}

#[cfg(test)]
#[path = "request_tests.rs"]
mod tests;
