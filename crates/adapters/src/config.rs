// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launch configuration shared by every provider.

use hl_core::{McpServerConfig, RunId, RUN_ID_ENV};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// How the assistant's stdout is framed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// Line-delimited JSON events
    #[default]
    StreamJson,
    /// One JSON object holding the terminal result
    Json,
    /// Raw stdout, trimmed
    Text,
}

impl OutputFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::StreamJson => "stream-json",
            OutputFormat::Json => "json",
            OutputFormat::Text => "text",
        }
    }
}

/// Everything a provider needs to start one assistant run.
///
/// `query` is required unless `session_id` names a conversation to resume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub query: String,
    /// Assistant session to resume
    pub session_id: String,
    /// Branch from `session_id` instead of resuming it linearly
    pub fork_session: bool,
    pub model: String,
    pub working_dir: Option<PathBuf>,
    pub max_turns: Option<u32>,
    pub system_prompt: String,
    pub append_system_prompt: String,
    pub custom_instructions: String,
    pub allowed_tools: Vec<String>,
    pub disallowed_tools: Vec<String>,
    pub additional_directories: Vec<PathBuf>,
    pub env: BTreeMap<String, String>,
    /// Keyed by server name; iteration order is launch order
    pub mcp_servers: IndexMap<String, McpServerConfig>,
    pub permission_prompt_tool: String,
    pub verbose: bool,
    pub title: String,
    pub files: Vec<PathBuf>,
    pub agent: String,
    pub output_format: OutputFormat,
    /// Wall-clock budget for the whole run
    #[serde(skip)]
    pub timeout: Option<Duration>,
}

impl LaunchConfig {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Self::default()
        }
    }

    pub fn is_resume(&self) -> bool {
        !self.session_id.is_empty()
    }

    /// Point the subprocess and every stdio MCP server at `run_id`.
    pub fn stamp_run_id(&mut self, run_id: &RunId) {
        self.env.insert(RUN_ID_ENV.to_string(), run_id.to_string());
        for server in self.mcp_servers.values_mut() {
            server.stamp_run_id(run_id);
        }
    }

    pub fn validate(&self) -> Result<(), crate::ProviderError> {
        if self.query.trim().is_empty() && !self.is_resume() {
            return Err(crate::ProviderError::InvalidConfig(
                "query is required".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
