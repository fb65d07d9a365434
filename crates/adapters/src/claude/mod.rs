// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Claude CLI provider

mod stream;

pub(crate) use stream::ClaudeStream;

use crate::config::{LaunchConfig, OutputFormat};
use crate::discovery::find_binary;
use crate::error::ProviderError;
use crate::process::{spawn_session, SpawnSpec};
use crate::provider::{LaunchedSession, Provider};
use crate::subprocess::{run_with_timeout, VERSION_PROBE_TIMEOUT};
use async_trait::async_trait;
use hl_core::{McpServerConfig, ProviderKind};
use indexmap::IndexMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const BINARY: &str = "claude";

/// Provider for the `claude` CLI
#[derive(Debug, Clone)]
pub struct ClaudeProvider {
    path: Option<PathBuf>,
}

impl ClaudeProvider {
    /// Locate `claude` on PATH or in a well-known install location
    pub fn discover() -> Self {
        let path = find_binary(BINARY);
        tracing::debug!(path = ?path, "claude discovery");
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// Command-line arguments for one launch.
///
/// Layout is `<flags…> --print -- <query>`: the query is always last and
/// `--` keeps a query starting with `-` from being read as a flag.
pub(crate) fn build_args(config: &LaunchConfig, mcp_config: Option<&Path>) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();
    let mut flag = |name: &str, value: &str| {
        args.push(name.to_string());
        args.push(value.to_string());
    };

    if config.is_resume() {
        flag("--resume", &config.session_id);
    }
    if !config.model.is_empty() {
        flag("--model", &config.model);
    }
    flag("--output-format", config.output_format.as_str());
    if let Some(max_turns) = config.max_turns {
        flag("--max-turns", &max_turns.to_string());
    }
    if !config.system_prompt.is_empty() {
        flag("--system-prompt", &config.system_prompt);
    }
    let append = append_prompt(config);
    if !append.is_empty() {
        flag("--append-system-prompt", &append);
    }
    if let Some(path) = mcp_config {
        flag("--mcp-config", &path.to_string_lossy());
    }
    if !config.permission_prompt_tool.is_empty() {
        flag("--permission-prompt-tool", &config.permission_prompt_tool);
    }
    if !config.allowed_tools.is_empty() {
        flag("--allowedTools", &config.allowed_tools.join(","));
    }
    if !config.disallowed_tools.is_empty() {
        flag("--disallowedTools", &config.disallowed_tools.join(","));
    }
    for dir in &config.additional_directories {
        flag("--add-dir", &dir.to_string_lossy());
    }

    if config.is_resume() && config.fork_session {
        args.push("--fork-session".to_string());
    }
    // Streaming output requires verbose
    if config.output_format == OutputFormat::StreamJson || config.verbose {
        args.push("--verbose".to_string());
    }

    args.push("--print".to_string());
    args.push("--".to_string());
    args.push(config.query.clone());
    args
}

/// Custom instructions ride along with the appended system prompt
fn append_prompt(config: &LaunchConfig) -> String {
    [
        config.append_system_prompt.as_str(),
        config.custom_instructions.as_str(),
    ]
    .iter()
    .filter(|s| !s.trim().is_empty())
    .copied()
    .collect::<Vec<_>>()
    .join("\n\n")
}

/// `--mcp-config` file body: `{"mcpServers": {name: spec, ...}}`
pub(crate) fn mcp_config_json(
    servers: &IndexMap<String, McpServerConfig>,
) -> Result<String, ProviderError> {
    serde_json::to_string_pretty(&serde_json::json!({ "mcpServers": servers }))
        .map_err(|e| ProviderError::InvalidConfig(format!("mcp config: {e}")))
}

fn write_mcp_config(
    servers: &IndexMap<String, McpServerConfig>,
) -> Result<NamedTempFile, ProviderError> {
    let body = mcp_config_json(servers)?;
    let io_err = |e: std::io::Error| ProviderError::LaunchFailed(format!("mcp config file: {e}"));
    let mut file = tempfile::Builder::new()
        .prefix("hld-mcp-")
        .suffix(".json")
        .tempfile()
        .map_err(io_err)?;
    file.write_all(body.as_bytes()).map_err(io_err)?;
    file.flush().map_err(io_err)?;
    Ok(file)
}

#[async_trait]
impl Provider for ClaudeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Claude
    }

    fn is_available(&self) -> bool {
        self.path.is_some()
    }

    fn path(&self) -> Option<PathBuf> {
        self.path.clone()
    }

    async fn version(&self) -> Result<String, ProviderError> {
        let path = self
            .path
            .as_ref()
            .ok_or(ProviderError::Unavailable(BINARY))?;
        let mut cmd = Command::new(path);
        cmd.arg("--version");
        let output = run_with_timeout(cmd, VERSION_PROBE_TIMEOUT, "claude --version")
            .await
            .map_err(ProviderError::LaunchFailed)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    async fn launch(
        &self,
        cancel: CancellationToken,
        config: LaunchConfig,
    ) -> Result<LaunchedSession, ProviderError> {
        let path = self
            .path
            .as_ref()
            .ok_or(ProviderError::Unavailable(BINARY))?;
        config.validate()?;

        let mut keep_alive = Vec::new();
        let mcp_path = if config.mcp_servers.is_empty() {
            None
        } else {
            let file = write_mcp_config(&config.mcp_servers)?;
            let path = file.path().to_path_buf();
            keep_alive.push(file);
            Some(path)
        };

        let args = build_args(&config, mcp_path.as_deref());
        let mut command = Command::new(path);
        command.args(&args).envs(&config.env);
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }
        tracing::debug!(
            binary = %path.display(),
            resume = config.is_resume(),
            mcp_servers = config.mcp_servers.len(),
            "launching claude",
        );

        spawn_session(
            SpawnSpec {
                provider: BINARY,
                command,
                output_format: config.output_format,
                timeout: config.timeout,
                keep_alive,
            },
            ClaudeStream::default(),
            cancel,
        )
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
