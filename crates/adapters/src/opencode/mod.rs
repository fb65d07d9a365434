// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! OpenCode CLI provider

mod stream;

pub(crate) use stream::OpenCodeStream;

use crate::config::{LaunchConfig, OutputFormat};
use crate::discovery::find_binary;
use crate::error::ProviderError;
use crate::process::{spawn_session, SpawnSpec};
use crate::provider::{LaunchedSession, Provider};
use crate::subprocess::{run_with_timeout, VERSION_PROBE_TIMEOUT};
use async_trait::async_trait;
use hl_core::{McpServerConfig, ProviderKind};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};
use std::path::PathBuf;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;

const BINARY: &str = "opencode";

/// Environment variable OpenCode reads inline config from
pub const CONFIG_CONTENT_ENV: &str = "OPENCODE_CONFIG_CONTENT";

/// Provider for the `opencode` CLI
#[derive(Debug, Clone)]
pub struct OpenCodeProvider {
    path: Option<PathBuf>,
}

impl OpenCodeProvider {
    pub fn discover() -> Self {
        let path = find_binary(BINARY);
        tracing::debug!(path = ?path, "opencode discovery");
        Self { path }
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
        }
    }
}

/// `run <flags…> -- <query>`; the query is always last
pub(crate) fn build_args(config: &LaunchConfig) -> Vec<String> {
    let mut args = vec!["run".to_string(), "--format".to_string()];
    args.push(
        match config.output_format {
            OutputFormat::Text => "default",
            OutputFormat::StreamJson | OutputFormat::Json => "json",
        }
        .to_string(),
    );
    let mut flag = |name: &str, value: &str| {
        args.push(name.to_string());
        args.push(value.to_string());
    };
    if !config.model.is_empty() {
        flag("--model", &config.model);
    }
    if config.is_resume() {
        flag("--session", &config.session_id);
    }
    if !config.agent.is_empty() {
        flag("--agent", &config.agent);
    }
    if !config.title.is_empty() {
        flag("--title", &config.title);
    }
    for file in &config.files {
        flag("--file", &file.to_string_lossy());
    }
    args.push("--".to_string());
    args.push(config.query.clone());
    args
}

/// Inline config carrying the MCP servers, in OpenCode's `mcp` shape
pub(crate) fn config_content(servers: &IndexMap<String, McpServerConfig>) -> Value {
    let mut mcp = Map::new();
    for (name, server) in servers {
        let entry = match server {
            McpServerConfig::Stdio { command, args, env } => {
                let mut cmd = vec![command.clone()];
                cmd.extend(args.iter().cloned());
                json!({"type": "local", "command": cmd, "environment": env, "enabled": true})
            }
            McpServerConfig::Http { url, headers, .. } => {
                json!({"type": "remote", "url": url, "headers": headers, "enabled": true})
            }
        };
        mcp.insert(name.clone(), entry);
    }
    json!({ "mcp": mcp })
}

/// Options the OpenCode CLI has no flag for
fn unsupported_options(config: &LaunchConfig) -> Vec<&'static str> {
    let mut unsupported = Vec::new();
    if config.fork_session {
        unsupported.push("fork_session");
    }
    if config.max_turns.is_some() {
        unsupported.push("max_turns");
    }
    if !config.system_prompt.is_empty() || !config.append_system_prompt.is_empty() {
        unsupported.push("system_prompt");
    }
    if !config.allowed_tools.is_empty() || !config.disallowed_tools.is_empty() {
        unsupported.push("tool_filters");
    }
    if !config.permission_prompt_tool.is_empty() {
        unsupported.push("permission_prompt_tool");
    }
    unsupported
}

#[async_trait]
impl Provider for OpenCodeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenCode
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
        let output = run_with_timeout(cmd, VERSION_PROBE_TIMEOUT, "opencode --version")
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

        let ignored = unsupported_options(&config);
        if !ignored.is_empty() {
            tracing::debug!(?ignored, "options not supported by opencode");
        }

        let mut command = Command::new(path);
        command.args(build_args(&config)).envs(&config.env);
        if !config.mcp_servers.is_empty() {
            command.env(
                CONFIG_CONTENT_ENV,
                config_content(&config.mcp_servers).to_string(),
            );
        }
        if let Some(dir) = &config.working_dir {
            command.current_dir(dir);
        }

        let output_format = match config.output_format {
            OutputFormat::Text => OutputFormat::Text,
            OutputFormat::StreamJson | OutputFormat::Json => OutputFormat::StreamJson,
        };
        spawn_session(
            SpawnSpec {
                provider: BINARY,
                command,
                output_format,
                timeout: config.timeout,
                keep_alive: Vec::new(),
            },
            OpenCodeStream::default(),
            cancel,
        )
    }
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
