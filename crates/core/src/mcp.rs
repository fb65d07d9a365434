// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MCP server launch specs attached to sessions.

use crate::id::{RunId, SessionId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Environment variable carrying the owning session's run id
pub const RUN_ID_ENV: &str = "HUMANLAYER_RUN_ID";

/// How the assistant reaches one MCP server.
///
/// Serialized in the shape the assistant's `--mcp-config` file expects:
/// stdio servers as `{command, args, env}`, HTTP servers as
/// `{type: "http", url, headers}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum McpServerConfig {
    Http {
        #[serde(rename = "type")]
        transport: HttpTransport,
        url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Stdio {
        command: String,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        args: Vec<String>,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        env: BTreeMap<String, String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HttpTransport {
    Http,
}

impl McpServerConfig {
    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        McpServerConfig::Stdio {
            command: command.into(),
            args,
            env: BTreeMap::new(),
        }
    }

    pub fn http(url: impl Into<String>) -> Self {
        McpServerConfig::Http {
            transport: HttpTransport::Http,
            url: url.into(),
            headers: BTreeMap::new(),
        }
    }

    /// Point the server at `run_id`. HTTP servers carry no env and are left as is.
    pub fn stamp_run_id(&mut self, run_id: &RunId) {
        if let McpServerConfig::Stdio { env, .. } = self {
            env.insert(RUN_ID_ENV.to_string(), run_id.to_string());
        }
    }

    pub fn env(&self) -> Option<&BTreeMap<String, String>> {
        match self {
            McpServerConfig::Stdio { env, .. } => Some(env),
            McpServerConfig::Http { .. } => None,
        }
    }
}

/// Persisted MCP server row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServer {
    #[serde(default)]
    pub id: i64,
    pub session_id: SessionId,
    pub name: String,
    pub config: McpServerConfig,
}

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod tests;
