// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon configuration.
//!
//! Precedence, highest first: command-line flag, environment variable,
//! `config.toml` in the state directory, built-in default.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::env;
use crate::lifecycle::LifecycleError;

pub const CONFIG_FILE: &str = "config.toml";
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// Contents of the optional `config.toml`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub shutdown_timeout_ms: Option<u64>,
    pub permission_check_interval_secs: Option<i64>,
    pub claude_path: Option<PathBuf>,
    pub opencode_path: Option<PathBuf>,
}

impl FileConfig {
    /// Read `path`; a missing file is an empty config
    pub fn read(path: &Path) -> Result<Self, LifecycleError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(e.into()),
        };
        toml::from_str(&text).map_err(|source| LifecycleError::Config {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Values given on the command line
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub database_path: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/hld)
    pub state_dir: PathBuf,
    pub database_path: PathBuf,
    /// Lock/PID file
    pub lock_path: PathBuf,
    pub log_path: PathBuf,
    /// Deadline handed to StopAll on shutdown
    pub shutdown_timeout: Duration,
    pub permission_check_interval: Duration,
    /// Explicit assistant binaries; discovered on PATH when unset
    pub claude_path: Option<PathBuf>,
    pub opencode_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration for the user-level daemon.
    pub fn load(overrides: &Overrides) -> Result<Self, LifecycleError> {
        let state_dir = env::state_dir()?;
        let file = FileConfig::read(&state_dir.join(CONFIG_FILE))?;
        Self::resolve(state_dir, file, overrides)
    }

    /// Layer environment and flags over `file`
    pub fn resolve(
        state_dir: PathBuf,
        file: FileConfig,
        overrides: &Overrides,
    ) -> Result<Self, LifecycleError> {
        let database_path = overrides
            .database_path
            .clone()
            .or_else(env::database_path)
            .or(file.database_path)
            .unwrap_or_else(|| state_dir.join("daemon.db"));
        let shutdown_timeout = env::shutdown_timeout()?
            .or(file.shutdown_timeout_ms.map(Duration::from_millis))
            .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT);
        let check_secs = env::permission_check_secs()?
            .or(file.permission_check_interval_secs)
            .unwrap_or(0);

        Ok(Self {
            database_path,
            lock_path: state_dir.join("daemon.pid"),
            log_path: state_dir.join("daemon.log"),
            shutdown_timeout,
            permission_check_interval: hl_engine::expiry::interval_from_secs(check_secs),
            claude_path: file.claude_path,
            opencode_path: file.opencode_path,
            state_dir,
        })
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
