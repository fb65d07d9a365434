// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::PathBuf;
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: HLD_STATE_DIR > XDG_STATE_HOME/hld > ~/.local/state/hld
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Some(dir) = non_empty("HLD_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Some(xdg) = non_empty("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("hld"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/hld"))
}

pub fn database_path() -> Option<PathBuf> {
    non_empty("HUMANLAYER_DATABASE_PATH").map(PathBuf::from)
}

/// StopAll deadline override
pub fn shutdown_timeout() -> Result<Option<Duration>, LifecycleError> {
    parse::<u64>("HLD_SHUTDOWN_TIMEOUT_MS").map(|ms| ms.map(Duration::from_millis))
}

/// Permission expiry sweep interval override, in seconds
pub fn permission_check_secs() -> Result<Option<i64>, LifecycleError> {
    parse::<i64>("HLD_PERMISSION_CHECK_SECS")
}

fn non_empty(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}

fn parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, LifecycleError> {
    match non_empty(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| LifecycleError::InvalidEnv { name: var, value }),
    }
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
