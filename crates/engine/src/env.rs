// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the engine crate.

use std::time::Duration;

/// Forces every approval request to be denied immediately (`"true"` enables)
pub const AUTO_DENY_ALL_ENV: &str = "MCP_AUTO_DENY_ALL";

pub fn auto_deny_all() -> bool {
    std::env::var(AUTO_DENY_ALL_ENV).is_ok_and(|v| v == "true")
}

/// How often StopAll rechecks the registry for sessions that appeared
/// after the first sweep
pub fn shutdown_poll() -> Duration {
    std::env::var("HLD_SHUTDOWN_POLL_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_millis(10))
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
