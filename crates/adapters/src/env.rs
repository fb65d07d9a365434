// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the adapters crate.

use std::time::Duration;

fn parse_duration_ms(var: &str) -> Option<Duration> {
    std::env::var(var)
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Delay between the interrupt sent on cancellation and the kill that
/// follows it (default: 100ms).
pub fn interrupt_grace() -> Duration {
    parse_duration_ms("HLD_INTERRUPT_GRACE_MS").unwrap_or(Duration::from_millis(100))
}

/// Upper bound on captured stderr per subprocess (default: 64 KiB).
pub fn stderr_limit_bytes() -> usize {
    std::env::var("HLD_STDERR_LIMIT_BYTES")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .unwrap_or(64 * 1024)
}
