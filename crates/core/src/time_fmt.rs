// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared human-readable duration formatting.

use std::time::Duration;

/// Format a duration compactly: `"150ms"`, `"5s"`, `"2m30s"`, `"1h5m"`.
///
/// Sub-second durations keep millisecond precision since timeouts in tests
/// and interrupt grace periods live in that range.
pub fn format_duration(d: Duration) -> String {
    let ms = d.as_millis() as u64;
    if ms < 1000 {
        return format!("{}ms", ms);
    }
    let secs = d.as_secs();
    if secs < 60 {
        let rem_ms = ms % 1000;
        if rem_ms == 0 {
            format!("{}s", secs)
        } else {
            let frac = format!("{:03}", rem_ms);
            format!("{}.{}s", secs, frac.trim_end_matches('0'))
        }
    } else if secs < 3600 {
        let (m, s) = (secs / 60, secs % 60);
        if s > 0 {
            format!("{}m{}s", m, s)
        } else {
            format!("{}m", m)
        }
    } else {
        let (h, m) = (secs / 3600, (secs % 3600) / 60);
        if m > 0 {
            format!("{}h{}m", h, m)
        } else {
            format!("{}h", h)
        }
    }
}

#[cfg(test)]
#[path = "time_fmt_tests.rs"]
mod tests;
