// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon log file: startup marker, size-based rotation and the tracing
//! subscriber.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::lifecycle::LifecycleError;

/// Prefix of the line appended before anything else on each start.
/// Full format: "--- hld: starting (pid: 12345) ---"
pub const STARTUP_MARKER_PREFIX: &str = "--- hld: starting (pid: ";

/// Rotate once the log grows past this many bytes
pub const MAX_LOG_SIZE: u64 = 10 * 1024 * 1024;

/// Rotated files kept: daemon.log.1 (newest) to daemon.log.3
const MAX_ROTATIONS: u32 = 3;

pub fn startup_marker(pid: u32) -> String {
    format!("{STARTUP_MARKER_PREFIX}{pid}) ---")
}

/// Append the startup marker, creating the log directory if needed
pub fn write_startup_marker(log_path: &Path) -> Result<(), LifecycleError> {
    if let Some(parent) = log_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)?;
    writeln!(file, "{}", startup_marker(std::process::id()))?;
    Ok(())
}

/// Write a startup failure synchronously; the non-blocking writer may not
/// flush before the process exits.
pub fn write_startup_error(log_path: &Path, error: &LifecycleError) {
    let Ok(mut file) = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_path)
    else {
        return;
    };
    let _ = writeln!(file, "ERROR failed to start daemon: {}", error);
}

fn rotated(log_path: &Path, n: u32) -> PathBuf {
    let mut name = log_path.as_os_str().to_owned();
    name.push(format!(".{n}"));
    PathBuf::from(name)
}

/// Shift `daemon.log` to `daemon.log.1` (and older rotations up by one)
/// when it exceeds [`MAX_LOG_SIZE`]. Failures are ignored.
pub fn rotate_log_if_needed(log_path: &Path) {
    let Ok(meta) = std::fs::metadata(log_path) else {
        return;
    };
    if meta.len() <= MAX_LOG_SIZE {
        return;
    }
    let _ = std::fs::remove_file(rotated(log_path, MAX_ROTATIONS));
    for n in (1..MAX_ROTATIONS).rev() {
        let from = rotated(log_path, n);
        if from.exists() {
            let _ = std::fs::rename(&from, rotated(log_path, n + 1));
        }
    }
    let _ = std::fs::rename(log_path, rotated(log_path, 1));
}

/// Install the global subscriber writing to `log_path`. `RUST_LOG`
/// overrides the default `info` filter.
pub fn setup_logging(
    log_path: &Path,
) -> Result<tracing_appender::non_blocking::WorkerGuard, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let dir = log_path.parent().ok_or(LifecycleError::NoStateDir)?;
    std::fs::create_dir_all(dir)?;
    let file_name = log_path.file_name().ok_or(LifecycleError::NoStateDir)?;

    let file_appender = tracing_appender::rolling::never(dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
        .init();

    Ok(guard)
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
