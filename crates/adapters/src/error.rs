// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use hl_core::format_duration;
use std::time::Duration;
use thiserror::Error;

/// Errors from provider operations.
///
/// `Clone` because a session's outcome is cached and handed to every
/// waiter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProviderError {
    #[error("provider unavailable: {0} binary not found")]
    Unavailable(&'static str),
    #[error("launch failed: {0}")]
    LaunchFailed(String),
    #[error("invalid launch config: {0}")]
    InvalidConfig(String),
    #[error("parse failed: {0}")]
    ParseFailed(String),
    #[error("session timed out after {}", format_duration(*.0))]
    Timeout(Duration),
    #[error("session cancelled: {0}")]
    Cancelled(String),
    /// Non-empty stderr from a run that produced no successful result
    #[error("{0}")]
    Stderr(String),
    #[error("process exited with {0} and no result")]
    Exited(String),
    #[error("process stream ended without a result")]
    NoResult,
    #[error("signal failed: {0}")]
    Signal(String),
    #[error("process killed")]
    Killed,
    /// Parser or reader task died (e.g. panicked)
    #[error("stream reader failed: {0}")]
    Reader(String),
}

impl ProviderError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProviderError::Cancelled(_))
    }
}
