// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the session supervisor

use hl_adapters::ProviderError;
use hl_core::{format_duration, ProviderKind, SessionId, SessionStatus};
use hl_storage::StoreError;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by the session manager and its collaborators
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("no provider registered for {0}")]
    ProviderUnavailable(ProviderKind),
    #[error("session {id} is {status}; cannot {operation}")]
    InvalidState {
        id: SessionId,
        status: SessionStatus,
        operation: &'static str,
    },
    #[error("session {0} has no working directory")]
    MissingWorkingDir(SessionId),
    #[error("session {0} has no active process")]
    NotActive(SessionId),
    #[error("working directory does not exist: {}", .0.display())]
    DirectoryNotFound(PathBuf),
    #[error("no session for run {0}")]
    UnknownRun(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("session timed out after {}", format_duration(*.0))]
    Timeout(Duration),
    #[error("session cancelled: {0}")]
    Cancelled(String),
    #[error("shutdown deadline exceeded with {remaining} sessions still active")]
    DeadlineExceeded { remaining: usize },
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Lift provider timeouts and cancellations to their session-level kinds
    pub fn from_provider(err: ProviderError) -> Self {
        match err {
            ProviderError::Timeout(d) => SessionError::Timeout(d),
            ProviderError::Cancelled(cause) => SessionError::Cancelled(cause),
            other => SessionError::Provider(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, SessionError::Store(e) if e.is_not_found())
    }
}
