// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Provider abstraction over assistant CLIs.
//!
//! ```text
//! Provider::launch ──▶ LaunchedSession
//!                        ├── handle: Arc<dyn ProcessHandle>  (wait / interrupt / kill)
//!                        └── events: mpsc::Receiver<StreamEvent>  (closed once at EOF)
//! ```
//!
//! `ProcessHandle::wait` resolves only after the subprocess has exited and
//! the parser has closed the events channel, and caches its outcome.

use crate::config::LaunchConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use hl_core::{AssistantSessionId, ProviderKind, ResultEvent, StreamEvent};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Capacity of the per-session events channel
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Final outcome of one assistant run
pub type RunOutcome = Result<ResultEvent, ProviderError>;

/// A launched assistant run
pub struct LaunchedSession {
    pub handle: Arc<dyn ProcessHandle>,
    pub events: mpsc::Receiver<StreamEvent>,
}

impl std::fmt::Debug for LaunchedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LaunchedSession")
            .field("id", &self.handle.id())
            .finish_non_exhaustive()
    }
}

/// Control surface of one running assistant subprocess
#[async_trait]
pub trait ProcessHandle: Send + Sync + 'static {
    /// Assistant-minted session id; empty until the first event reports it
    fn id(&self) -> AssistantSessionId;

    /// Wait for exit and parser EOF. Repeated calls return the cached outcome.
    async fn wait(&self) -> RunOutcome;

    /// Ask the assistant to stop gracefully
    async fn interrupt(&self) -> Result<(), ProviderError>;

    /// Terminate the subprocess
    async fn kill(&self) -> Result<(), ProviderError>;
}

/// One assistant vendor CLI
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn kind(&self) -> ProviderKind;

    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn is_available(&self) -> bool;

    fn path(&self) -> Option<PathBuf>;

    /// Output of `<binary> --version`
    async fn version(&self) -> Result<String, ProviderError>;

    /// Start a run. Cancelling `cancel` interrupts the subprocess and kills
    /// it after the interrupt grace period.
    async fn launch(
        &self,
        cancel: CancellationToken,
        config: LaunchConfig,
    ) -> Result<LaunchedSession, ProviderError>;
}
