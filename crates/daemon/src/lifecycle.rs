// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: startup and shutdown.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use hl_adapters::{ClaudeProvider, OpenCodeProvider, Provider, TracedProvider};
use hl_core::{SystemClock, UuidIdGen};
use hl_engine::{EventBus, ManagerConfig, Providers, SessionError, SessionManager};
use hl_storage::{Store, StoreError};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::Config;

/// Session manager with the production clock and id source
pub type DaemonManager = SessionManager<SystemClock, UuidIdGen>;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("could not determine state directory")]
    NoStateDir,

    #[error("failed to acquire lock: daemon already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("invalid config {path}: {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {name}: {value:?}")]
    InvalidEnv { name: &'static str, value: String },

    #[error("store error: {0}")]
    Store(#[from] StoreError),

    #[error("shutdown error: {0}")]
    Shutdown(#[from] SessionError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A running daemon: holds the lock for as long as it lives.
pub struct Daemon {
    pub config: Config,
    // Held for the exclusive lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
    pub manager: DaemonManager,
    pub start_time: Instant,
    expiry_cancel: CancellationToken,
    expiry_task: JoinHandle<()>,
}

/// Start the daemon
pub async fn startup(config: &Config) -> Result<Daemon, LifecycleError> {
    match startup_inner(config).await {
        Ok(daemon) => Ok(daemon),
        Err(e) => {
            // The lock file belongs to the running daemon
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

async fn startup_inner(config: &Config) -> Result<Daemon, LifecycleError> {
    std::fs::create_dir_all(&config.state_dir)?;

    // Open without truncating so a running daemon's PID survives a failed try
    let mut lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file
        .try_lock_exclusive()
        .map_err(LifecycleError::LockFailed)?;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;

    let store = Store::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "store opened");

    let providers = build_providers(config);
    for kind in providers.kinds() {
        if let Some(provider) = providers.get(kind) {
            info!(
                provider = provider.name(),
                available = provider.is_available(),
                path = ?provider.path(),
                "provider registered"
            );
        }
    }

    let manager = SessionManager::new(
        store,
        EventBus::new(),
        providers,
        SystemClock,
        UuidIdGen,
        ManagerConfig::default(),
    );

    let expiry_cancel = CancellationToken::new();
    let monitor = manager.expiry_monitor(config.permission_check_interval);
    let expiry_task = tokio::spawn(monitor.run(expiry_cancel.clone()));

    info!("daemon started");
    Ok(Daemon {
        config: config.clone(),
        lock_file,
        manager,
        start_time: Instant::now(),
        expiry_cancel,
        expiry_task,
    })
}

/// Claude and OpenCode, each wrapped for tracing
pub fn build_providers(config: &Config) -> Providers {
    let claude = match &config.claude_path {
        Some(path) => ClaudeProvider::with_path(path),
        None => ClaudeProvider::discover(),
    };
    let opencode = match &config.opencode_path {
        Some(path) => OpenCodeProvider::with_path(path),
        None => OpenCodeProvider::discover(),
    };

    let mut providers = Providers::new();
    providers.register(Arc::new(TracedProvider::new(claude)) as Arc<dyn Provider>);
    providers.register(Arc::new(TracedProvider::new(opencode)) as Arc<dyn Provider>);
    providers
}

impl Daemon {
    /// Stop every session within the shutdown timeout, stop the expiry
    /// monitor and release the lock.
    ///
    /// Sessions still alive at the deadline are killed and logged. The lock
    /// is released whatever StopAll returns.
    pub async fn shutdown(self) -> Result<(), LifecycleError> {
        info!(
            active = self.manager.active_count(),
            timeout_ms = self.config.shutdown_timeout.as_millis() as u64,
            "shutting down daemon"
        );

        let stopped = match self.manager.stop_all(self.config.shutdown_timeout).await {
            Err(SessionError::DeadlineExceeded { remaining }) => {
                warn!(remaining, "sessions force-killed at shutdown deadline");
                Ok(())
            }
            other => other,
        };

        self.expiry_cancel.cancel();
        if let Err(e) = self.expiry_task.await {
            warn!(error = %e, "permission expiry monitor task failed");
        }

        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!(error = %e, "failed to remove PID file");
            }
        }
        // Lock is released when lock_file drops here
        info!(uptime_secs = self.start_time.elapsed().as_secs(), "daemon shutdown complete");
        stopped.map_err(LifecycleError::from)
    }
}

fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
