// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for end-to-end specs: a real on-disk store, the fake
//! provider and a controllable clock wired into one session manager.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use hl_adapters::FakeProvider;
use hl_core::{FakeClock, SequentialIdGen, SessionId, SessionStatus};
use hl_engine::{EventBus, ManagerConfig, Providers, SessionConfig, SessionManager};
use hl_storage::Store;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

// Spec polling
pub const SPEC_POLL_INTERVAL_MS: u64 = 5;
pub const SPEC_WAIT_MAX_MS: u64 = 2000;

pub type SpecManager = SessionManager<FakeClock, SequentialIdGen>;

pub struct Harness {
    pub dir: TempDir,
    pub manager: SpecManager,
    pub provider: FakeProvider,
    pub store: Store,
    pub bus: EventBus,
    pub clock: FakeClock,
    pub scope: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::open(&dir.path().join("daemon.db")).unwrap();
        let bus = EventBus::new();
        let clock = FakeClock::default();
        let provider = FakeProvider::new();
        let mut providers = Providers::new();
        providers.register(Arc::new(provider.clone()));
        let manager = SessionManager::new(
            store.clone(),
            bus.clone(),
            providers,
            clock.clone(),
            SequentialIdGen::new("spec"),
            ManagerConfig::default(),
        );
        Self {
            dir,
            manager,
            provider,
            store,
            bus,
            clock,
            scope: CancellationToken::new(),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("daemon.db")
    }

    pub fn workdir(&self) -> &Path {
        self.dir.path()
    }

    /// A launch request rooted in the harness directory
    pub fn request(&self, query: &str) -> SessionConfig {
        SessionConfig {
            working_dir: Some(self.workdir().to_path_buf()),
            ..SessionConfig::new(query)
        }
    }

    pub fn status(&self, id: &SessionId) -> SessionStatus {
        self.store.get_session(id).unwrap().status
    }

    pub async fn wait_for_status(&self, id: &SessionId, status: SessionStatus) {
        let done = wait_for(|| self.status(id) == status).await;
        assert!(done, "session {id} never reached {status}; now {}", self.status(id));
    }

    pub async fn wait_for_cleanup(&self, id: &SessionId) {
        let done = wait_for(|| !self.manager.is_active(id)).await;
        assert!(done, "session {id} still active");
    }
}

/// Poll `check` until it holds or the spec wait budget runs out
pub async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let rounds = SPEC_WAIT_MAX_MS / SPEC_POLL_INTERVAL_MS;
    for _ in 0..rounds {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(SPEC_POLL_INTERVAL_MS)).await;
    }
    check()
}
