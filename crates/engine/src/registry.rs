// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Active-process registry: `session_id -> live process handle`.

use hl_adapters::ProcessHandle;
use hl_core::SessionId;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Notify;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// A running session's process and its cancel scope
#[derive(Clone)]
pub struct ActiveSession {
    pub handle: Arc<dyn ProcessHandle>,
    pub scope: CancellationToken,
}

#[derive(Default)]
pub struct ActiveRegistry {
    entries: Mutex<HashMap<SessionId, ActiveSession>>,
    changed: Notify,
}

impl ActiveRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, id: SessionId, session: ActiveSession) {
        self.entries.lock().insert(id, session);
        self.changed.notify_waiters();
    }

    pub fn remove(&self, id: &SessionId) -> Option<ActiveSession> {
        let removed = self.entries.lock().remove(id);
        if removed.is_some() {
            self.changed.notify_waiters();
        }
        removed
    }

    pub fn get(&self, id: &SessionId) -> Option<ActiveSession> {
        self.entries.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.entries.lock().contains_key(id)
    }

    pub fn snapshot(&self) -> Vec<(SessionId, ActiveSession)> {
        self.entries
            .lock()
            .iter()
            .map(|(id, s)| (id.clone(), s.clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Wait until the registry is empty or `deadline` passes.
    pub async fn wait_empty(&self, deadline: Instant) -> bool {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, notified).await.is_err() {
                return self.is_empty();
            }
        }
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
