// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session manager: launches, continues, interrupts and stops assistant
//! sessions, and owns every per-session collaborator.

use crate::approvals::ApprovalService;
use crate::bus::EventBus;
use crate::env;
use crate::error::SessionError;
use crate::expiry::PermissionExpiryMonitor;
use crate::injector::QueryInjector;
use crate::lifecycle::Lifecycle;
use crate::monitor::SessionMonitor;
use crate::processor::EventProcessor;
use crate::registry::{ActiveRegistry, ActiveSession};
use crate::request::{expiry_after, merge_continue, ContinueConfig, SessionConfig};
use hl_adapters::{ProcessHandle, Provider};
use hl_core::{
    calculate_summary, BusEvent, BusEventType, Clock, ConversationEvent, IdGen, ProviderKind,
    ResultEvent, RunId, Session, SessionId, SessionStatus, SessionUpdate,
};
use hl_storage::Store;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// One provider per kind
#[derive(Clone, Default)]
pub struct Providers {
    by_kind: HashMap<ProviderKind, Arc<dyn Provider>>,
}

impl Providers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `provider` under its own kind, replacing any previous one
    pub fn register(&mut self, provider: Arc<dyn Provider>) {
        self.by_kind.insert(provider.kind(), provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn Provider>> {
        self.by_kind.get(&kind).cloned()
    }

    pub fn kinds(&self) -> Vec<ProviderKind> {
        let mut kinds: Vec<_> = self.by_kind.keys().copied().collect();
        kinds.sort_by_key(|k| k.as_str());
        kinds
    }
}

#[derive(Debug, Clone)]
pub struct ManagerConfig {
    /// Mirror every provider frame into the raw events table
    pub store_raw_events: bool,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            store_raw_events: true,
        }
    }
}

/// Changes to a session's permission elevation. `None` leaves a field as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsUpdate {
    pub auto_accept_edits: Option<bool>,
    pub dangerously_skip_permissions: Option<bool>,
    /// Lifetime of a dangerous-skip grant; none means until revoked
    pub dangerously_skip_permissions_timeout: Option<Duration>,
}

struct Started {
    session: Session,
    handle: Arc<dyn ProcessHandle>,
    monitor: JoinHandle<()>,
}

struct Inner<C: Clock, G: IdGen> {
    store: Store,
    bus: EventBus,
    clock: C,
    ids: G,
    providers: Providers,
    registry: Arc<ActiveRegistry>,
    injector: Arc<QueryInjector<C>>,
    lifecycle: Lifecycle<C>,
    approvals: ApprovalService<C, G>,
    config: ManagerConfig,
}

pub struct SessionManager<C: Clock, G: IdGen> {
    inner: Arc<Inner<C, G>>,
}

impl<C: Clock, G: IdGen> Clone for SessionManager<C, G> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<C: Clock, G: IdGen> SessionManager<C, G> {
    pub fn new(
        store: Store,
        bus: EventBus,
        providers: Providers,
        clock: C,
        ids: G,
        config: ManagerConfig,
    ) -> Self {
        let registry = Arc::new(ActiveRegistry::new());
        let injector = Arc::new(QueryInjector::new(store.clone(), clock.clone()));
        let lifecycle = Lifecycle::new(
            store.clone(),
            bus.clone(),
            clock.clone(),
            Arc::clone(&registry),
            Arc::clone(&injector),
        );
        let approvals = ApprovalService::new(store.clone(), bus.clone(), clock.clone(), ids.clone());
        Self {
            inner: Arc::new(Inner {
                store,
                bus,
                clock,
                ids,
                providers,
                registry,
                injector,
                lifecycle,
                approvals,
                config,
            }),
        }
    }

    pub fn store(&self) -> &Store {
        &self.inner.store
    }

    pub fn bus(&self) -> &EventBus {
        &self.inner.bus
    }

    pub fn approvals(&self) -> &ApprovalService<C, G> {
        &self.inner.approvals
    }

    /// Expiry monitor sharing this manager's store, bus and clock
    pub fn expiry_monitor(&self, interval: Duration) -> PermissionExpiryMonitor<C> {
        PermissionExpiryMonitor::new(
            self.inner.store.clone(),
            self.inner.bus.clone(),
            self.inner.clock.clone(),
            interval,
        )
    }

    pub fn is_active(&self, id: &SessionId) -> bool {
        self.inner.registry.contains(id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.registry.len()
    }

    /// Start a new session. Returns once the process is running; the
    /// conversation is recorded in the background.
    pub async fn launch(
        &self,
        cancel: &CancellationToken,
        config: SessionConfig,
    ) -> Result<Session, SessionError> {
        Ok(self.launch_new(cancel, config).await?.session)
    }

    /// Launch and wait for the run to finish.
    ///
    /// Error results come back as `Ok` with `is_error` set; only process
    /// failures, timeouts and cancellation are errors.
    pub async fn launch_and_wait(
        &self,
        cancel: &CancellationToken,
        config: SessionConfig,
    ) -> Result<ResultEvent, SessionError> {
        let timeout = config.timeout;
        let started = self.launch_new(cancel, config).await?;
        let id = started.session.id.clone();

        let outcome = match timeout {
            Some(limit) => {
                tokio::select! {
                    outcome = started.handle.wait() => outcome.map_err(SessionError::from_provider),
                    _ = tokio::time::sleep(limit) => {
                        let err = SessionError::Timeout(limit);
                        if let Err(e) = self.inner.lifecycle.handle_session_error(&id, &err) {
                            tracing::error!(session_id = %id, error = %e, "failed to record timeout");
                        }
                        if let Err(e) = started.handle.kill().await {
                            tracing::warn!(session_id = %id, error = %e, "kill after timeout");
                        }
                        Err(err)
                    }
                }
            }
            None => started
                .handle
                .wait()
                .await
                .map_err(SessionError::from_provider),
        };

        if let Err(e) = started.monitor.await {
            tracing::error!(session_id = %id, error = %e, "monitor task failed");
        }
        outcome
    }

    /// Write a draft row. Nothing is launched until [`Self::launch_draft`].
    pub fn create_draft(&self, mut config: SessionConfig) -> Result<Session, SessionError> {
        let (id, run_id) = self.allocate_ids();
        config.stamp_run_id(&run_id);
        let mut session = config.to_session(id, run_id, self.inner.clock.now());
        session.status = SessionStatus::Draft;
        self.inner.store.create_session(&session)?;
        self.inner
            .store
            .store_mcp_servers(&session.id, &config.mcp_server_list())?;
        tracing::info!(session_id = %session.id, "draft created");
        Ok(session)
    }

    /// Launch a draft with `prompt` as its query.
    pub async fn launch_draft(
        &self,
        cancel: &CancellationToken,
        id: &SessionId,
        prompt: &str,
        create_missing_dir: bool,
    ) -> Result<Session, SessionError> {
        let store = &self.inner.store;
        let draft = store.get_session(id)?;
        if draft.status != SessionStatus::Draft {
            return Err(SessionError::InvalidState {
                id: id.clone(),
                status: draft.status,
                operation: "launch draft",
            });
        }
        store.update_session(
            id,
            &SessionUpdate {
                query: Some(prompt.to_string()),
                summary: Some(calculate_summary(prompt)),
                ..SessionUpdate::default()
            },
        )?;

        if !draft.working_dir.is_empty() {
            let dir = PathBuf::from(&draft.working_dir);
            if !dir.is_dir() {
                if !create_missing_dir {
                    return Err(SessionError::DirectoryNotFound(dir));
                }
                std::fs::create_dir_all(&dir)?;
                tracing::info!(session_id = %id, dir = %dir.display(), "created working directory");
            }
        }

        let mcp = store.get_mcp_servers(id)?;
        let mut session = store.get_session(id)?;
        let mut config = SessionConfig::from_draft(&session, &mcp);
        config.stamp_run_id(&session.run_id);
        self.inner.lifecycle.transition_to_starting(id)?;
        session.status = SessionStatus::Starting;
        Ok(self.start(cancel, session, config).await?.session)
    }

    /// Continue (or fork) a finished session in a new child session.
    pub async fn continue_session(
        &self,
        cancel: &CancellationToken,
        request: ContinueConfig,
    ) -> Result<Session, SessionError> {
        let store = &self.inner.store;
        let parent = store.get_session(&request.parent_session_id)?;
        if !parent.status.can_continue() {
            return Err(SessionError::InvalidState {
                id: parent.id,
                status: parent.status,
                operation: "continue",
            });
        }
        if parent.working_dir.is_empty() {
            return Err(SessionError::MissingWorkingDir(parent.id));
        }
        if request.query.trim().is_empty() {
            return Err(SessionError::InvalidRequest("query is required".to_string()));
        }

        let parent_mcp = store.get_mcp_servers(&parent.id)?;
        let config = merge_continue(&parent, &parent_mcp, &request, self.inner.clock.now());
        tracing::info!(
            parent_session_id = %parent.id,
            fork = request.fork_session,
            "continuing session"
        );
        Ok(self.launch_new(cancel, config).await?.session)
    }

    /// Interrupt a running session. It completes once the process exits.
    pub async fn interrupt_session(&self, id: &SessionId) -> Result<(), SessionError> {
        let session = self.inner.store.get_session(id)?;
        if !session.status.is_interruptible() {
            return Err(SessionError::InvalidState {
                id: id.clone(),
                status: session.status,
                operation: "interrupt",
            });
        }
        let active = self
            .inner
            .registry
            .get(id)
            .ok_or_else(|| SessionError::NotActive(id.clone()))?;
        self.inner.lifecycle.transition_to_completing(id)?;
        active
            .handle
            .interrupt()
            .await
            .map_err(SessionError::from_provider)
    }

    /// Interrupt every running session and wait for all of them to exit.
    ///
    /// Sessions registered while waiting are picked up too. Whatever is
    /// left at the deadline is killed and reported.
    pub async fn stop_all(&self, deadline: Duration) -> Result<(), SessionError> {
        let deadline_at = tokio::time::Instant::now() + deadline;
        let mut interrupted = HashSet::new();
        tracing::info!(
            active = self.inner.registry.len(),
            deadline_ms = deadline.as_millis() as u64,
            "stopping all sessions"
        );

        loop {
            for (id, active) in self.inner.registry.snapshot() {
                if interrupted.contains(&id) {
                    continue;
                }
                match self.inner.store.get_session(&id) {
                    Ok(session) if session.status.is_interruptible() => {}
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::warn!(session_id = %id, error = %e, "cannot read session during shutdown");
                        continue;
                    }
                }
                if let Err(e) = self.inner.lifecycle.transition_to_completing(&id) {
                    tracing::warn!(session_id = %id, error = %e, "failed to mark session completing");
                }
                if let Err(e) = active.handle.interrupt().await {
                    tracing::warn!(session_id = %id, error = %e, "interrupt failed");
                }
                interrupted.insert(id);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline_at && !self.inner.registry.is_empty() {
                break;
            }
            let recheck = (now + env::shutdown_poll()).min(deadline_at);
            if self.inner.registry.wait_empty(recheck).await {
                tracing::info!("all sessions stopped");
                return Ok(());
            }
        }

        let remaining = self.force_kill_all().await;
        if remaining == 0 {
            return Ok(());
        }
        tracing::warn!(remaining, "shutdown deadline exceeded");
        Err(SessionError::DeadlineExceeded { remaining })
    }

    /// Kill every registered process once. Returns how many there were.
    async fn force_kill_all(&self) -> usize {
        let active = self.inner.registry.snapshot();
        for (id, session) in &active {
            tracing::warn!(session_id = %id, "force killing session");
            if let Err(e) = session.handle.kill().await {
                tracing::warn!(session_id = %id, error = %e, "kill failed");
            }
        }
        active.len()
    }

    /// Change a session's permission elevation and announce it
    pub fn update_session_settings(
        &self,
        id: &SessionId,
        settings: SettingsUpdate,
    ) -> Result<Session, SessionError> {
        let store = &self.inner.store;
        let current = store.get_session(id)?;
        let expires_at = match settings.dangerously_skip_permissions {
            Some(true) => Some(
                settings
                    .dangerously_skip_permissions_timeout
                    .and_then(|t| expiry_after(self.inner.clock.now(), t)),
            ),
            Some(false) => Some(None),
            None => None,
        };
        let update = SessionUpdate {
            auto_accept_edits: settings.auto_accept_edits,
            dangerously_skip_permissions: settings.dangerously_skip_permissions,
            dangerously_skip_permissions_expires_at: expires_at,
            ..SessionUpdate::default()
        };
        if update.is_empty() {
            return Ok(current);
        }
        store.update_session(id, &update)?;

        let updated = store.get_session(id)?;
        tracing::info!(
            session_id = %id,
            auto_accept_edits = updated.auto_accept_edits,
            dangerously_skip_permissions = updated.dangerously_skip_permissions,
            "session settings updated"
        );
        self.inner.bus.publish(
            BusEvent::new(BusEventType::SessionSettingsChanged)
                .with("session_id", id.as_str())
                .with("run_id", updated.run_id.as_str())
                .with("reason", "user_update")
                .with_opt("auto_accept_edits", settings.auto_accept_edits)
                .with_opt(
                    "dangerously_skip_permissions",
                    settings.dangerously_skip_permissions,
                )
                .with_opt(
                    "dangerously_skip_permissions_expires_at",
                    updated
                        .dangerously_skip_permissions_expires_at
                        .map(|t| t.to_rfc3339()),
                ),
        );
        Ok(updated)
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Session, SessionError> {
        Ok(self.inner.store.get_session(id)?)
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>, SessionError> {
        Ok(self.inner.store.list_sessions()?)
    }

    pub fn search_sessions(&self, query: &str, limit: usize) -> Result<Vec<Session>, SessionError> {
        Ok(self.inner.store.search_sessions_by_title(query, limit)?)
    }

    /// Full conversation of a session, including its ancestors' turns
    pub fn get_session_conversation(
        &self,
        id: &SessionId,
    ) -> Result<Vec<ConversationEvent>, SessionError> {
        Ok(self.inner.store.get_session_conversation(id)?)
    }

    fn allocate_ids(&self) -> (SessionId, RunId) {
        (
            SessionId::new(self.inner.ids.next()),
            RunId::new(self.inner.ids.next()),
        )
    }

    async fn launch_new(
        &self,
        cancel: &CancellationToken,
        mut config: SessionConfig,
    ) -> Result<Started, SessionError> {
        let (id, run_id) = self.allocate_ids();
        config.stamp_run_id(&run_id);
        let session = config.to_session(id, run_id, self.inner.clock.now());
        self.inner.store.create_session(&session)?;
        self.inner
            .store
            .store_mcp_servers(&session.id, &config.mcp_server_list())?;
        self.start(cancel, session, config).await
    }

    /// Launch the provider for a `starting` row and spawn its monitor
    async fn start(
        &self,
        cancel: &CancellationToken,
        session: Session,
        config: SessionConfig,
    ) -> Result<Started, SessionError> {
        let inner = &self.inner;
        let id = session.id.clone();
        inner.injector.store_pending(&id, &config.query);

        let Some(provider) = inner.providers.get(session.provider) else {
            let err = SessionError::ProviderUnavailable(session.provider);
            self.abandon(&id, &err);
            return Err(err);
        };

        let scope = cancel.child_token();
        let launch = config.to_launch_config(&session.run_id);
        let launched = match provider.launch(scope.clone(), launch).await {
            Ok(launched) => launched,
            Err(e) => {
                self.abandon(&id, &e);
                return Err(SessionError::Provider(e));
            }
        };

        let handle = Arc::clone(&launched.handle);
        inner.registry.insert(
            id.clone(),
            ActiveSession {
                handle: Arc::clone(&handle),
                scope,
            },
        );
        tracing::info!(
            session_id = %id,
            run_id = %session.run_id,
            provider = %session.provider,
            resume = !config.resume_session_id.is_empty(),
            "session launched"
        );

        let processor = EventProcessor::new(
            inner.store.clone(),
            inner.bus.clone(),
            inner.clock.clone(),
            inner.lifecycle.clone(),
            &session,
            inner.config.store_raw_events,
        );
        let monitor = SessionMonitor {
            store: inner.store.clone(),
            lifecycle: inner.lifecycle.clone(),
            injector: Arc::clone(&inner.injector),
            processor,
            session_id: id,
            query: config.query,
            started: std::time::Instant::now(),
        };
        let monitor = tokio::spawn(monitor.run(Arc::clone(&handle), launched.events));
        Ok(Started {
            session,
            handle,
            monitor,
        })
    }

    /// Fail a session whose process never started
    fn abandon(&self, id: &SessionId, error: &dyn std::fmt::Display) {
        if let Err(e) = self.inner.lifecycle.handle_session_error(id, error) {
            tracing::error!(session_id = %id, error = %e, "failed to mark session failed");
        }
        self.inner.lifecycle.cleanup(id);
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
