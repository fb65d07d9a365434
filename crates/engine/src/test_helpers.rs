// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for the engine crate.

use crate::bus::{EventBus, Subscription};
use crate::injector::QueryInjector;
use crate::lifecycle::Lifecycle;
use crate::manager::{ManagerConfig, Providers, SessionManager};
use crate::registry::ActiveRegistry;
use hl_adapters::FakeProvider;
use hl_core::{BusEvent, BusEventType, EventFilter, FakeClock, SequentialIdGen, SessionId, SessionStatus};
use hl_storage::Store;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Store, bus and lifecycle wired over an in-memory database.
pub(crate) struct Harness {
    pub store: Store,
    pub bus: EventBus,
    pub clock: FakeClock,
    pub registry: Arc<ActiveRegistry>,
    pub injector: Arc<QueryInjector<FakeClock>>,
    pub lifecycle: Lifecycle<FakeClock>,
    pub scope: CancellationToken,
}

impl Harness {
    pub fn new() -> Self {
        let store = Store::in_memory().unwrap();
        let bus = EventBus::new();
        let clock = FakeClock::default();
        let registry = Arc::new(ActiveRegistry::new());
        let injector = Arc::new(QueryInjector::new(store.clone(), clock.clone()));
        let lifecycle = Lifecycle::new(
            store.clone(),
            bus.clone(),
            clock.clone(),
            Arc::clone(&registry),
            Arc::clone(&injector),
        );
        Self {
            store,
            bus,
            clock,
            registry,
            injector,
            lifecycle,
            scope: CancellationToken::new(),
        }
    }

    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe(&self.scope, EventFilter::all())
    }

    pub fn status(&self, id: &str) -> SessionStatus {
        self.store.get_session(&SessionId::new(id)).unwrap().status
    }
}

/// Everything currently buffered on a subscription
pub(crate) fn drain(sub: &mut Subscription) -> Vec<BusEvent> {
    let mut events = Vec::new();
    while let Ok(event) = sub.events.try_recv() {
        events.push(event);
    }
    events
}

/// `(old, new)` pairs of the status changes in `events`
pub(crate) fn transitions(events: &[BusEvent]) -> Vec<(String, String)> {
    events
        .iter()
        .filter(|e| e.event_type == BusEventType::SessionStatusChanged)
        .map(|e| {
            (
                e.get_str("old_status").unwrap_or_default().to_string(),
                e.get_str("new_status").unwrap_or_default().to_string(),
            )
        })
        .collect()
}

pub(crate) type TestManager = SessionManager<FakeClock, SequentialIdGen>;

/// Manager backed by a single fake Claude provider.
pub(crate) struct ManagerContext {
    pub manager: TestManager,
    pub provider: FakeProvider,
    pub store: Store,
    pub bus: EventBus,
    pub clock: FakeClock,
    pub scope: CancellationToken,
}

impl ManagerContext {
    pub fn new() -> Self {
        Self::with_config(ManagerConfig::default())
    }

    pub fn with_config(config: ManagerConfig) -> Self {
        let store = Store::in_memory().unwrap();
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
            SequentialIdGen::new("sess"),
            config,
        );
        Self {
            manager,
            provider,
            store,
            bus,
            clock,
            scope: CancellationToken::new(),
        }
    }

    pub fn status(&self, id: &SessionId) -> SessionStatus {
        self.store.get_session(id).unwrap().status
    }

    /// Poll until the session reaches `status`
    pub async fn wait_for_status(&self, id: &SessionId, status: SessionStatus) {
        for _ in 0..400 {
            if self.status(id) == status {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {id} never reached {status}; now {}", self.status(id));
    }

    /// Poll until no process is registered for the session
    pub async fn wait_for_cleanup(&self, id: &SessionId) {
        for _ in 0..400 {
            if !self.manager.is_active(id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("session {id} still active");
    }
}
