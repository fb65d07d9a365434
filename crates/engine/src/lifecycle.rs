// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session state machine.
//!
//! ```text
//! draft ──launch──▶ starting ──first event──▶ running ──result──▶ completed | failed
//!                                             running ──interrupt──▶ completing ──EOF──▶ completed
//! any non-terminal ──error / kill──▶ failed
//! ```
//!
//! Every transition is a store write followed by a `session_status_changed`
//! publish. Terminal rows are never rewritten.

use crate::bus::EventBus;
use crate::injector::QueryInjector;
use crate::registry::ActiveRegistry;
use hl_core::{BusEvent, Clock, ResultEvent, SessionId, SessionStatus, SessionUpdate};
use hl_storage::{Store, StoreError};
use std::fmt::Display;
use std::sync::Arc;
use std::time::Duration;

/// Recorded on sessions stopped through an interrupt
pub const INTERRUPT_MESSAGE: &str = "session interrupt requested";

#[derive(Clone)]
pub struct Lifecycle<C: Clock> {
    store: Store,
    bus: EventBus,
    clock: C,
    registry: Arc<ActiveRegistry>,
    injector: Arc<QueryInjector<C>>,
}

impl<C: Clock> Lifecycle<C> {
    pub fn new(
        store: Store,
        bus: EventBus,
        clock: C,
        registry: Arc<ActiveRegistry>,
        injector: Arc<QueryInjector<C>>,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            registry,
            injector,
        }
    }

    /// Write `update` unless the row is terminal, then publish the change.
    /// Returns the status the row had before the write.
    fn transition(
        &self,
        id: &SessionId,
        update: SessionUpdate,
    ) -> Result<Option<SessionStatus>, StoreError> {
        let current = self.store.get_session(id)?;
        if current.status.is_terminal() {
            tracing::debug!(session_id = %id, status = %current.status, "ignoring transition of finished session");
            return Ok(None);
        }
        self.store.update_session(id, &update)?;
        if let Some(new_status) = update.status.filter(|s| *s != current.status) {
            tracing::info!(
                session_id = %id,
                old_status = %current.status,
                new_status = %new_status,
                "status changed"
            );
            self.bus.publish(BusEvent::status_changed(
                id.as_str(),
                current.run_id.as_str(),
                current.status,
                new_status,
            ));
        }
        Ok(Some(current.status))
    }

    pub fn transition_to_starting(&self, id: &SessionId) -> Result<(), StoreError> {
        self.transition(
            id,
            SessionUpdate {
                last_activity_at: Some(self.clock.now()),
                ..SessionUpdate::status(SessionStatus::Starting)
            },
        )?;
        Ok(())
    }

    pub fn transition_to_running(&self, id: &SessionId) -> Result<(), StoreError> {
        self.transition(
            id,
            SessionUpdate {
                last_activity_at: Some(self.clock.now()),
                ..SessionUpdate::status(SessionStatus::Running)
            },
        )?;
        Ok(())
    }

    /// Record an interrupt. A natural completion may still follow.
    pub fn transition_to_completing(&self, id: &SessionId) -> Result<(), StoreError> {
        let now = self.clock.now();
        self.transition(
            id,
            SessionUpdate {
                error_message: Some(INTERRUPT_MESSAGE.to_string()),
                last_activity_at: Some(now),
                ..SessionUpdate::status(SessionStatus::Completing)
            },
        )?;
        Ok(())
    }

    /// Write a terminal result. Error results on an interrupted session
    /// still complete it; the interrupt message stays.
    pub fn record_result(
        &self,
        id: &SessionId,
        result: &ResultEvent,
        elapsed: Option<Duration>,
    ) -> Result<(), StoreError> {
        let current = self.store.get_session(id)?;
        if current.status.is_terminal() {
            return Ok(());
        }
        let interrupted = current.status == SessionStatus::Completing;
        let status = if result.is_error && !interrupted {
            SessionStatus::Failed
        } else {
            SessionStatus::Completed
        };
        let error_message = if result.is_error && !interrupted {
            result.error_message()
        } else {
            None
        };
        let now = self.clock.now();
        self.transition(
            id,
            SessionUpdate {
                completed_at: Some(now),
                last_activity_at: Some(now),
                cost_usd: result.cost_usd,
                total_tokens: result.total_tokens(),
                duration_ms: result
                    .duration_ms
                    .or_else(|| elapsed.map(|d| d.as_millis() as u64)),
                num_turns: result.num_turns,
                result_content: result.result.clone(),
                error_message,
                ..SessionUpdate::status(status)
            },
        )?;
        Ok(())
    }

    pub fn complete_session(
        &self,
        id: &SessionId,
        result: &ResultEvent,
        elapsed: Duration,
    ) -> Result<(), StoreError> {
        let outcome = self.record_result(id, result, Some(elapsed));
        self.cleanup(id);
        outcome
    }

    pub fn handle_session_result_error(
        &self,
        id: &SessionId,
        result: &ResultEvent,
    ) -> Result<(), StoreError> {
        tracing::warn!(
            session_id = %id,
            error = ?result.error_message(),
            "assistant reported an error"
        );
        self.record_result(id, result, None)
    }

    /// Fail the session, unless an interrupt owns the transition, in which
    /// case the session completes with the interrupt message.
    pub fn handle_session_error(&self, id: &SessionId, error: &dyn Display) -> Result<(), StoreError> {
        let current = self.store.get_session(id)?;
        let now = self.clock.now();
        if current.status == SessionStatus::Completing {
            tracing::debug!(session_id = %id, error = %error, "error after interrupt");
            self.transition(
                id,
                SessionUpdate {
                    completed_at: Some(now),
                    last_activity_at: Some(now),
                    ..SessionUpdate::status(SessionStatus::Completed)
                },
            )?;
            return Ok(());
        }
        tracing::error!(session_id = %id, error = %error, "session failed");
        self.transition(
            id,
            SessionUpdate {
                error_message: Some(error.to_string()),
                completed_at: Some(now),
                last_activity_at: Some(now),
                ..SessionUpdate::status(SessionStatus::Failed)
            },
        )?;
        Ok(())
    }

    /// Drop the registry entry and any pending query. Always safe.
    pub fn cleanup(&self, id: &SessionId) {
        self.registry.remove(id);
        self.injector.clear(id);
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
