// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-session monitor task.
//!
//! ```text
//! events ──first event with id──▶ bind id, inject query, running
//!        ──every event──────────▶ EventProcessor
//!        ──EOF──▶ wait() ──▶ complete | result error | session error
//!                              └──▶ cleanup (always)
//! ```
//!
//! The task owns the events receiver and ends with it, so cleanup runs
//! exactly when the stream is finished.

use crate::injector::QueryInjector;
use crate::lifecycle::Lifecycle;
use crate::processor::EventProcessor;
use hl_adapters::ProcessHandle;
use hl_core::{AssistantSessionId, Clock, SessionId, SessionUpdate, StreamEvent};
use hl_storage::{Store, StoreError};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

pub(crate) struct SessionMonitor<C: Clock> {
    pub store: Store,
    pub lifecycle: Lifecycle<C>,
    pub injector: Arc<QueryInjector<C>>,
    pub processor: EventProcessor<C>,
    pub session_id: SessionId,
    pub query: String,
    pub started: Instant,
}

impl<C: Clock> SessionMonitor<C> {
    pub async fn run(
        mut self,
        handle: Arc<dyn ProcessHandle>,
        mut events: mpsc::Receiver<StreamEvent>,
    ) {
        let id = self.session_id.clone();
        let mut bound = false;
        let mut failed = false;

        while let Some(event) = events.recv().await {
            if failed {
                continue;
            }
            let outcome = if !bound && event.has_session_id() {
                bound = true;
                self.bind(&event.assistant_session_id)
                    .and_then(|()| self.processor.process(&event))
            } else {
                self.processor.process(&event)
            };
            if let Err(e) = outcome {
                failed = true;
                self.fail(&handle, &e).await;
            }
        }

        self.processor.flush_snapshots().await;
        let outcome = handle.wait().await;
        let elapsed = self.started.elapsed();
        let finished = match &outcome {
            Ok(result) if !result.is_error => {
                self.lifecycle.complete_session(&id, result, elapsed)
            }
            Ok(result) => self.lifecycle.handle_session_result_error(&id, result),
            Err(e) => self.lifecycle.handle_session_error(&id, e),
        };
        if let Err(e) = finished {
            tracing::error!(session_id = %id, error = %e, "failed to record session outcome");
        }
        self.lifecycle.cleanup(&id);
        tracing::info!(session_id = %id, elapsed_ms = elapsed.as_millis() as u64, "monitor finished");
    }

    /// First sighting of the assistant's id
    fn bind(&mut self, assistant_session_id: &AssistantSessionId) -> Result<(), StoreError> {
        tracing::info!(
            session_id = %self.session_id,
            %assistant_session_id,
            "assistant session started"
        );
        self.store.update_session(
            &self.session_id,
            &SessionUpdate {
                assistant_session_id: Some(assistant_session_id.clone()),
                ..SessionUpdate::default()
            },
        )?;
        if let Some(row) = self
            .injector
            .inject_pending(&self.session_id, assistant_session_id)?
        {
            self.processor.announce(&row);
            self.processor.expect_echo(&self.query);
        }
        self.lifecycle.transition_to_running(&self.session_id)
    }

    /// A store write failed: fail the session and stop the process. The
    /// stream is still drained so the provider can finish.
    async fn fail(&self, handle: &Arc<dyn ProcessHandle>, error: &StoreError) {
        tracing::error!(session_id = %self.session_id, error = %error, "event processing failed");
        if let Err(e) = self.lifecycle.handle_session_error(&self.session_id, error) {
            tracing::error!(session_id = %self.session_id, error = %e, "failed to mark session failed");
        }
        if let Err(e) = handle.kill().await {
            tracing::warn!(session_id = %self.session_id, error = %e, "kill after processing failure");
        }
    }
}

#[cfg(test)]
#[path = "monitor_tests.rs"]
mod tests;
