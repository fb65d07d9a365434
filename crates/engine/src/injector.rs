// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Query injector: writes the user's prompt as the first conversation
//! event of an assistant session, exactly once.
//!
//! Injection needs the assistant's own session id, so it runs only after
//! the provider has reported it.

use hl_core::{AssistantSessionId, Clock, ConversationEvent, Role, SessionId};
use hl_storage::{Store, StoreError};
use parking_lot::Mutex;
use std::collections::HashMap;

pub struct QueryInjector<C: Clock> {
    store: Store,
    clock: C,
    pending: Mutex<HashMap<SessionId, String>>,
}

impl<C: Clock> QueryInjector<C> {
    pub fn new(store: Store, clock: C) -> Self {
        Self {
            store,
            clock,
            pending: Mutex::new(HashMap::new()),
        }
    }

    pub fn store_pending(&self, session_id: &SessionId, query: &str) {
        self.pending
            .lock()
            .insert(session_id.clone(), query.to_string());
    }

    pub fn has_pending(&self, session_id: &SessionId) -> bool {
        self.pending.lock().contains_key(session_id)
    }

    pub fn clear(&self, session_id: &SessionId) {
        self.pending.lock().remove(session_id);
    }

    /// Consume the pending query and write it, unless the conversation
    /// already opens with a user message. Returns the written event.
    pub fn inject_pending(
        &self,
        session_id: &SessionId,
        assistant_session_id: &AssistantSessionId,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        let Some(query) = self.pending.lock().remove(session_id) else {
            return Ok(None);
        };
        if query.is_empty() {
            return Ok(None);
        }

        if let Some(first) = self.store.first_conversation_event(assistant_session_id)? {
            if first.is_user_message() {
                tracing::debug!(%session_id, "conversation already opens with a user message");
                return Ok(None);
            }
        }

        let event = self.store.add_conversation_event(&ConversationEvent::message(
            session_id.clone(),
            assistant_session_id.clone(),
            Role::User,
            query,
        )
        .at(self.clock.now()))?;
        tracing::debug!(%session_id, sequence = event.sequence, "injected query");
        Ok(Some(event))
    }
}

#[cfg(test)]
#[path = "injector_tests.rs"]
mod tests;
