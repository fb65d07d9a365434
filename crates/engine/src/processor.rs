// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event processor: turns one session's normalized stream events into
//! conversation rows, session updates and bus events.
//!
//! Only conversation writes propagate errors; everything else is logged
//! and the stream continues.

use crate::bus::EventBus;
use crate::lifecycle::Lifecycle;
use crate::snapshot::{self, READ_TOOL};
use hl_core::{
    model_label, AssistantSessionId, BusEvent, BusEventType, Clock, ContentBlock,
    ConversationEvent, FileSnapshot, MessageEvent, RawEvent, ResultEvent, Role, RunId, Session,
    SessionId, SessionUpdate, StreamEvent, StreamEventKind, SystemEvent,
};
use hl_storage::{Store, StoreError};
use std::path::PathBuf;
use tokio::task::JoinSet;

pub struct EventProcessor<C: Clock> {
    store: Store,
    bus: EventBus,
    clock: C,
    lifecycle: Lifecycle<C>,
    session_id: SessionId,
    run_id: RunId,
    working_dir: PathBuf,
    has_model: bool,
    store_raw_events: bool,
    /// Injected query the provider may echo back as its first user text
    echo: Option<String>,
    snapshots: JoinSet<()>,
}

impl<C: Clock> EventProcessor<C> {
    pub fn new(
        store: Store,
        bus: EventBus,
        clock: C,
        lifecycle: Lifecycle<C>,
        session: &Session,
        store_raw_events: bool,
    ) -> Self {
        Self {
            store,
            bus,
            clock,
            lifecycle,
            session_id: session.id.clone(),
            run_id: session.run_id.clone(),
            working_dir: PathBuf::from(&session.working_dir),
            has_model: !session.model.is_empty(),
            store_raw_events,
            echo: None,
            snapshots: JoinSet::new(),
        }
    }

    /// Skip the next user text identical to `query`
    pub fn expect_echo(&mut self, query: &str) {
        self.echo = Some(query.to_string());
    }

    /// Process one event. Activity is touched whatever the outcome.
    pub fn process(&mut self, event: &StreamEvent) -> Result<(), StoreError> {
        if !event.has_session_id() {
            tracing::trace!(session_id = %self.session_id, "skipping event without session id");
            return Ok(());
        }
        self.record_raw(event);
        let outcome = self.dispatch(event);
        if let Err(e) = self
            .store
            .update_session(&self.session_id, &SessionUpdate::touch(self.clock.now()))
        {
            tracing::warn!(session_id = %self.session_id, error = %e, "failed to touch session");
        }
        outcome
    }

    /// Wait for in-flight snapshot captures
    pub async fn flush_snapshots(&mut self) {
        while let Some(joined) = self.snapshots.join_next().await {
            if let Err(e) = joined {
                tracing::warn!(session_id = %self.session_id, error = %e, "snapshot task failed");
            }
        }
    }

    fn record_raw(&self, event: &StreamEvent) {
        if !self.store_raw_events {
            return;
        }
        let Some(raw) = &event.raw else {
            return;
        };
        let row = RawEvent {
            id: 0,
            session_id: self.session_id.clone(),
            event_json: raw.clone(),
            created_at: self.clock.now(),
        };
        if let Err(e) = self.store.store_raw_event(&row) {
            tracing::warn!(session_id = %self.session_id, error = %e, "failed to store raw event");
        }
    }

    fn dispatch(&mut self, event: &StreamEvent) -> Result<(), StoreError> {
        let asid = &event.assistant_session_id;
        match &event.kind {
            StreamEventKind::System(SystemEvent::SessionCreated) => {
                let row = ConversationEvent::system(
                    self.session_id.clone(),
                    asid.clone(),
                    format!("Session created with ID: {asid}"),
                )
                .at(self.clock.now());
                self.write(row)?;
            }
            StreamEventKind::System(SystemEvent::Init(info)) => {
                if !self.has_model {
                    if let Some(label) = model_label(&info.model) {
                        self.update_model(label);
                    }
                }
            }
            StreamEventKind::System(SystemEvent::Other { subtype }) => {
                tracing::debug!(session_id = %self.session_id, subtype, "system event");
            }
            StreamEventKind::Message(message) => self.message(asid, message)?,
            StreamEventKind::Result(result) => self.result(result),
            StreamEventKind::StepStart | StreamEventKind::StepFinish(_) => {}
        }
        Ok(())
    }

    fn update_model(&mut self, label: &str) {
        let update = SessionUpdate {
            model: Some(label.to_string()),
            ..SessionUpdate::default()
        };
        match self.store.update_session(&self.session_id, &update) {
            Ok(()) => self.has_model = true,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "failed to record model")
            }
        }
    }

    fn message(
        &mut self,
        asid: &AssistantSessionId,
        message: &MessageEvent,
    ) -> Result<(), StoreError> {
        let parent = message.parent_tool_use_id.clone();
        for block in &message.content {
            let row = match block {
                ContentBlock::Text { text } => {
                    if message.role == Role::User && self.take_echo(text) {
                        tracing::debug!(session_id = %self.session_id, "skipping echoed query");
                        continue;
                    }
                    ConversationEvent::message(
                        self.session_id.clone(),
                        asid.clone(),
                        message.role,
                        text.clone(),
                    )
                }
                ContentBlock::Thinking { thinking } => ConversationEvent::thinking(
                    self.session_id.clone(),
                    asid.clone(),
                    thinking.clone(),
                ),
                ContentBlock::ToolUse { id, name, input } => ConversationEvent::tool_call(
                    self.session_id.clone(),
                    asid.clone(),
                    id.clone(),
                    name.clone(),
                    input.to_string(),
                ),
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    ..
                } => {
                    let text = content.as_text();
                    let row = ConversationEvent::tool_result(
                        self.session_id.clone(),
                        asid.clone(),
                        tool_use_id.clone(),
                        text.clone(),
                    );
                    let written = self.write(row.with_parent_tool_use_id(parent.clone()))?;
                    self.complete_tool_call(tool_use_id, text, &written);
                    continue;
                }
                ContentBlock::Unsupported => continue,
            };
            self.write(row.with_parent_tool_use_id(parent.clone()))?;
        }
        Ok(())
    }

    fn take_echo(&mut self, text: &str) -> bool {
        match self.echo.take() {
            Some(query) if query == text => true,
            other => {
                self.echo = other;
                false
            }
        }
    }

    fn complete_tool_call(&mut self, tool_use_id: &str, content: String, written: &ConversationEvent) {
        if let Err(e) = self
            .store
            .mark_tool_call_completed(tool_use_id, &self.session_id)
        {
            tracing::warn!(session_id = %self.session_id, tool_use_id, error = %e, "failed to complete tool call");
        }
        let call = match self.store.get_tool_call_by_id(tool_use_id) {
            Ok(Some(call)) if call.tool_name.as_deref() == Some(READ_TOOL) => call,
            Ok(_) => return,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, tool_use_id, error = %e, "tool call lookup failed");
                return;
            }
        };

        let store = self.store.clone();
        let session_id = self.session_id.clone();
        let working_dir = self.working_dir.clone();
        let input = call.tool_input_json.unwrap_or_default();
        let tool_id = tool_use_id.to_string();
        let created_at = written.created_at;
        self.snapshots.spawn_blocking(move || {
            let capture = match snapshot::capture(&input, &content, &working_dir) {
                Ok(capture) => capture,
                Err(e) => {
                    tracing::warn!(%session_id, tool_id, error = %e, "snapshot capture failed");
                    return;
                }
            };
            let row = FileSnapshot {
                id: 0,
                tool_id,
                session_id: session_id.clone(),
                file_path: capture.file_path,
                content: capture.content,
                created_at,
            };
            if let Err(e) = store.store_file_snapshot(&row) {
                tracing::warn!(%session_id, error = %e, "failed to store snapshot");
            }
        });
    }

    fn result(&self, result: &ResultEvent) {
        if let Err(e) = self.lifecycle.record_result(&self.session_id, result, None) {
            tracing::error!(session_id = %self.session_id, error = %e, "failed to record result");
        }
    }

    fn write(&self, row: ConversationEvent) -> Result<ConversationEvent, StoreError> {
        let row = self.store.add_conversation_event(&row.at(self.clock.now()))?;
        self.announce(&row);
        Ok(row)
    }

    /// Publish `conversation_updated` for a stored row
    pub fn announce(&self, row: &ConversationEvent) {
        let event = BusEvent::new(BusEventType::ConversationUpdated)
            .with("session_id", self.session_id.as_str())
            .with("run_id", self.run_id.as_str())
            .with("assistant_session_id", row.assistant_session_id.as_str())
            .with("event_type", row.event_type.as_str())
            .with("sequence", row.sequence)
            .with_opt("role", row.role.map(|r| r.as_str()))
            .with_opt("tool_id", row.tool_id.clone())
            .with_opt("tool_name", row.tool_name.clone())
            .with_opt("tool_result_for_id", row.tool_result_for_id.clone());
        self.bus.publish(event);
    }
}

#[cfg(test)]
#[path = "processor_tests.rs"]
mod tests;
