// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Events published on the in-process bus and the filters subscribers use.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BusEventType {
    NewApproval,
    ApprovalResolved,
    SessionStatusChanged,
    ConversationUpdated,
    SessionSettingsChanged,
}

impl BusEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BusEventType::NewApproval => "new_approval",
            BusEventType::ApprovalResolved => "approval_resolved",
            BusEventType::SessionStatusChanged => "session_status_changed",
            BusEventType::ConversationUpdated => "conversation_updated",
            BusEventType::SessionSettingsChanged => "session_settings_changed",
        }
    }
}

impl fmt::Display for BusEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A published event. `timestamp` is stamped by the bus on publish.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    #[serde(rename = "type")]
    pub event_type: BusEventType,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub data: Map<String, Value>,
}

impl BusEvent {
    pub fn new(event_type: BusEventType) -> Self {
        Self {
            event_type,
            timestamp: DateTime::<Utc>::default(),
            data: Map::new(),
        }
    }

    /// Builder-style data insertion
    pub fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }

    /// Insert `key` only when `value` is present
    pub fn with_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.with(key, v),
            None => self,
        }
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.get_str("session_id")
    }

    pub fn run_id(&self) -> Option<&str> {
        self.get_str("run_id")
    }

    pub fn status_changed(
        session_id: &str,
        run_id: &str,
        old_status: impl fmt::Display,
        new_status: impl fmt::Display,
    ) -> Self {
        Self::new(BusEventType::SessionStatusChanged)
            .with("session_id", session_id)
            .with("run_id", run_id)
            .with("old_status", old_status.to_string())
            .with("new_status", new_status.to_string())
    }
}

/// Subscription filter; empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventFilter {
    pub types: Vec<BusEventType>,
    pub session_id: String,
    pub run_id: String,
}

impl EventFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            ..Self::default()
        }
    }

    pub fn with_types(mut self, types: impl IntoIterator<Item = BusEventType>) -> Self {
        self.types = types.into_iter().collect();
        self
    }

    /// Session and run filters require the event's data to carry an equal
    /// value under the same key; a missing key never matches.
    pub fn matches(&self, event: &BusEvent) -> bool {
        if !self.types.is_empty() && !self.types.contains(&event.event_type) {
            return false;
        }
        if !self.session_id.is_empty() && event.session_id() != Some(self.session_id.as_str()) {
            return false;
        }
        if !self.run_id.is_empty() && event.run_id() != Some(self.run_id.as_str()) {
            return false;
        }
        true
    }
}

#[cfg(test)]
#[path = "bus_event_tests.rs"]
mod tests;
