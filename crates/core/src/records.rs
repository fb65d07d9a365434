// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Auxiliary per-session records: file snapshots and raw protocol frames.

use crate::id::SessionId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Contents of a file as seen by a `Read` tool call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSnapshot {
    #[serde(default)]
    pub id: i64,
    pub tool_id: String,
    pub session_id: SessionId,
    pub file_path: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// Original protocol frame kept for debugging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawEvent {
    #[serde(default)]
    pub id: i64,
    pub session_id: SessionId,
    pub event_json: String,
    pub created_at: DateTime<Utc>,
}
