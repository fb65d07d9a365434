// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Table definitions.
//!
//! `SCHEMA_LATEST` is what a fresh database gets. `SCHEMA_V1` is kept so
//! upgrade paths can be exercised from the first released layout.

/// Records the highest applied schema version
pub(crate) const VERSION_TABLE: &str = "
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    description TEXT NOT NULL,
    applied_at TEXT NOT NULL
);
";

pub(crate) const SCHEMA_V1: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL UNIQUE,
    assistant_session_id TEXT NOT NULL DEFAULT '',
    parent_session_id TEXT,
    query TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    model TEXT NOT NULL DEFAULT '',
    working_dir TEXT NOT NULL DEFAULT '',
    max_turns INTEGER,
    system_prompt TEXT NOT NULL DEFAULT '',
    append_system_prompt TEXT NOT NULL DEFAULT '',
    custom_instructions TEXT NOT NULL DEFAULT '',
    permission_prompt_tool TEXT NOT NULL DEFAULT '',
    allowed_tools TEXT NOT NULL DEFAULT '[]',
    disallowed_tools TEXT NOT NULL DEFAULT '[]',
    auto_accept_edits INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_activity_at TEXT NOT NULL,
    completed_at TEXT,
    cost_usd REAL,
    total_tokens INTEGER,
    duration_ms INTEGER,
    num_turns INTEGER,
    result_content TEXT,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_sessions_last_activity ON sessions(last_activity_at);
CREATE INDEX IF NOT EXISTS idx_sessions_parent ON sessions(parent_session_id);

CREATE TABLE IF NOT EXISTS conversation_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    assistant_session_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    event_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    role TEXT,
    content TEXT NOT NULL DEFAULT '',
    tool_id TEXT,
    tool_name TEXT,
    tool_input_json TEXT,
    parent_tool_use_id TEXT,
    tool_result_for_id TEXT,
    tool_result_content TEXT,
    is_completed INTEGER NOT NULL DEFAULT 0,
    approval_status TEXT,
    approval_id TEXT,
    UNIQUE (assistant_session_id, sequence)
);
CREATE INDEX IF NOT EXISTS idx_events_session ON conversation_events(session_id);
CREATE INDEX IF NOT EXISTS idx_events_tool_id ON conversation_events(tool_id);
CREATE INDEX IF NOT EXISTS idx_events_approval ON conversation_events(approval_id);

CREATE TABLE IF NOT EXISTS approvals (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    responded_at TEXT,
    tool_name TEXT NOT NULL,
    tool_input TEXT NOT NULL DEFAULT 'null',
    tool_use_id TEXT,
    comment TEXT
);
CREATE INDEX IF NOT EXISTS idx_approvals_session ON approvals(session_id, status);

CREATE TABLE IF NOT EXISTS mcp_servers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    name TEXT NOT NULL,
    command TEXT NOT NULL DEFAULT '',
    args TEXT NOT NULL DEFAULT '[]',
    env TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_mcp_servers_session ON mcp_servers(session_id);
";

pub(crate) const SCHEMA_LATEST: &str = "
CREATE TABLE IF NOT EXISTS sessions (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL UNIQUE,
    assistant_session_id TEXT NOT NULL DEFAULT '',
    parent_session_id TEXT,
    provider TEXT NOT NULL DEFAULT 'claude',
    query TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    title TEXT NOT NULL DEFAULT '',
    model TEXT NOT NULL DEFAULT '',
    working_dir TEXT NOT NULL DEFAULT '',
    max_turns INTEGER,
    system_prompt TEXT NOT NULL DEFAULT '',
    append_system_prompt TEXT NOT NULL DEFAULT '',
    custom_instructions TEXT NOT NULL DEFAULT '',
    permission_prompt_tool TEXT NOT NULL DEFAULT '',
    allowed_tools TEXT NOT NULL DEFAULT '[]',
    disallowed_tools TEXT NOT NULL DEFAULT '[]',
    auto_accept_edits INTEGER NOT NULL DEFAULT 0,
    dangerously_skip_permissions INTEGER NOT NULL DEFAULT 0,
    dangerously_skip_permissions_expires_at TEXT,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_activity_at TEXT NOT NULL,
    completed_at TEXT,
    cost_usd REAL,
    total_tokens INTEGER,
    duration_ms INTEGER,
    num_turns INTEGER,
    result_content TEXT,
    error_message TEXT
);
CREATE INDEX IF NOT EXISTS idx_sessions_last_activity ON sessions(last_activity_at);
CREATE INDEX IF NOT EXISTS idx_sessions_parent ON sessions(parent_session_id);
CREATE INDEX IF NOT EXISTS idx_sessions_dangerous
    ON sessions(dangerously_skip_permissions, dangerously_skip_permissions_expires_at);

CREATE TABLE IF NOT EXISTS conversation_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    assistant_session_id TEXT NOT NULL,
    sequence INTEGER NOT NULL,
    event_type TEXT NOT NULL,
    created_at TEXT NOT NULL,
    role TEXT,
    content TEXT NOT NULL DEFAULT '',
    tool_id TEXT,
    tool_name TEXT,
    tool_input_json TEXT,
    parent_tool_use_id TEXT,
    tool_result_for_id TEXT,
    tool_result_content TEXT,
    is_completed INTEGER NOT NULL DEFAULT 0,
    approval_status TEXT,
    approval_id TEXT,
    UNIQUE (assistant_session_id, sequence)
);
CREATE INDEX IF NOT EXISTS idx_events_session ON conversation_events(session_id);
CREATE INDEX IF NOT EXISTS idx_events_tool_id ON conversation_events(tool_id);
CREATE INDEX IF NOT EXISTS idx_events_approval ON conversation_events(approval_id);

CREATE TABLE IF NOT EXISTS approvals (
    id TEXT PRIMARY KEY,
    run_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    status TEXT NOT NULL,
    created_at TEXT NOT NULL,
    responded_at TEXT,
    tool_name TEXT NOT NULL,
    tool_input TEXT NOT NULL DEFAULT 'null',
    tool_use_id TEXT,
    comment TEXT
);
CREATE INDEX IF NOT EXISTS idx_approvals_session ON approvals(session_id, status);

CREATE TABLE IF NOT EXISTS mcp_servers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    name TEXT NOT NULL,
    command TEXT NOT NULL DEFAULT '',
    args TEXT NOT NULL DEFAULT '[]',
    env TEXT NOT NULL DEFAULT '{}',
    url TEXT,
    headers TEXT NOT NULL DEFAULT '{}'
);
CREATE INDEX IF NOT EXISTS idx_mcp_servers_session ON mcp_servers(session_id);

CREATE TABLE IF NOT EXISTS file_snapshots (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    tool_id TEXT NOT NULL,
    session_id TEXT NOT NULL,
    file_path TEXT NOT NULL,
    content TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_snapshots_session ON file_snapshots(session_id);

CREATE TABLE IF NOT EXISTS raw_events (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    event_json TEXT NOT NULL,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_raw_events_session ON raw_events(session_id);
";
