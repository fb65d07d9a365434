// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MCP server specs, file snapshots and raw protocol frames.

use crate::codec::{get_json, get_ts, ts};
use crate::error::StoreError;
use crate::store::Store;
use hl_core::{FileSnapshot, McpServer, McpServerConfig, RawEvent, SessionId};
use rusqlite::{params, Row};
use std::collections::BTreeMap;

fn mcp_server_from_row(row: &Row<'_>) -> rusqlite::Result<McpServer> {
    let url: Option<String> = row.get(6)?;
    let config = match url {
        Some(url) => McpServerConfig::Http {
            transport: hl_core::mcp::HttpTransport::Http,
            url,
            headers: get_json(row, 7)?,
        },
        None => McpServerConfig::Stdio {
            command: row.get(3)?,
            args: get_json(row, 4)?,
            env: get_json(row, 5)?,
        },
    };
    Ok(McpServer {
        id: row.get(0)?,
        session_id: SessionId::new(row.get::<_, String>(1)?),
        name: row.get(2)?,
        config,
    })
}

impl Store {
    /// Attach MCP server specs to a session, preserving order
    pub fn store_mcp_servers(
        &self,
        session_id: &SessionId,
        servers: &[(String, McpServerConfig)],
    ) -> Result<(), StoreError> {
        let empty: BTreeMap<String, String> = BTreeMap::new();
        let mut rows = Vec::with_capacity(servers.len());
        for (name, config) in servers {
            let row = match config {
                McpServerConfig::Stdio { command, args, env } => (
                    name.as_str(),
                    command.as_str(),
                    serde_json::to_string(args)?,
                    serde_json::to_string(env)?,
                    None,
                    serde_json::to_string(&empty)?,
                ),
                McpServerConfig::Http { url, headers, .. } => (
                    name.as_str(),
                    "",
                    "[]".to_string(),
                    serde_json::to_string(&empty)?,
                    Some(url.as_str()),
                    serde_json::to_string(headers)?,
                ),
            };
            rows.push(row);
        }

        self.with_conn(|conn| {
            let tx = conn.transaction()?;
            for (name, command, args, env, url, headers) in &rows {
                tx.execute(
                    "INSERT INTO mcp_servers (session_id, name, command, args, env, url, headers) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    params![session_id.as_str(), name, command, args, env, url, headers],
                )?;
            }
            tx.commit()?;
            Ok(())
        })
    }

    pub fn get_mcp_servers(&self, session_id: &SessionId) -> Result<Vec<McpServer>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, name, command, args, env, url, headers \
                 FROM mcp_servers WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id.as_str()], mcp_server_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn store_file_snapshot(&self, snapshot: &FileSnapshot) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO file_snapshots (tool_id, session_id, file_path, content, created_at) \
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    snapshot.tool_id,
                    snapshot.session_id.as_str(),
                    snapshot.file_path,
                    snapshot.content,
                    ts(&snapshot.created_at),
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_file_snapshots(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<FileSnapshot>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, tool_id, session_id, file_path, content, created_at \
                 FROM file_snapshots WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id.as_str()], |row| {
                Ok(FileSnapshot {
                    id: row.get(0)?,
                    tool_id: row.get(1)?,
                    session_id: SessionId::new(row.get::<_, String>(2)?),
                    file_path: row.get(3)?,
                    content: row.get(4)?,
                    created_at: get_ts(row, 5)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }

    pub fn store_raw_event(&self, event: &RawEvent) -> Result<i64, StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO raw_events (session_id, event_json, created_at) VALUES (?1, ?2, ?3)",
                params![
                    event.session_id.as_str(),
                    event.event_json,
                    ts(&event.created_at)
                ],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    pub fn get_raw_events(&self, session_id: &SessionId) -> Result<Vec<RawEvent>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, session_id, event_json, created_at \
                 FROM raw_events WHERE session_id = ?1 ORDER BY id",
            )?;
            let rows = stmt.query_map(params![session_id.as_str()], |row| {
                Ok(RawEvent {
                    id: row.get(0)?,
                    session_id: SessionId::new(row.get::<_, String>(1)?),
                    event_json: row.get(2)?,
                    created_at: get_ts(row, 3)?,
                })
            })?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

#[cfg(test)]
#[path = "records_tests.rs"]
mod tests;
