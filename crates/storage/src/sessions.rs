// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Session rows.

use crate::codec::{self, get_json, get_parsed, get_ts, get_ts_opt, get_u64_opt, ts, ts_opt};
use crate::error::StoreError;
use crate::store::Store;
use chrono::{DateTime, Utc};
use hl_core::{Session, SessionId, SessionUpdate};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, OptionalExtension, Row};

/// Default page size for title search
pub const SEARCH_DEFAULT_LIMIT: usize = 10;
/// Upper bound on title search results
pub const SEARCH_MAX_LIMIT: usize = 50;

const SESSION_COLUMNS: &str = "id, run_id, assistant_session_id, parent_session_id, provider, \
     query, summary, title, model, working_dir, max_turns, system_prompt, append_system_prompt, \
     custom_instructions, permission_prompt_tool, allowed_tools, disallowed_tools, \
     auto_accept_edits, dangerously_skip_permissions, dangerously_skip_permissions_expires_at, \
     status, created_at, last_activity_at, completed_at, cost_usd, total_tokens, duration_ms, \
     num_turns, result_content, error_message";

/// Statuses a row can never leave, as SQL literals
const TERMINAL_SQL: &str = "('completed', 'failed', 'interrupted')";

fn session_from_row(row: &Row<'_>) -> rusqlite::Result<Session> {
    Ok(Session {
        id: SessionId::new(row.get::<_, String>(0)?),
        run_id: row.get::<_, String>(1)?.into(),
        assistant_session_id: row.get::<_, String>(2)?.into(),
        parent_session_id: row.get::<_, Option<String>>(3)?.map(SessionId::new),
        provider: get_parsed(row, 4)?,
        query: row.get(5)?,
        summary: row.get(6)?,
        title: row.get(7)?,
        model: row.get(8)?,
        working_dir: row.get(9)?,
        max_turns: row.get(10)?,
        system_prompt: row.get(11)?,
        append_system_prompt: row.get(12)?,
        custom_instructions: row.get(13)?,
        permission_prompt_tool: row.get(14)?,
        allowed_tools: get_json(row, 15)?,
        disallowed_tools: get_json(row, 16)?,
        auto_accept_edits: row.get(17)?,
        dangerously_skip_permissions: row.get(18)?,
        dangerously_skip_permissions_expires_at: get_ts_opt(row, 19)?,
        status: get_parsed(row, 20)?,
        created_at: get_ts(row, 21)?,
        last_activity_at: get_ts(row, 22)?,
        completed_at: get_ts_opt(row, 23)?,
        cost_usd: row.get(24)?,
        total_tokens: get_u64_opt(row, 25)?,
        duration_ms: get_u64_opt(row, 26)?,
        num_turns: row.get(27)?,
        result_content: row.get(28)?,
        error_message: row.get(29)?,
    })
}

impl Store {
    pub fn create_session(&self, session: &Session) -> Result<(), StoreError> {
        let allowed = serde_json::to_string(&session.allowed_tools)?;
        let disallowed = serde_json::to_string(&session.disallowed_tools)?;
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO sessions ({SESSION_COLUMNS}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, \
                     ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20, ?21, ?22, \
                     ?23, ?24, ?25, ?26, ?27, ?28, ?29, ?30)"
                ),
                params![
                    session.id.as_str(),
                    session.run_id.as_str(),
                    session.assistant_session_id.as_str(),
                    session.parent_session_id.as_ref().map(SessionId::as_str),
                    session.provider.as_str(),
                    session.query,
                    session.summary,
                    session.title,
                    session.model,
                    session.working_dir,
                    session.max_turns,
                    session.system_prompt,
                    session.append_system_prompt,
                    session.custom_instructions,
                    session.permission_prompt_tool,
                    allowed,
                    disallowed,
                    session.auto_accept_edits,
                    session.dangerously_skip_permissions,
                    ts_opt(&session.dangerously_skip_permissions_expires_at),
                    session.status.as_str(),
                    ts(&session.created_at),
                    ts(&session.last_activity_at),
                    ts_opt(&session.completed_at),
                    session.cost_usd,
                    codec::u64_opt(session.total_tokens),
                    codec::u64_opt(session.duration_ms),
                    session.num_turns,
                    session.result_content,
                    session.error_message,
                ],
            )?;
            Ok(())
        })
    }

    /// Apply a partial update.
    ///
    /// Two row invariants are enforced here rather than trusted to callers:
    /// a non-empty `assistant_session_id` is never replaced, and a terminal
    /// status is never left.
    pub fn update_session(&self, id: &SessionId, update: &SessionUpdate) -> Result<(), StoreError> {
        let mut sets: Vec<String> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        let mut push = |sql: String, value: Value| {
            values.push(value);
            sets.push(sql.replace('?', &format!("?{}", values.len())));
        };
        let text = |s: &str| Value::Text(s.to_string());
        let opt_int = |v: Option<i64>| v.map(Value::Integer).unwrap_or(Value::Null);

        if let Some(asid) = &update.assistant_session_id {
            push(
                "assistant_session_id = CASE WHEN assistant_session_id = '' THEN ? \
                 ELSE assistant_session_id END"
                    .to_string(),
                text(asid.as_str()),
            );
        }
        if let Some(status) = update.status {
            push(
                format!("status = CASE WHEN status IN {TERMINAL_SQL} THEN status ELSE ? END"),
                text(status.as_str()),
            );
        }
        if let Some(v) = &update.query {
            push("query = ?".to_string(), text(v));
        }
        if let Some(v) = &update.summary {
            push("summary = ?".to_string(), text(v));
        }
        if let Some(v) = &update.title {
            push("title = ?".to_string(), text(v));
        }
        if let Some(v) = &update.model {
            push("model = ?".to_string(), text(v));
        }
        if let Some(v) = &update.working_dir {
            push("working_dir = ?".to_string(), text(v));
        }
        if let Some(v) = &update.last_activity_at {
            push("last_activity_at = ?".to_string(), text(&ts(v)));
        }
        if let Some(v) = &update.completed_at {
            push("completed_at = ?".to_string(), text(&ts(v)));
        }
        if let Some(v) = update.cost_usd {
            push("cost_usd = ?".to_string(), Value::Real(v));
        }
        if let Some(v) = update.total_tokens {
            push("total_tokens = ?".to_string(), opt_int(codec::u64_opt(Some(v))));
        }
        if let Some(v) = update.duration_ms {
            push("duration_ms = ?".to_string(), opt_int(codec::u64_opt(Some(v))));
        }
        if let Some(v) = update.num_turns {
            push("num_turns = ?".to_string(), Value::Integer(i64::from(v)));
        }
        if let Some(v) = &update.result_content {
            push("result_content = ?".to_string(), text(v));
        }
        if let Some(v) = &update.error_message {
            push("error_message = ?".to_string(), text(v));
        }
        if let Some(v) = update.auto_accept_edits {
            push("auto_accept_edits = ?".to_string(), Value::Integer(i64::from(v)));
        }
        if let Some(v) = update.dangerously_skip_permissions {
            push(
                "dangerously_skip_permissions = ?".to_string(),
                Value::Integer(i64::from(v)),
            );
        }
        if let Some(v) = &update.dangerously_skip_permissions_expires_at {
            push(
                "dangerously_skip_permissions_expires_at = ?".to_string(),
                v.as_ref().map(|at| text(&ts(at))).unwrap_or(Value::Null),
            );
        }

        self.with_conn(|conn| {
            let changed = if sets.is_empty() {
                conn.query_row(
                    "SELECT COUNT(*) FROM sessions WHERE id = ?1",
                    params![id.as_str()],
                    |row| row.get::<_, i64>(0),
                )? as usize
            } else {
                values.push(text(id.as_str()));
                let sql = format!(
                    "UPDATE sessions SET {} WHERE id = ?{}",
                    sets.join(", "),
                    values.len()
                );
                conn.execute(&sql, params_from_iter(values.iter()))?
            };
            if changed == 0 {
                return Err(StoreError::not_found("session", id.as_str()));
            }
            Ok(())
        })
    }

    pub fn get_session(&self, id: &SessionId) -> Result<Session, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1"),
                params![id.as_str()],
                session_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("session", id.as_str()))
        })
    }

    /// Absence is `Ok(None)`, never an error.
    pub fn get_session_by_run_id(&self, run_id: &str) -> Result<Option<Session>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE run_id = ?1"),
                    params![run_id],
                    session_from_row,
                )
                .optional()?)
        })
    }

    /// All sessions, most recently active first
    pub fn list_sessions(&self) -> Result<Vec<Session>, StoreError> {
        self.query_sessions(
            &format!("SELECT {SESSION_COLUMNS} FROM sessions ORDER BY last_activity_at DESC, id"),
            Vec::new(),
        )
    }

    /// Case-insensitive substring search on titles.
    ///
    /// `limit == 0` means [`SEARCH_DEFAULT_LIMIT`]; larger limits are capped
    /// at [`SEARCH_MAX_LIMIT`].
    pub fn search_sessions_by_title(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<Session>, StoreError> {
        let limit = match limit {
            0 => SEARCH_DEFAULT_LIMIT,
            n => n.min(SEARCH_MAX_LIMIT),
        };
        self.query_sessions(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE instr(lower(title), lower(?1)) > 0 \
                 ORDER BY last_activity_at DESC, id LIMIT ?2"
            ),
            vec![Value::Text(query.to_string()), Value::Integer(limit as i64)],
        )
    }

    /// Sessions whose dangerous-skip elevation lapsed before `now`
    pub fn get_expired_dangerous_permissions_sessions(
        &self,
        now: DateTime<Utc>,
    ) -> Result<Vec<Session>, StoreError> {
        self.query_sessions(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions \
                 WHERE dangerously_skip_permissions = 1 \
                   AND dangerously_skip_permissions_expires_at IS NOT NULL \
                   AND dangerously_skip_permissions_expires_at < ?1"
            ),
            vec![Value::Text(ts(&now))],
        )
    }

    /// Direct children of `parent`, oldest first
    pub fn list_child_sessions(&self, parent: &SessionId) -> Result<Vec<Session>, StoreError> {
        self.query_sessions(
            &format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE parent_session_id = ?1 \
                 ORDER BY created_at, id"
            ),
            vec![Value::Text(parent.to_string())],
        )
    }

    fn query_sessions(&self, sql: &str, args: Vec<Value>) -> Result<Vec<Session>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(sql)?;
            let rows = stmt.query_map(params_from_iter(args.iter()), session_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

#[cfg(test)]
#[path = "sessions_tests.rs"]
mod tests;
