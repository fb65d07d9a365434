// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Conversation event log, tool-call completion and approval correlation.

use crate::codec::{get_parsed, get_parsed_opt, get_ts, ts};
use crate::error::StoreError;
use crate::store::Store;
use hl_core::{
    ApprovalId, AssistantSessionId, ConversationEvent, ConversationEventType, SessionId,
    ToolApprovalStatus,
};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashSet;

const EVENT_COLUMNS: &str = "id, session_id, assistant_session_id, sequence, event_type, \
     created_at, role, content, tool_id, tool_name, tool_input_json, parent_tool_use_id, \
     tool_result_for_id, tool_result_content, is_completed, approval_status, approval_id";

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<ConversationEvent> {
    Ok(ConversationEvent {
        id: row.get(0)?,
        session_id: SessionId::new(row.get::<_, String>(1)?),
        assistant_session_id: AssistantSessionId::new(row.get::<_, String>(2)?),
        sequence: row.get(3)?,
        event_type: get_parsed(row, 4)?,
        created_at: get_ts(row, 5)?,
        role: get_parsed_opt(row, 6)?,
        content: row.get(7)?,
        tool_id: row.get(8)?,
        tool_name: row.get(9)?,
        tool_input_json: row.get(10)?,
        parent_tool_use_id: row.get(11)?,
        tool_result_for_id: row.get(12)?,
        tool_result_content: row.get(13)?,
        is_completed: row.get(14)?,
        approval_status: get_parsed_opt(row, 15)?,
        approval_id: row.get::<_, Option<String>>(16)?.map(ApprovalId::new),
    })
}

fn query_events(
    conn: &Connection,
    sql: &str,
    args: impl rusqlite::Params,
) -> Result<Vec<ConversationEvent>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt.query_map(args, event_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

impl Store {
    /// Append an event, assigning `sequence = MAX(sequence) + 1` for its
    /// assistant session inside one immediate transaction.
    ///
    /// Returns the stored row with `id` and `sequence` filled in.
    pub fn add_conversation_event(
        &self,
        event: &ConversationEvent,
    ) -> Result<ConversationEvent, StoreError> {
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let max: i64 = tx.query_row(
                "SELECT COALESCE(MAX(sequence), 0) FROM conversation_events \
                 WHERE assistant_session_id = ?1",
                params![event.assistant_session_id.as_str()],
                |row| row.get(0),
            )?;
            let sequence = max + 1;
            tx.execute(
                "INSERT INTO conversation_events (session_id, assistant_session_id, sequence, \
                 event_type, created_at, role, content, tool_id, tool_name, tool_input_json, \
                 parent_tool_use_id, tool_result_for_id, tool_result_content, is_completed, \
                 approval_status, approval_id) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
                params![
                    event.session_id.as_str(),
                    event.assistant_session_id.as_str(),
                    sequence,
                    event.event_type.as_str(),
                    ts(&event.created_at),
                    event.role.map(|r| r.as_str()),
                    event.content,
                    event.tool_id,
                    event.tool_name,
                    event.tool_input_json,
                    event.parent_tool_use_id,
                    event.tool_result_for_id,
                    event.tool_result_content,
                    event.is_completed,
                    event.approval_status.map(|s| s.as_str()),
                    event.approval_id.as_ref().map(ApprovalId::as_str),
                ],
            )?;
            let id = tx.last_insert_rowid();
            tx.commit()?;

            let mut stored = event.clone();
            stored.id = id;
            stored.sequence = sequence;
            Ok(stored)
        })
    }

    /// Events of one assistant session, by sequence
    pub fn get_conversation(
        &self,
        assistant_session_id: &AssistantSessionId,
    ) -> Result<Vec<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            query_events(
                conn,
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM conversation_events \
                     WHERE assistant_session_id = ?1 ORDER BY sequence"
                ),
                params![assistant_session_id.as_str()],
            )
        })
    }

    /// Full conversation of a session including the history it continued.
    ///
    /// Walks `parent_session_id` upwards, then returns events of each
    /// distinct assistant session root-most first, each by sequence. A
    /// session that has not reported its assistant id yet has no
    /// conversation.
    pub fn get_session_conversation(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationEvent>, StoreError> {
        let target = self.get_session(session_id)?;
        if target.assistant_session_id.is_empty() {
            return Ok(Vec::new());
        }

        let mut chain = vec![target.assistant_session_id.clone()];
        let mut visited: HashSet<SessionId> = HashSet::from([target.id.clone()]);
        let mut next = target.parent_session_id.clone();
        while let Some(parent_id) = next {
            if !visited.insert(parent_id.clone()) {
                tracing::warn!(
                    session_id = %session_id,
                    parent = %parent_id,
                    "cycle in session parent chain",
                );
                break;
            }
            let parent = match self.get_session(&parent_id) {
                Ok(parent) => parent,
                Err(e) if e.is_not_found() => break,
                Err(e) => return Err(e),
            };
            if !parent.assistant_session_id.is_empty() {
                chain.push(parent.assistant_session_id.clone());
            }
            next = parent.parent_session_id;
        }
        chain.reverse();

        let mut seen = HashSet::new();
        let mut events = Vec::new();
        for asid in chain {
            if seen.insert(asid.clone()) {
                events.extend(self.get_conversation(&asid)?);
            }
        }
        Ok(events)
    }

    pub fn get_tool_call_by_id(
        &self,
        tool_id: &str,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM conversation_events \
                         WHERE tool_id = ?1 AND event_type = 'tool_call' \
                         ORDER BY id DESC LIMIT 1"
                    ),
                    params![tool_id],
                    event_from_row,
                )
                .optional()?)
        })
    }

    /// Most recent uncompleted call of `tool_name` in the session
    pub fn get_pending_tool_call(
        &self,
        session_id: &SessionId,
        tool_name: &str,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        self.latest_tool_call(session_id, tool_name, "")
    }

    /// Same as [`Store::get_pending_tool_call`], restricted to calls no
    /// approval has been bound to yet
    pub fn get_uncorrelated_pending_tool_call(
        &self,
        session_id: &SessionId,
        tool_name: &str,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        self.latest_tool_call(session_id, tool_name, "AND approval_status IS NULL")
    }

    fn latest_tool_call(
        &self,
        session_id: &SessionId,
        tool_name: &str,
        extra: &str,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM conversation_events \
                         WHERE session_id = ?1 AND tool_name = ?2 AND event_type = 'tool_call' \
                           AND is_completed = 0 {extra} \
                         ORDER BY sequence DESC, id DESC LIMIT 1"
                    ),
                    params![session_id.as_str(), tool_name],
                    event_from_row,
                )
                .optional()?)
        })
    }

    /// All uncompleted tool calls of the session, oldest first
    pub fn get_pending_tool_calls(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            query_events(
                conn,
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM conversation_events \
                     WHERE session_id = ?1 AND event_type = 'tool_call' AND is_completed = 0 \
                     ORDER BY sequence, id"
                ),
                params![session_id.as_str()],
            )
        })
    }

    /// Idempotent; no matching row is not an error.
    pub fn mark_tool_call_completed(
        &self,
        tool_id: &str,
        session_id: &SessionId,
    ) -> Result<(), StoreError> {
        self.with_conn(|conn| {
            conn.execute(
                "UPDATE conversation_events SET is_completed = 1 \
                 WHERE tool_id = ?1 AND session_id = ?2 AND event_type = 'tool_call'",
                params![tool_id, session_id.as_str()],
            )?;
            Ok(())
        })
    }

    /// Bind `approval_id` to the most recent uncompleted, uncorrelated call
    /// of `tool_name`. Returns whether a row was bound.
    pub fn correlate_approval(
        &self,
        session_id: &SessionId,
        tool_name: &str,
        approval_id: &ApprovalId,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE conversation_events SET approval_status = 'pending', approval_id = ?3 \
                 WHERE id = ( \
                     SELECT id FROM conversation_events \
                     WHERE session_id = ?1 AND tool_name = ?2 AND event_type = 'tool_call' \
                       AND is_completed = 0 AND approval_status IS NULL \
                     ORDER BY sequence DESC, id DESC LIMIT 1)",
                params![session_id.as_str(), tool_name, approval_id.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Bind `approval_id` to the call with `tool_id`, unless that call
    /// already carries an approval status.
    pub fn correlate_approval_by_tool_id(
        &self,
        session_id: &SessionId,
        tool_id: &str,
        approval_id: &ApprovalId,
    ) -> Result<bool, StoreError> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE conversation_events SET approval_status = 'pending', approval_id = ?3 \
                 WHERE session_id = ?1 AND tool_id = ?2 AND event_type = 'tool_call' \
                   AND approval_status IS NULL",
                params![session_id.as_str(), tool_id, approval_id.as_str()],
            )?;
            Ok(changed > 0)
        })
    }

    /// Record a decision on every row bound to `approval_id`.
    ///
    /// Only rows still `pending` move; returns how many did.
    pub fn update_approval_status(
        &self,
        approval_id: &ApprovalId,
        status: ToolApprovalStatus,
    ) -> Result<usize, StoreError> {
        if !status.is_decided() {
            return Err(StoreError::InvalidStatus(format!(
                "conversation approval status must be decided, got {status}"
            )));
        }
        self.with_conn(|conn| {
            Ok(conn.execute(
                "UPDATE conversation_events SET approval_status = ?2 \
                 WHERE approval_id = ?1 AND approval_status = 'pending'",
                params![approval_id.as_str(), status.as_str()],
            )?)
        })
    }

    /// Count of events in the log for one assistant session
    pub fn count_conversation_events(
        &self,
        assistant_session_id: &AssistantSessionId,
    ) -> Result<usize, StoreError> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM conversation_events WHERE assistant_session_id = ?1",
                params![assistant_session_id.as_str()],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        })
    }

    /// First event of an assistant session, if any
    pub fn first_conversation_event(
        &self,
        assistant_session_id: &AssistantSessionId,
    ) -> Result<Option<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            Ok(conn
                .query_row(
                    &format!(
                        "SELECT {EVENT_COLUMNS} FROM conversation_events \
                         WHERE assistant_session_id = ?1 ORDER BY sequence LIMIT 1"
                    ),
                    params![assistant_session_id.as_str()],
                    event_from_row,
                )
                .optional()?)
        })
    }

    /// Events of one type for a session, oldest first
    pub fn get_session_events_of_type(
        &self,
        session_id: &SessionId,
        event_type: ConversationEventType,
    ) -> Result<Vec<ConversationEvent>, StoreError> {
        self.with_conn(|conn| {
            query_events(
                conn,
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM conversation_events \
                     WHERE session_id = ?1 AND event_type = ?2 ORDER BY sequence, id"
                ),
                params![session_id.as_str(), event_type.as_str()],
            )
        })
    }
}

#[cfg(test)]
#[path = "conversation_tests.rs"]
mod tests;
