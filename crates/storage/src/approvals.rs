// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Approval rows. Decisions are write-once.

use crate::codec::{get_json, get_parsed, get_ts, get_ts_opt, ts, ts_opt};
use crate::error::StoreError;
use crate::store::Store;
use chrono::{DateTime, Utc};
use hl_core::{Approval, ApprovalId, ApprovalStatus, SessionId};
use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

const APPROVAL_COLUMNS: &str = "id, run_id, session_id, status, created_at, responded_at, \
     tool_name, tool_input, tool_use_id, comment";

fn approval_from_row(row: &Row<'_>) -> rusqlite::Result<Approval> {
    Ok(Approval {
        id: ApprovalId::new(row.get::<_, String>(0)?),
        run_id: row.get::<_, String>(1)?.into(),
        session_id: SessionId::new(row.get::<_, String>(2)?),
        status: get_parsed(row, 3)?,
        created_at: get_ts(row, 4)?,
        responded_at: get_ts_opt(row, 5)?,
        tool_name: row.get(6)?,
        tool_input: get_json(row, 7)?,
        tool_use_id: row.get(8)?,
        comment: row.get(9)?,
    })
}

impl Store {
    pub fn create_approval(&self, approval: &Approval) -> Result<(), StoreError> {
        let input = serde_json::to_string(&approval.tool_input)?;
        self.with_conn(|conn| {
            conn.execute(
                &format!(
                    "INSERT INTO approvals ({APPROVAL_COLUMNS}) \
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)"
                ),
                params![
                    approval.id.as_str(),
                    approval.run_id.as_str(),
                    approval.session_id.as_str(),
                    approval.status.as_str(),
                    ts(&approval.created_at),
                    ts_opt(&approval.responded_at),
                    approval.tool_name,
                    input,
                    approval.tool_use_id,
                    approval.comment,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_approval(&self, id: &ApprovalId) -> Result<Approval, StoreError> {
        self.with_conn(|conn| {
            conn.query_row(
                &format!("SELECT {APPROVAL_COLUMNS} FROM approvals WHERE id = ?1"),
                params![id.as_str()],
                approval_from_row,
            )
            .optional()?
            .ok_or_else(|| StoreError::not_found("approval", id.as_str()))
        })
    }

    /// Record the decision on a pending approval.
    ///
    /// Fails with [`StoreError::AlreadyDecided`] when the approval already
    /// holds a terminal status; the check and write share one transaction.
    pub fn update_approval_response(
        &self,
        id: &ApprovalId,
        status: ApprovalStatus,
        comment: Option<&str>,
        responded_at: DateTime<Utc>,
    ) -> Result<Approval, StoreError> {
        if !status.is_decided() {
            return Err(StoreError::InvalidStatus(format!(
                "approval response must be a decision, got {status}"
            )));
        }
        self.with_conn(|conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            let mut approval = tx
                .query_row(
                    &format!("SELECT {APPROVAL_COLUMNS} FROM approvals WHERE id = ?1"),
                    params![id.as_str()],
                    approval_from_row,
                )
                .optional()?
                .ok_or_else(|| StoreError::not_found("approval", id.as_str()))?;
            if approval.status.is_decided() {
                return Err(StoreError::AlreadyDecided {
                    id: id.to_string(),
                    current_status: approval.status,
                });
            }
            tx.execute(
                "UPDATE approvals SET status = ?2, comment = ?3, responded_at = ?4 WHERE id = ?1",
                params![id.as_str(), status.as_str(), comment, ts(&responded_at)],
            )?;
            tx.commit()?;

            approval.status = status;
            approval.comment = comment.map(str::to_string);
            approval.responded_at = Some(responded_at);
            Ok(approval)
        })
    }

    /// Undecided approvals of a session, oldest first
    pub fn list_pending_approvals(&self, session_id: &SessionId) -> Result<Vec<Approval>, StoreError> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {APPROVAL_COLUMNS} FROM approvals \
                 WHERE session_id = ?1 AND status = 'local_pending' ORDER BY created_at, id"
            ))?;
            let rows = stmt.query_map(params![session_id.as_str()], approval_from_row)?;
            Ok(rows.collect::<Result<Vec<_>, _>>()?)
        })
    }
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
