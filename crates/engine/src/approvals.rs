// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tool approvals: registration, correlation with the conversation, and
//! decisions.
//!
//! ```text
//! request_approval ──▶ create_approval ──▶ correlate (tool_use_id if given, else name)
//!        │                   └──▶ new_approval ─▶ bus
//!        └── waits on bus ◀── approval_resolved ◀── decide_approval
//! ```

use crate::bus::EventBus;
use crate::env;
use crate::error::SessionError;
use hl_core::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, BusEvent, BusEventType, Clock,
    EventFilter, IdGen, SessionId,
};
use hl_storage::Store;
use serde_json::{json, Value};
use tokio_util::sync::CancellationToken;

/// Tools approved without asking when a session auto-accepts edits
pub const EDIT_TOOLS: [&str; 3] = ["Edit", "Write", "MultiEdit"];

pub const AUTO_DENY_MESSAGE: &str = "Auto-denied for testing";
pub const DEFAULT_DENY_MESSAGE: &str = "Denied by user";

const AUTO_ACCEPT_EDITS_COMMENT: &str = "Auto-accepted (auto-accept edits enabled)";
const SKIP_PERMISSIONS_COMMENT: &str = "Auto-accepted (dangerous skip permissions enabled)";

#[derive(Clone)]
pub struct ApprovalService<C: Clock, G: IdGen> {
    store: Store,
    bus: EventBus,
    clock: C,
    ids: G,
}

impl<C: Clock, G: IdGen> ApprovalService<C, G> {
    pub fn new(store: Store, bus: EventBus, clock: C, ids: G) -> Self {
        Self {
            store,
            bus,
            clock,
            ids,
        }
    }

    /// Persist a pending approval for the session owning `run_id`, link it
    /// to the matching tool call and announce it.
    ///
    /// Sessions with elevated permissions get the approval decided on the
    /// spot; the returned approval reflects that.
    pub fn create_approval(
        &self,
        run_id: &str,
        tool_name: &str,
        tool_input: Value,
        tool_use_id: Option<String>,
    ) -> Result<Approval, SessionError> {
        let session = self
            .store
            .get_session_by_run_id(run_id)?
            .ok_or_else(|| SessionError::UnknownRun(run_id.to_string()))?;
        let now = self.clock.now();
        let approval = Approval::pending(
            ApprovalId::new(self.ids.next()),
            session.run_id.clone(),
            session.id.clone(),
            tool_name,
            tool_input,
            now,
        )
        .with_tool_use_id(tool_use_id);
        self.store.create_approval(&approval)?;

        let correlated = self.correlate(&approval)?;
        tracing::info!(
            approval_id = %approval.id,
            session_id = %session.id,
            tool_name,
            correlated,
            "approval created"
        );
        self.bus.publish(
            BusEvent::new(BusEventType::NewApproval)
                .with("approval_id", approval.id.as_str())
                .with("session_id", session.id.as_str())
                .with("run_id", session.run_id.as_str())
                .with("tool_name", tool_name)
                .with_opt("tool_use_id", approval.tool_use_id.clone()),
        );

        let auto_comment = if session.skip_permissions_active(now) {
            Some(SKIP_PERMISSIONS_COMMENT)
        } else if session.auto_accept_edits && EDIT_TOOLS.contains(&tool_name) {
            Some(AUTO_ACCEPT_EDITS_COMMENT)
        } else {
            None
        };
        match auto_comment {
            Some(comment) => {
                self.decide_approval(&approval.id, ApprovalDecision::Approve, Some(comment))
            }
            None => Ok(approval),
        }
    }

    /// Link to the exact tool call when the assistant named one, otherwise
    /// to the newest uncorrelated call with the same tool name.
    fn correlate(&self, approval: &Approval) -> Result<bool, SessionError> {
        let correlated = match &approval.tool_use_id {
            Some(tool_use_id) => self.store.correlate_approval_by_tool_id(
                &approval.session_id,
                tool_use_id,
                &approval.id,
            )?,
            None => self.store.correlate_approval(
                &approval.session_id,
                &approval.tool_name,
                &approval.id,
            )?,
        };
        if !correlated {
            tracing::warn!(
                approval_id = %approval.id,
                session_id = %approval.session_id,
                tool_name = %approval.tool_name,
                tool_use_id = approval.tool_use_id.as_deref(),
                "no pending tool call to correlate approval with"
            );
        }
        Ok(correlated)
    }

    /// Record a decision. Decisions are final: a second one fails with
    /// `AlreadyDecided`.
    pub fn decide_approval(
        &self,
        id: &ApprovalId,
        decision: ApprovalDecision,
        comment: Option<&str>,
    ) -> Result<Approval, SessionError> {
        let approval =
            self.store
                .update_approval_response(id, decision.status(), comment, self.clock.now())?;
        let rows = self
            .store
            .update_approval_status(id, approval.status.tool_status())?;
        tracing::info!(approval_id = %id, status = %approval.status, rows, "approval decided");

        self.bus.publish(
            BusEvent::new(BusEventType::ApprovalResolved)
                .with("approval_id", id.as_str())
                .with("session_id", approval.session_id.as_str())
                .with("run_id", approval.run_id.as_str())
                .with("status", approval.status.as_str())
                .with("approved", approval.status == ApprovalStatus::LocalApproved)
                .with_opt("comment", approval.comment.clone()),
        );
        Ok(approval)
    }

    /// Register an approval and wait for its decision.
    ///
    /// Returns the permission payload handed back to the assistant.
    pub async fn request_approval(
        &self,
        cancel: &CancellationToken,
        run_id: &str,
        tool_name: &str,
        tool_input: Value,
        tool_use_id: Option<String>,
    ) -> Result<Value, SessionError> {
        if env::auto_deny_all() {
            tracing::info!(run_id, tool_name, "auto-denying approval request");
            return Ok(json!({"behavior": "deny", "message": AUTO_DENY_MESSAGE}));
        }

        // Subscribe before creating so the decision cannot slip past
        let filter = EventFilter {
            run_id: run_id.to_string(),
            ..EventFilter::default()
        }
        .with_types([BusEventType::ApprovalResolved]);
        let mut sub = self.bus.subscribe(cancel, filter);

        let outcome = self
            .await_decision(cancel, &mut sub, run_id, tool_name, tool_input, tool_use_id)
            .await;
        self.bus.unsubscribe(sub.id);
        outcome.map(|approval| permission_payload(&approval))
    }

    async fn await_decision(
        &self,
        cancel: &CancellationToken,
        sub: &mut crate::bus::Subscription,
        run_id: &str,
        tool_name: &str,
        tool_input: Value,
        tool_use_id: Option<String>,
    ) -> Result<Approval, SessionError> {
        let approval = self.create_approval(run_id, tool_name, tool_input, tool_use_id)?;
        if approval.status.is_decided() {
            return Ok(approval);
        }
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    return Err(SessionError::Cancelled("approval request abandoned".to_string()));
                }
                event = sub.events.recv() => {
                    let Some(event) = event else {
                        return Err(SessionError::Cancelled("approval request abandoned".to_string()));
                    };
                    if event.get_str("approval_id") == Some(approval.id.as_str()) {
                        return Ok(self.store.get_approval(&approval.id)?);
                    }
                }
            }
        }
    }

    pub fn list_pending_approvals(
        &self,
        session_id: &SessionId,
    ) -> Result<Vec<Approval>, SessionError> {
        Ok(self.store.list_pending_approvals(session_id)?)
    }
}

/// `{"behavior":"allow","updatedInput":...}` or `{"behavior":"deny","message":...}`
pub fn permission_payload(approval: &Approval) -> Value {
    match approval.status {
        ApprovalStatus::LocalApproved => {
            json!({"behavior": "allow", "updatedInput": approval.tool_input})
        }
        _ => json!({
            "behavior": "deny",
            "message": approval.comment.as_deref().unwrap_or(DEFAULT_DENY_MESSAGE),
        }),
    }
}

#[cfg(test)]
#[path = "approvals_tests.rs"]
mod tests;
