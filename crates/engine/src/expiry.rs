// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Periodic revocation of lapsed `dangerously_skip_permissions` grants.

use crate::bus::EventBus;
use hl_core::{BusEvent, BusEventType, Clock, SessionUpdate};
use hl_storage::{Store, StoreError};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_CHECK_INTERVAL: Duration = Duration::from_secs(30);

/// Interval from a configured number of seconds; non-positive values
/// fall back to [`DEFAULT_CHECK_INTERVAL`]
pub fn interval_from_secs(secs: i64) -> Duration {
    match u64::try_from(secs) {
        Ok(secs) if secs > 0 => Duration::from_secs(secs),
        _ => DEFAULT_CHECK_INTERVAL,
    }
}

pub struct PermissionExpiryMonitor<C: Clock> {
    store: Store,
    bus: EventBus,
    clock: C,
    interval: Duration,
}

impl<C: Clock> PermissionExpiryMonitor<C> {
    pub fn new(store: Store, bus: EventBus, clock: C, interval: Duration) -> Self {
        let interval = if interval.is_zero() {
            DEFAULT_CHECK_INTERVAL
        } else {
            interval
        };
        Self {
            store,
            bus,
            clock,
            interval,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Revoke every lapsed grant. Returns how many sessions were revoked.
    pub fn check_expired(&self) -> Result<usize, StoreError> {
        let now = self.clock.now();
        let expired = self.store.get_expired_dangerous_permissions_sessions(now)?;
        let mut revoked = 0;
        for session in expired {
            let update = SessionUpdate {
                dangerously_skip_permissions: Some(false),
                dangerously_skip_permissions_expires_at: Some(None),
                ..SessionUpdate::default()
            };
            if let Err(e) = self.store.update_session(&session.id, &update) {
                tracing::error!(session_id = %session.id, error = %e, "failed to revoke expired permissions");
                continue;
            }
            revoked += 1;
            tracing::info!(session_id = %session.id, "dangerous skip permissions expired");

            let expired_at = session
                .dangerously_skip_permissions_expires_at
                .unwrap_or(now)
                .to_rfc3339();
            self.bus.publish(
                BusEvent::new(BusEventType::SessionSettingsChanged)
                    .with("session_id", session.id.as_str())
                    .with("run_id", session.run_id.as_str())
                    .with("reason", "expired")
                    .with("dangerously_skip_permissions", false)
                    .with("expired_at", expired_at),
            );
        }
        Ok(revoked)
    }

    /// Check on every tick until `cancel` fires.
    pub async fn run(self, cancel: CancellationToken) {
        tracing::info!(interval_ms = self.interval.as_millis() as u64, "permission expiry monitor started");
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.check_expired() {
                        tracing::error!(error = %e, "permission expiry check failed");
                    }
                }
            }
        }
        tracing::info!("permission expiry monitor stopped");
    }
}

#[cfg(test)]
#[path = "expiry_tests.rs"]
mod tests;
