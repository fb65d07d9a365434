// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shutdown and permission-expiry specs

use crate::prelude::*;
use hl_adapters::FakeScript;
use hl_core::{EventFilter, Role, SessionStatus, StreamEvent};
use hl_engine::{SessionError, SettingsUpdate};
use std::time::Duration;

fn long_running(asid: &str) -> FakeScript {
    FakeScript::new(vec![
        StreamEvent::session_created(asid),
        StreamEvent::text(asid, Role::Assistant, "thinking hard"),
    ])
    .held_open()
}

#[tokio::test]
async fn stop_all_interrupts_every_running_session() {
    let h = Harness::new();
    h.provider.push_script(long_running("A1"));
    h.provider.push_script(long_running("A2"));
    let first = h.manager.launch(&h.scope, h.request("one")).await.unwrap();
    let second = h.manager.launch(&h.scope, h.request("two")).await.unwrap();
    h.wait_for_status(&first.id, SessionStatus::Running).await;
    h.wait_for_status(&second.id, SessionStatus::Running).await;

    h.manager.stop_all(Duration::from_secs(1)).await.unwrap();

    assert_eq!(h.manager.active_count(), 0);
    assert_eq!(h.provider.interrupt_count(), 2);
    assert_eq!(h.provider.kill_count(), 0);
    h.wait_for_status(&first.id, SessionStatus::Completed).await;
    h.wait_for_status(&second.id, SessionStatus::Completed).await;
}

#[tokio::test]
async fn stubborn_session_is_killed_at_the_deadline() {
    let h = Harness::new();
    h.provider.push_script(long_running("A1").stubborn());
    let session = h.manager.launch(&h.scope, h.request("never stops")).await.unwrap();
    h.wait_for_status(&session.id, SessionStatus::Running).await;

    let err = h
        .manager
        .stop_all(Duration::from_millis(100))
        .await
        .unwrap_err();

    assert!(
        matches!(err, SessionError::DeadlineExceeded { remaining: 1 }),
        "{err}"
    );
    assert_eq!(h.provider.interrupt_count(), 1);
    assert_eq!(h.provider.kill_count(), 1);
    h.wait_for_cleanup(&session.id).await;
}

#[tokio::test]
async fn lapsed_skip_permissions_grant_is_revoked() {
    let h = Harness::new();
    let draft = h.manager.create_draft(h.request("")).unwrap();
    h.manager
        .update_session_settings(
            &draft.id,
            SettingsUpdate {
                dangerously_skip_permissions: Some(true),
                dangerously_skip_permissions_timeout: Some(Duration::from_secs(60)),
                ..SettingsUpdate::default()
            },
        )
        .unwrap();
    let mut sub = h
        .bus
        .subscribe(&h.scope, EventFilter::for_session(draft.id.as_str()));
    let monitor = h.manager.expiry_monitor(Duration::from_secs(30));

    assert_eq!(monitor.check_expired().unwrap(), 0);
    h.clock.advance(chrono::Duration::seconds(61));
    assert_eq!(monitor.check_expired().unwrap(), 1);

    let row = h.store.get_session(&draft.id).unwrap();
    assert!(!row.dangerously_skip_permissions);
    assert_eq!(row.dangerously_skip_permissions_expires_at, None);
    let event = sub.events.try_recv().unwrap();
    assert_eq!(event.get_str("reason"), Some("expired"));
}
