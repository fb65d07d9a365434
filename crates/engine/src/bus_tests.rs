// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hl_core::BusEventType;
use std::time::Duration;

fn status_event(session_id: &str) -> BusEvent {
    BusEvent::status_changed(session_id, "run-1", "starting", "running")
}

async fn eventually(mut check: impl FnMut() -> bool) {
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn publish_stamps_and_delivers() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut sub = bus.subscribe(&scope, EventFilter::all());

    assert_eq!(bus.publish(status_event("s1")), 1);
    let event = sub.events.recv().await.unwrap();
    assert_eq!(event.session_id(), Some("s1"));
    assert!(event.timestamp > chrono::DateTime::<Utc>::default());
}

#[yare::parameterized(
    type_match      = { EventFilter::all().with_types([BusEventType::SessionStatusChanged]), true },
    type_mismatch   = { EventFilter::all().with_types([BusEventType::NewApproval]),          false },
    session_match   = { EventFilter::for_session("s1"),                                      true },
    session_other   = { EventFilter::for_session("s2"),                                      false },
    run_match       = { EventFilter { run_id: "run-1".into(), ..EventFilter::default() },   true },
    run_other       = { EventFilter { run_id: "run-2".into(), ..EventFilter::default() },   false },
)]
fn filters_select_subscribers(filter: EventFilter, expected: bool) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    rt.block_on(async {
        let bus = EventBus::new();
        let mut sub = bus.subscribe(&CancellationToken::new(), filter);
        bus.publish(status_event("s1"));
        assert_eq!(sub.events.try_recv().is_ok(), expected);
    });
}

#[tokio::test]
async fn missing_data_key_never_matches_a_session_filter() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(&CancellationToken::new(), EventFilter::for_session("s1"));
    bus.publish(BusEvent::new(BusEventType::ConversationUpdated));
    assert!(sub.events.try_recv().is_err());
}

#[tokio::test]
async fn slow_subscriber_drops_without_blocking_publisher() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut slow = bus.subscribe(&scope, EventFilter::all());
    let mut fast = bus.subscribe(&scope, EventFilter::all());

    let total = SUBSCRIBER_CAPACITY + 50;
    let mut fast_seen = 0;
    for _ in 0..total {
        bus.publish(status_event("s1"));
        while fast.events.try_recv().is_ok() {
            fast_seen += 1;
        }
    }

    let mut buffered = 0;
    while slow.events.try_recv().is_ok() {
        buffered += 1;
    }
    assert_eq!(buffered, SUBSCRIBER_CAPACITY);
    assert_eq!(fast_seen, total);
}

#[tokio::test]
async fn unsubscribe_is_idempotent_and_closes_channel() {
    let bus = EventBus::new();
    let mut sub = bus.subscribe(&CancellationToken::new(), EventFilter::all());
    bus.unsubscribe(sub.id);
    bus.unsubscribe(sub.id);
    assert_eq!(bus.subscriber_count(), 0);
    assert!(sub.events.recv().await.is_none());
}

#[tokio::test]
async fn scope_end_removes_subscription() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let mut sub = bus.subscribe(&scope, EventFilter::all());
    let _other = bus.subscribe(&CancellationToken::new(), EventFilter::all());

    scope.cancel();
    eventually(|| bus.subscriber_count() == 1).await;
    assert!(sub.events.recv().await.is_none());
}

#[tokio::test]
async fn publish_with_no_subscribers_delivers_nothing() {
    let bus = EventBus::new();
    assert_eq!(bus.publish(status_event("s1")), 0);
}

#[tokio::test]
async fn subscription_ids_are_distinct() {
    let bus = EventBus::new();
    let scope = CancellationToken::new();
    let a = bus.subscribe(&scope, EventFilter::all());
    let b = bus.subscribe(&scope, EventFilter::all());
    assert_ne!(a.id, b.id);
}
