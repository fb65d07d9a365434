// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use hl_core::test_support::{assistant_message, session, user_message};
use hl_core::FakeClock;

fn setup() -> (Store, QueryInjector<FakeClock>, SessionId, AssistantSessionId) {
    let store = Store::in_memory().unwrap();
    store.create_session(&session("s1")).unwrap();
    let injector = QueryInjector::new(store.clone(), FakeClock::default());
    (store, injector, SessionId::new("s1"), AssistantSessionId::new("A1"))
}

#[test]
fn injects_query_as_first_event() {
    let (store, injector, sid, asid) = setup();
    injector.store_pending(&sid, "Write hello world");

    let event = injector.inject_pending(&sid, &asid).unwrap().unwrap();
    assert_eq!(event.sequence, 1);
    assert!(event.is_user_message());

    let conversation = store.get_conversation(&asid).unwrap();
    assert_eq!(conversation.len(), 1);
    assert_eq!(conversation[0].content, "Write hello world");
    assert!(!injector.has_pending(&sid));
}

#[test]
fn second_injection_is_a_noop() {
    let (store, injector, sid, asid) = setup();
    injector.store_pending(&sid, "q");
    injector.inject_pending(&sid, &asid).unwrap();
    assert!(injector.inject_pending(&sid, &asid).unwrap().is_none());
    assert_eq!(store.count_conversation_events(&asid).unwrap(), 1);
}

#[test]
fn existing_user_message_suppresses_injection() {
    let (store, injector, sid, asid) = setup();
    store
        .add_conversation_event(&user_message("s1", "A1", "already here"))
        .unwrap();
    injector.store_pending(&sid, "q");

    assert!(injector.inject_pending(&sid, &asid).unwrap().is_none());
    assert!(!injector.has_pending(&sid));
    assert_eq!(store.count_conversation_events(&asid).unwrap(), 1);
}

#[test]
fn non_user_first_event_does_not_suppress() {
    let (store, injector, sid, asid) = setup();
    store
        .add_conversation_event(&assistant_message("s1", "A1", "hello"))
        .unwrap();
    injector.store_pending(&sid, "q");

    let event = injector.inject_pending(&sid, &asid).unwrap().unwrap();
    assert_eq!(event.sequence, 2);
}

#[yare::parameterized(
    missing = { None },
    empty   = { Some("") },
)]
fn nothing_to_inject(pending: Option<&str>) {
    let (store, injector, sid, asid) = setup();
    if let Some(query) = pending {
        injector.store_pending(&sid, query);
    }
    assert!(injector.inject_pending(&sid, &asid).unwrap().is_none());
    assert_eq!(store.count_conversation_events(&asid).unwrap(), 0);
}

#[test]
fn clear_drops_pending_query() {
    let (_, injector, sid, asid) = setup();
    injector.store_pending(&sid, "q");
    injector.clear(&sid);
    injector.clear(&sid);
    assert!(injector.inject_pending(&sid, &asid).unwrap().is_none());
}

#[test]
fn injected_row_is_stamped_by_the_clock() {
    let store = Store::in_memory().unwrap();
    store.create_session(&session("s1")).unwrap();
    let clock = FakeClock::default();
    clock.advance(chrono::Duration::seconds(90));
    let injector = QueryInjector::new(store.clone(), clock.clone());
    let (sid, asid) = (SessionId::new("s1"), AssistantSessionId::new("A1"));
    injector.store_pending(&sid, "q");

    let event = injector.inject_pending(&sid, &asid).unwrap().unwrap();
    assert_eq!(event.created_at, clock.now());
    assert_eq!(store.get_conversation(&asid).unwrap()[0].created_at, clock.now());
}
