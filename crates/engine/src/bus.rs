// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process filtered pub/sub.
//!
//! Every subscription owns a bounded channel and is bound to a cancel
//! scope. Publishing never waits on a subscriber: when a buffer is full the
//! event is dropped for that subscriber only.

use chrono::Utc;
use hl_core::{BusEvent, EventFilter};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

/// Buffered events per subscriber
pub const SUBSCRIBER_CAPACITY: usize = 100;

/// Opaque subscription handle id
pub type SubscriptionId = u64;

/// A live subscription. The channel closes when the subscription is
/// removed, either by [`EventBus::unsubscribe`] or by its scope ending.
#[derive(Debug)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub events: mpsc::Receiver<BusEvent>,
}

struct Subscriber {
    filter: EventFilter,
    tx: mpsc::Sender<BusEvent>,
    scope: CancellationToken,
}

#[derive(Default)]
struct BusInner {
    subscribers: RwLock<HashMap<SubscriptionId, Subscriber>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, id: SubscriptionId) -> Option<Subscriber> {
        self.subscribers.write().remove(&id)
    }
}

/// Shared event bus. Cheap to clone.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber. It is removed when `scope` is cancelled.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe(&self, scope: &CancellationToken, filter: EventFilter) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::channel(SUBSCRIBER_CAPACITY);
        let scope = scope.child_token();
        self.inner.subscribers.write().insert(
            id,
            Subscriber {
                filter,
                tx,
                scope: scope.clone(),
            },
        );
        tracing::debug!(subscription = id, "subscribed");

        let bus: Weak<BusInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            scope.cancelled().await;
            if let Some(bus) = bus.upgrade() {
                if bus.remove(id).is_some() {
                    tracing::debug!(subscription = id, "subscription scope ended");
                }
            }
        });

        Subscription { id, events: rx }
    }

    /// Remove a subscriber. Unknown ids are ignored.
    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(subscriber) = self.inner.remove(id) {
            subscriber.scope.cancel();
            tracing::debug!(subscription = id, "unsubscribed");
        }
    }

    /// Stamp and fan out `event`; returns how many subscribers received it.
    pub fn publish(&self, mut event: BusEvent) -> usize {
        event.timestamp = Utc::now();
        let subscribers = self.inner.subscribers.read();
        let mut delivered = 0;
        for (id, subscriber) in subscribers.iter() {
            if !subscriber.filter.matches(&event) {
                continue;
            }
            match subscriber.tx.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    tracing::warn!(
                        subscription = id,
                        event_type = %event.event_type,
                        "subscriber buffer full, dropping event"
                    );
                }
                Err(TrySendError::Closed(_)) => {
                    tracing::trace!(subscription = id, "subscriber gone");
                }
            }
        }
        delivered
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
