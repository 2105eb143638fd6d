// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-process publish/subscribe bus keyed by [`Topic`].
//!
//! Publishers and subscribers rendezvous by topic.  Each subscription owns an
//! unbounded channel receiver; the bus keeps only the sending half, so a
//! subscriber whose receiver is gone is pruned on the next publish.  Nothing
//! is buffered for topics without subscribers and nothing is replayed to late
//! subscribers.

use std::collections::HashMap;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::task::{Context, Poll};

use futures_util::Stream;
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::topic::Topic;

/// A published payload, shared immutably between all subscribers.
pub type Payload = Arc<serde_json::Value>;

type SubscriberMap = IndexMap<u64, mpsc::UnboundedSender<Payload>>;

#[derive(Default)]
struct BusInner {
    topics: Mutex<HashMap<Topic, SubscriberMap>>,
    next_id: AtomicU64,
}

impl BusInner {
    fn remove(&self, handle: SubscriptionHandle) -> bool {
        let mut topics = self.topics.lock();
        let Some(subs) = topics.get_mut(&handle.topic) else {
            return false;
        };
        let removed = subs.shift_remove(&handle.id).is_some();
        if subs.is_empty() {
            topics.remove(&handle.topic);
        }
        removed
    }
}

/// Cheaply cloneable handle to a shared event bus.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver `payload` to every subscriber currently registered on `topic`.
    ///
    /// Returns the number of subscribers reached.  With no subscribers the
    /// payload is dropped.
    pub fn publish(&self, topic: Topic, payload: Payload) -> usize {
        let mut topics = self.inner.topics.lock();
        let Some(subs) = topics.get_mut(&topic) else {
            tracing::trace!(%topic, "publish with no subscribers");
            return 0;
        };
        // Sending under the lock keeps per-topic delivery order identical to
        // publish order for every subscriber.
        subs.retain(|_, tx| tx.send(Arc::clone(&payload)).is_ok());
        let delivered = subs.len();
        if subs.is_empty() {
            topics.remove(&topic);
        }
        tracing::trace!(%topic, delivered, "published");
        delivered
    }

    /// Register a new subscriber on `topic`.
    ///
    /// The returned stream yields only payloads published after this call.
    pub fn subscribe(&self, topic: Topic) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let (tx, rx) = mpsc::unbounded_channel();
        self.inner.topics.lock().entry(topic).or_default().insert(id, tx);
        tracing::debug!(%topic, subscriber = id, "subscribed");
        Subscription {
            handle: SubscriptionHandle { id, topic },
            rx,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Stop delivery to `handle`.  Idempotent; returns whether a live
    /// registration was removed.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) -> bool {
        let removed = self.inner.remove(handle);
        if removed {
            tracing::debug!(topic = %handle.topic, subscriber = handle.id, "unsubscribed");
        }
        removed
    }

    /// Number of live registrations on `topic`.
    pub fn subscriber_count(&self, topic: Topic) -> usize {
        self.inner.topics.lock().get(&topic).map_or(0, IndexMap::len)
    }

    /// Number of live registrations across all topics.
    pub fn total_subscribers(&self) -> usize {
        self.inner.topics.lock().values().map(IndexMap::len).sum()
    }
}

/// Opaque token for one registration on one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    id: u64,
    topic: Topic,
}

impl SubscriptionHandle {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn topic(&self) -> Topic {
        self.topic
    }
}

/// A live subscription: an unbounded, never-completing stream of payloads.
///
/// The stream ends only after the registration is removed and any payloads
/// already queued have been drained.  Dropping the subscription unsubscribes.
pub struct Subscription {
    handle: SubscriptionHandle,
    rx: mpsc::UnboundedReceiver<Payload>,
    bus: Weak<BusInner>,
}

impl Subscription {
    pub fn handle(&self) -> SubscriptionHandle {
        self.handle
    }

    pub fn topic(&self) -> Topic {
        self.handle.topic
    }

    /// Wait for the next payload.
    pub async fn recv(&mut self) -> Option<Payload> {
        self.rx.recv().await
    }

    /// Return a queued payload without waiting.
    pub fn try_recv(&mut self) -> Option<Payload> {
        self.rx.try_recv().ok()
    }
}

impl Stream for Subscription {
    type Item = Payload;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.bus.upgrade() {
            inner.remove(self.handle);
        }
    }
}

#[cfg(test)]
#[path = "bus_tests.rs"]
mod tests;
