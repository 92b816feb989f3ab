//! Subscription manager for broadcasting change events.

use crate::source::EventSink;
use crate::types::{ChangeEvent, Entity, SubscriptionScope};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Internal subscription state.
struct Subscription<E> {
    scope: SubscriptionScope,
    sink: EventSink<E>,
}

/// Manages scoped subscriptions and broadcasts events to them.
///
/// Each subscriber has a bounded buffer. A subscriber whose buffer is full,
/// or whose receiving side is gone, is dropped; its sink closes and the
/// binding on the other end sees the stream end.
pub struct SubscriptionManager<E> {
    /// Active subscriptions by ID.
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription<E>>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl<E: Entity> SubscriptionManager<E> {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `sink` for events matching `scope`.
    pub fn subscribe(&self, scope: SubscriptionScope, sink: EventSink<E>) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(?id, topic = scope.topic(), "subscriber registered");
        self.subscriptions
            .write()
            .insert(id, Subscription { scope, sink });
        id
    }

    /// Remove a subscription. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscriptions.write().remove(&id).is_some()
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Scopes of all active subscriptions.
    pub fn scopes(&self) -> Vec<SubscriptionScope> {
        self.subscriptions
            .read()
            .values()
            .map(|sub| sub.scope.clone())
            .collect()
    }

    /// Deliver `event` to every subscription whose scope matches it.
    ///
    /// Returns the number of subscribers that received it.
    pub fn broadcast(&self, event: &ChangeEvent<E>) -> usize {
        let mut delivered = 0;
        let mut to_remove = Vec::new();

        {
            let subs = self.subscriptions.read();
            for (id, sub) in subs.iter() {
                if !sub.scope.matches(event.id()) {
                    continue;
                }
                if sub.sink.try_deliver(event.clone()) {
                    delivered += 1;
                } else {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in to_remove {
                if subs.remove(&id).is_some() {
                    warn!(?id, "dropping slow or disconnected subscriber");
                }
            }
        }

        delivered
    }
}

impl<E: Entity> Default for SubscriptionManager<E> {
    fn default() -> Self {
        Self::new()
    }
}
