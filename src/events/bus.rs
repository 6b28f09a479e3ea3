//! Typed publish/subscribe bus keyed by tracker identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;

use crate::events::types::{EventKind, TrackerEvent};

type Listener = Arc<dyn Fn(&TrackerEvent) + Send + Sync>;

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Topic {
    tracker_key: String,
    kind: EventKind,
}

#[derive(Default)]
struct BusInner {
    topics: DashMap<Topic, Vec<(SubscriptionId, Listener)>>,
    next_id: AtomicU64,
}

/// Shared event bus. Cloning yields another handle to the same bus.
///
/// Listeners run synchronously inside `publish`, on the publishing task, and
/// must not block.
#[derive(Clone, Default)]
pub struct EventBus {
    inner: Arc<BusInner>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `listener` for `kind` events from the tracker named `tracker_key`.
    pub fn subscribe<F>(&self, tracker_key: &str, kind: EventKind, listener: F) -> SubscriptionId
    where
        F: Fn(&TrackerEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let topic = Topic {
            tracker_key: tracker_key.to_string(),
            kind,
        };
        self.inner
            .topics
            .entry(topic)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    /// Remove a listener. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut removed = false;
        for mut entry in self.inner.topics.iter_mut() {
            let before = entry.len();
            entry.retain(|(sub, _)| *sub != id);
            removed |= entry.len() != before;
        }
        removed
    }

    /// Deliver `event` to every listener of its topic. Returns the number of
    /// listeners invoked.
    pub fn publish(&self, tracker_key: &str, event: &TrackerEvent) -> usize {
        let topic = Topic {
            tracker_key: tracker_key.to_string(),
            kind: event.kind(),
        };

        // Snapshot first so listeners may (un)subscribe without deadlocking the map.
        let listeners: Vec<Listener> = match self.inner.topics.get(&topic) {
            Some(entry) => entry.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };

        for listener in &listeners {
            listener(event);
        }
        listeners.len()
    }

    pub fn listener_count(&self, tracker_key: &str, kind: EventKind) -> usize {
        let topic = Topic {
            tracker_key: tracker_key.to_string(),
            kind,
        };
        self.inner.topics.get(&topic).map_or(0, |entry| entry.len())
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("topics", &self.inner.topics.len())
            .finish()
    }
}
