//! Subscription registry and event fan-out

use crate::data::EventKind;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Callback invoked with the decoded payload of an event
pub type EventHandler = Arc<dyn Fn(&Value) + Send + Sync>;

/// Handle returned by `subscribe`, usable with `unsubscribe`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// Handler entry with unique ID for management
#[derive(Clone)]
struct HandlerEntry {
    id: SubscriptionId,
    handler: EventHandler,
}

/// Maps each event kind to its ordered handler list.
///
/// Clones share the same table, which is how subscriptions outlive any one
/// socket: the channel publishes into the registry it was given and never
/// clears it.
#[derive(Clone, Default)]
pub struct SubscriptionRegistry {
    handlers: Arc<Mutex<HashMap<EventKind, Vec<HandlerEntry>>>>,
    next_id: Arc<AtomicU64>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self) -> MutexGuard<'_, HashMap<EventKind, Vec<HandlerEntry>>> {
        self.handlers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Append a handler for `kind`. Registering the same closure twice
    /// means it runs twice per event.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.subscribe_arc(kind, Arc::new(handler))
    }

    pub fn subscribe_arc(&self, kind: EventKind, handler: EventHandler) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        self.table()
            .entry(kind)
            .or_default()
            .push(HandlerEntry { id, handler });

        tracing::debug!("Registered handler {} for {}", id.0, kind);
        id
    }

    /// Remove one handler. Returns false if the id is unknown.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut table = self.table();
        let mut removed = false;

        for entries in table.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.id != id);
            removed |= entries.len() < before;
        }
        table.retain(|_, entries| !entries.is_empty());

        if removed {
            tracing::debug!("Unregistered handler {}", id.0);
        }
        removed
    }

    pub fn handler_count(&self, kind: EventKind) -> usize {
        self.table().get(&kind).map(|v| v.len()).unwrap_or(0)
    }

    /// Invoke every handler for `kind` in registration order.
    ///
    /// The handler list is snapshotted first so handlers may register or
    /// remove subscriptions without deadlocking. A panicking handler is
    /// logged and skipped; the rest still run. Returns how many handlers
    /// completed normally.
    pub fn publish(&self, kind: EventKind, payload: &Value) -> usize {
        let snapshot: Vec<HandlerEntry> = match self.table().get(&kind) {
            Some(entries) => entries.clone(),
            None => return 0,
        };

        tracing::debug!("Dispatching {} event to {} handlers", kind, snapshot.len());

        let mut delivered = 0;
        for (index, entry) in snapshot.iter().enumerate() {
            let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                (entry.handler)(payload);
            }));
            match outcome {
                Ok(()) => delivered += 1,
                Err(_) => {
                    tracing::error!(
                        "Handler {} (index {}) panicked while processing {} event",
                        entry.id.0,
                        index,
                        kind
                    );
                }
            }
        }
        delivered
    }
}

impl std::fmt::Debug for SubscriptionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let counts: HashMap<EventKind, usize> = self
            .table()
            .iter()
            .map(|(kind, entries)| (*kind, entries.len()))
            .collect();
        f.debug_struct("SubscriptionRegistry")
            .field("handlers", &counts)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_ids_are_unique_and_nonzero() {
        let registry = SubscriptionRegistry::new();
        let a = registry.subscribe(EventKind::Order, |_| {});
        let b = registry.subscribe(EventKind::Trade, |_| {});
        assert!(a.value() > 0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_publish_without_handlers_is_noop() {
        let registry = SubscriptionRegistry::new();
        assert_eq!(registry.publish(EventKind::Logout, &Value::Null), 0);
    }

    #[test]
    fn test_handler_may_subscribe_reentrantly() {
        let registry = SubscriptionRegistry::new();
        let inner = registry.clone();
        registry.subscribe(EventKind::Joined, move |_| {
            inner.subscribe(EventKind::Joined, |_| {});
        });

        assert_eq!(registry.publish(EventKind::Joined, &json!("ok")), 1);
        assert_eq!(registry.handler_count(EventKind::Joined), 2);
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let registry = SubscriptionRegistry::new();
        let id = registry.subscribe(EventKind::Error, |_| {});
        assert!(registry.unsubscribe(id));
        assert!(!registry.unsubscribe(id));
        assert_eq!(registry.handler_count(EventKind::Error), 0);
    }
}
