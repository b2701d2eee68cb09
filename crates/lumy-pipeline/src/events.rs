//! Observer lists with disposable subscriptions.
//!
//! Every backend event type gets its own [`EventHub`]. Subscribers register a
//! callback and receive a [`Subscription`]; dropping the subscription removes
//! the callback again.
//!
//! ```
//! use lumy_pipeline::EventHub;
//!
//! let hub = EventHub::<u32>::new();
//! let sub = hub.subscribe(|n| println!("got {n}"));
//! hub.publish(&1);
//! drop(sub);
//! assert_eq!(hub.observer_count(), 0);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Observers<T> {
    next_id: AtomicU64,
    entries: RwLock<Vec<(u64, Callback<T>)>>,
}

/// An observer list for one event type.
///
/// Cloning yields another handle to the same list.
pub struct EventHub<T> {
    observers: Arc<Observers<T>>,
}

impl<T: 'static> EventHub<T> {
    /// Create an empty observer list.
    pub fn new() -> Self {
        Self {
            observers: Arc::new(Observers {
                next_id: AtomicU64::new(0),
                entries: RwLock::new(Vec::new()),
            }),
        }
    }

    /// Register a callback. It stays registered until the returned
    /// [`Subscription`] is dropped.
    #[must_use = "dropping the subscription unsubscribes immediately"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let id = self.observers.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers.entries.write().push((id, Arc::new(callback)));

        let observers: Weak<Observers<T>> = Arc::downgrade(&self.observers);
        Subscription::new(move || {
            if let Some(observers) = observers.upgrade() {
                observers.entries.write().retain(|(entry, _)| *entry != id);
            }
        })
    }

    /// Deliver an event to every current observer, in subscription order.
    ///
    /// Callbacks run on the caller's task, outside the list lock, so they may
    /// subscribe or unsubscribe themselves.
    pub fn publish(&self, event: &T) {
        let callbacks: Vec<Callback<T>> = self
            .observers
            .entries
            .read()
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();
        for callback in callbacks {
            callback(event);
        }
    }

    /// Number of live subscriptions.
    pub fn observer_count(&self) -> usize {
        self.observers.entries.read().len()
    }
}

impl<T: 'static> Default for EventHub<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for EventHub<T> {
    fn clone(&self) -> Self {
        Self {
            observers: Arc::clone(&self.observers),
        }
    }
}

impl<T> std::fmt::Debug for EventHub<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("observers", &self.observers.entries.read().len())
            .finish()
    }
}

/// Handle to a registered callback. Unsubscribes on drop.
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    fn new(unsubscribe: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Unsubscribe now.
    pub fn cancel(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(unsubscribe) = self.unsubscribe.take() {
            unsubscribe();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.release();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.unsubscribe.is_some())
            .finish()
    }
}
