/// Visibility broadcaster: the "became visible this tick" channel.
///
/// An explicitly owned multicast channel shared (via `Arc`) by the scanner
/// and every presentation agent of one visibility session.
///
/// `fire()` snapshots the listener list before invoking anything, and the
/// internal lock is never held while a listener runs. Listeners may therefore
/// subscribe or unsubscribe (themselves or others) from inside `on_visible`:
/// every listener present when `fire()` started is invoked exactly once, and
/// listeners added during the pass wait for the next `fire()`.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::sync::atomic::{AtomicU64, Ordering};

/// Receiver of visibility notifications.
pub trait VisibilityListener: Send + Sync {
    fn on_visible(&self);
}

impl<F> VisibilityListener for F
where
    F: Fn() + Send + Sync,
{
    fn on_visible(&self) {
        self()
    }
}

/// Identity of a subscribed listener.
///
/// Subscription is keyed by id, so subscribing the same id twice is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Allocate a process-unique id.
    pub fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

struct Subscription {
    id: ListenerId,
    listener: Arc<dyn VisibilityListener>,
}

/// Multicast notification channel with snapshot-iterate `fire()`.
pub struct VisibilityBroadcaster {
    /// Subscribers in subscription order
    listeners: Mutex<Vec<Subscription>>,
    /// Number of completed `fire()` calls
    fire_count: AtomicU64,
}

impl VisibilityBroadcaster {
    pub fn new() -> Self {
        Self {
            listeners: Mutex::new(Vec::new()),
            fire_count: AtomicU64::new(0),
        }
    }

    // Every mutation is a single push/remove/clear, so a poisoned list is still consistent.
    fn lock(&self) -> MutexGuard<'_, Vec<Subscription>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a listener at the end of the notification order.
    ///
    /// Returns false (and changes nothing) if `id` is already subscribed.
    pub fn subscribe(&self, id: ListenerId, listener: Arc<dyn VisibilityListener>) -> bool {
        let mut listeners = self.lock();
        if listeners.iter().any(|s| s.id == id) {
            return false;
        }
        listeners.push(Subscription { id, listener });
        true
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = self.lock();
        match listeners.iter().position(|s| s.id == id) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn is_subscribed(&self, id: ListenerId) -> bool {
        self.lock().iter().any(|s| s.id == id)
    }

    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    /// Subscribed ids in notification order.
    pub fn listener_ids(&self) -> Vec<ListenerId> {
        self.lock().iter().map(|s| s.id).collect()
    }

    /// Invoke every currently subscribed listener once, in subscription order.
    ///
    /// Returns the number of listeners invoked. Firing an empty channel is a no-op.
    pub fn fire(&self) -> usize {
        let snapshot: Vec<Arc<dyn VisibilityListener>> =
            self.lock().iter().map(|s| Arc::clone(&s.listener)).collect();

        for listener in &snapshot {
            listener.on_visible();
        }

        self.fire_count.fetch_add(1, Ordering::Relaxed);
        snapshot.len()
    }

    /// Number of `fire()` calls so far.
    pub fn fire_count(&self) -> u64 {
        self.fire_count.load(Ordering::Relaxed)
    }

    /// Drop every subscription.
    pub fn clear(&self) {
        self.lock().clear();
    }
}

impl Default for VisibilityBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "broadcaster_tests.rs"]
mod tests;
