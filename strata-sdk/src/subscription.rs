use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// A zero-argument "something changed" listener.
pub type Listener = Box<dyn Fn() + Send + Sync>;

/// A handle returned by [`Subscriptions::subscribe`]; dropping it, or
/// calling [`unsubscribe`](SubscriptionHandle::unsubscribe) explicitly,
/// removes the listener.
pub struct SubscriptionHandle {
    id: u64,
    subscriptions: Arc<Inner>,
}

impl std::fmt::Debug for SubscriptionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubscriptionHandle").field("id", &self.id).finish()
    }
}

impl SubscriptionHandle {
    /// Removes the listener this handle refers to. Idempotent.
    pub fn unsubscribe(self) {
        self.subscriptions.remove(self.id);
    }
}

struct Entry {
    id: u64,
    listener: Listener,
}

struct Inner {
    listeners: Mutex<Vec<Entry>>,
    next_id: AtomicU64,
    /// `true` while one call to `notify_changed` is in the middle of firing
    /// listeners. Any append that lands while this is set only flips
    /// `backlog` instead of firing listeners again, so a burst of appends
    /// during one delivery round coalesces into a single follow-up round.
    delivering: AtomicBool,
    backlog: AtomicBool,
}

impl Inner {
    fn remove(&self, id: u64) {
        if let Ok(mut listeners) = self.listeners.lock() {
            listeners.retain(|entry| entry.id != id);
        }
    }

    fn fire(&self) {
        if let Ok(listeners) = self.listeners.lock() {
            for entry in listeners.iter() {
                (entry.listener)();
            }
        }
    }
}

/// Rate-limited fan-out of "the registry changed" notifications.
///
/// Bursty producers cannot flood slow consumers: an append always records
/// that something changed, but if a delivery round is already in flight,
/// further appends only set a backlog flag rather than re-firing every
/// listener. The backlog is drained by one more delivery round immediately
/// after the in-flight one finishes.
pub struct Subscriptions {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriptions").finish_non_exhaustive()
    }
}

impl Subscriptions {
    /// An empty subscription set.
    pub fn new() -> Self {
        Subscriptions {
            inner: Arc::new(Inner {
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(0),
                delivering: AtomicBool::new(false),
                backlog: AtomicBool::new(false),
            }),
        }
    }

    /// Registers `listener`, returning a handle that unregisters it when
    /// dropped or explicitly unsubscribed.
    pub fn subscribe(&self, listener: Listener) -> SubscriptionHandle {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut listeners) = self.inner.listeners.lock() {
            listeners.push(Entry { id, listener });
        }
        SubscriptionHandle {
            id,
            subscriptions: Arc::clone(&self.inner),
        }
    }

    /// Records that a change happened and, unless a delivery round is
    /// already under way, fires every listener once.
    pub fn notify_changed(&self) {
        if self
            .inner
            .delivering
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            self.inner.backlog.store(true, Ordering::Release);
            return;
        }

        loop {
            self.inner.fire();
            if self
                .inner
                .backlog
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_err()
            {
                break;
            }
        }
        self.inner.delivering.store(false, Ordering::Release);
    }

    /// Whether a change is queued but has not yet been delivered to
    /// listeners. Exposed for tests and diagnostics.
    pub fn has_backlog(&self) -> bool {
        self.inner.backlog.load(Ordering::Acquire)
    }
}

impl Default for Subscriptions {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn listener_fires_on_notify() {
        let subs = Subscriptions::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let _handle = subs.subscribe(Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        subs.notify_changed();
        subs.notify_changed();
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn unsubscribe_stops_future_notifications() {
        let subs = Subscriptions::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);
        let handle = subs.subscribe(Box::new(move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        }));
        subs.notify_changed();
        handle.unsubscribe();
        subs.notify_changed();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn no_backlog_after_a_quiescent_notify_round() {
        let subs = Subscriptions::new();
        subs.notify_changed();
        assert!(!subs.has_backlog());
    }
}
