//! SessionStore - single source of truth for the current session.

use super::state::Session;
use crate::subscription::Subscription;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked with every new session value.
pub type Observer = Arc<dyn Fn(&Session) + Send + Sync>;

type Registry = Arc<Mutex<Vec<(u64, Observer)>>>;

/// Current value plus writes not yet delivered, kept under one lock so
/// delivery order always matches write order.
struct Slot {
    current: Session,
    undelivered: VecDeque<Session>,
    delivering: bool,
}

/// Holds the current [`Session`] and notifies observers on change.
///
/// Delivery is synchronous and follows registration order. No lock is held
/// while an observer runs, so observers may call `get`, `subscribe` or drop
/// their own subscription.
///
/// Writes made while a delivery is running (from an observer, or from
/// another thread) are queued and delivered by the running one, in write
/// order, after it finishes the current value. Observers therefore see
/// every value in the order it was written and end on what `get` returns.
pub struct SessionStore {
    slot: Mutex<Slot>,
    observers: Registry,
    next_id: AtomicU64,
}

impl SessionStore {
    /// Create a store holding the startup session.
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(Slot {
                current: Session::unknown(),
                undelivered: VecDeque::new(),
                delivering: false,
            }),
            observers: Arc::new(Mutex::new(Vec::new())),
            next_id: AtomicU64::new(0),
        }
    }

    /// Current session value.
    pub fn get(&self) -> Session {
        self.lock_slot().current.clone()
    }

    /// Register an observer. It is not called for the current value, only
    /// for subsequent writes.
    pub fn subscribe(&self, observer: impl Fn(&Session) + Send + Sync + 'static) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, Arc::new(observer)));

        let registry = Arc::downgrade(&self.observers);
        Subscription::new(move || {
            if let Some(registry) = registry.upgrade() {
                registry
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .retain(|(existing, _)| *existing != id);
            }
        })
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Replace the current value and notify observers.
    ///
    /// Only the session manager writes; consumers get read access.
    pub(crate) fn set(&self, next: Session) {
        {
            let mut slot = self.lock_slot();
            slot.current = next.clone();
            slot.undelivered.push_back(next);
            if slot.delivering {
                return;
            }
            slot.delivering = true;
        }

        let mut run = DeliveryRun {
            store: self,
            finished: false,
        };
        while let Some(session) = self.next_undelivered() {
            self.deliver(&session);
        }
        run.finished = true;
    }

    fn lock_slot(&self) -> std::sync::MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the oldest queued write, or end the delivery run when empty.
    fn next_undelivered(&self) -> Option<Session> {
        let mut slot = self.lock_slot();
        let next = slot.undelivered.pop_front();
        if next.is_none() {
            slot.delivering = false;
        }
        next
    }

    fn deliver(&self, session: &Session) {
        // Observers added during delivery are not part of this snapshot.
        let snapshot: Vec<(u64, Observer)> = self
            .observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        for (id, observer) in snapshot {
            if self.is_registered(id) {
                observer(session);
            }
        }
    }

    fn is_registered(&self, id: u64) -> bool {
        self.observers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|(existing, _)| *existing == id)
    }
}

/// Ends the delivery run when an observer panics. Queued writes are
/// dropped; the current value is already in place. A finished run has
/// already ended in `next_undelivered`, under the lock that saw the queue
/// empty.
struct DeliveryRun<'a> {
    store: &'a SessionStore,
    finished: bool,
}

impl Drop for DeliveryRun<'_> {
    fn drop(&mut self) {
        if !self.finished {
            let mut slot = self.store.lock_slot();
            slot.undelivered.clear();
            slot.delivering = false;
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
