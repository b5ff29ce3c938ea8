//! Refresh callbacks for lists that depend on action side effects.
//!
//! A component registers a callback when it starts showing a list and keeps
//! the returned [`Subscription`]. Removal is explicit: dropping the
//! subscription does not unsubscribe.

use serde::Serialize;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

type Callback = Arc<dyn Fn() + Send + Sync>;

#[derive(Default)]
struct Entries {
    next_id: u64,
    callbacks: Vec<(u64, Callback)>,
}

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    // A panicking callback never runs under this lock, so poisoning can only
    // come from a bug in this module; the data is still consistent.
    entries.lock().unwrap_or_else(|e| e.into_inner())
}

/// Ordered set of zero-argument refresh callbacks.
#[derive(Clone, Default)]
pub struct RefreshSet {
    entries: Arc<Mutex<Entries>>,
}

/// Result of one refresh fan-out.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshOutcome {
    pub invoked: usize,
    pub panicked: usize,
}

impl RefreshSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let mut entries = lock(&self.entries);
        let id = entries.next_id;
        entries.next_id += 1;
        entries.callbacks.push((id, Arc::new(callback)));
        Subscription {
            id,
            entries: Arc::downgrade(&self.entries),
            active: AtomicBool::new(true),
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.entries).callbacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Invoke every registered callback in registration order.
    ///
    /// Callbacks run outside the lock, so a callback may unsubscribe itself
    /// or others. A panicking callback is counted and the rest still run.
    pub fn refresh(&self) -> RefreshOutcome {
        let snapshot: Vec<Callback> = lock(&self.entries)
            .callbacks
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();

        let mut outcome = RefreshOutcome::default();
        for callback in snapshot {
            match catch_unwind(AssertUnwindSafe(|| callback())) {
                Ok(()) => outcome.invoked += 1,
                Err(_) => outcome.panicked += 1,
            }
        }
        outcome
    }
}

/// Handle returned by [`RefreshSet::subscribe`].
pub struct Subscription {
    id: u64,
    entries: Weak<Mutex<Entries>>,
    active: AtomicBool,
}

impl Subscription {
    /// Remove exactly this callback. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        if !self.active.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(entries) = self.entries.upgrade() {
            lock(&entries).callbacks.retain(|(id, _)| *id != self.id);
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
