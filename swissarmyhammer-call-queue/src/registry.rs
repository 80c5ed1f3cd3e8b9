//! Reference-counted key registry shared by the blocking and async queues
//!
//! The registry maps each live key to a [`CallState`]: the number of callers
//! registered against the key and the exclusion lock those callers take
//! turns on. All structural changes happen under one short-lived guard that
//! is never held while caller work runs.
//!
//! A caller obtains a [`Registration`] before waiting on the exclusion lock.
//! Dropping the registration deregisters the caller, removing the entry in
//! the same guarded step that takes the count to zero. Because deregistration
//! lives in `Drop`, it happens on normal return, while unwinding from a panic,
//! and when an async caller is cancelled.

use crate::config::CallQueueConfig;
use crate::snapshot::CallQueueSnapshot;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, trace};

/// Per-key bookkeeping
#[derive(Debug)]
struct CallState<L> {
    /// Callers registered and not yet deregistered, always >= 1 while mapped
    waiters: usize,
    lock: Arc<L>,
}

/// Map of live keys to their exclusion locks
#[derive(Debug)]
pub(crate) struct Registry<L> {
    name: String,
    calls: Mutex<HashMap<String, CallState<L>>>,
}

impl<L: Default> Registry<L> {
    /// Create an empty registry
    ///
    /// `initial_capacity` is only a hint: if the map cannot reserve that
    /// much, the registry starts empty and grows on demand.
    pub(crate) fn new(config: CallQueueConfig) -> Self {
        let mut calls = HashMap::new();
        if let Err(err) = calls.try_reserve(config.initial_capacity) {
            debug!(
                queue = %config.name,
                initial_capacity = config.initial_capacity,
                "ignoring capacity hint: {}",
                err
            );
        }
        Self {
            calls: Mutex::new(calls),
            name: config.name,
        }
    }

    /// Register a caller for `key`, creating the entry if the key is not live
    pub(crate) fn register(&self, key: &str) -> Registration<'_, L> {
        let mut calls = self.calls();
        let state = calls.entry(key.to_owned()).or_insert_with(|| {
            trace!(queue = %self.name, key, "creating call state");
            CallState {
                waiters: 0,
                lock: Arc::new(L::default()),
            }
        });
        state.waiters += 1;

        Registration {
            registry: self,
            key: key.to_owned(),
            lock: Arc::clone(&state.lock),
        }
    }
}

impl<L> Registry<L> {
    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Number of live keys
    pub(crate) fn len(&self) -> usize {
        self.calls().len()
    }

    /// Callers currently registered for `key`
    pub(crate) fn waiters(&self, key: &str) -> usize {
        self.calls().get(key).map_or(0, |state| state.waiters)
    }

    pub(crate) fn snapshot(&self) -> CallQueueSnapshot {
        let keys = self
            .calls()
            .iter()
            .map(|(key, state)| (key.clone(), state.waiters))
            .collect();
        CallQueueSnapshot {
            name: self.name.clone(),
            keys,
        }
    }

    fn deregister(&self, key: &str) {
        let mut calls = self.calls();
        // Every registration holds one count on its key, so the entry exists
        // until the last registration for it drops.
        let Some(state) = calls.get_mut(key) else {
            debug_assert!(false, "key '{key}' deregistered with no call state");
            return;
        };
        state.waiters -= 1;
        if state.waiters == 0 {
            calls.remove(key);
            trace!(queue = %self.name, key, "removed call state");
        }
    }

    /// Lock the structural guard
    ///
    /// No caller code runs while the guard is held, so a poisoned guard still
    /// protects a consistent map and is safe to recover.
    fn calls(&self) -> MutexGuard<'_, HashMap<String, CallState<L>>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A caller's registration against one key
///
/// Any guard taken on [`Registration::lock`] must be dropped before the
/// registration itself, so that the exclusion lock is released before the
/// caller is deregistered. Declaring the guard after the registration in the
/// same scope gives that order.
#[must_use = "dropping a registration deregisters the caller immediately"]
pub(crate) struct Registration<'a, L> {
    registry: &'a Registry<L>,
    key: String,
    lock: Arc<L>,
}

impl<L> Registration<'_, L> {
    /// The key's exclusion lock
    pub(crate) fn lock(&self) -> &L {
        &self.lock
    }

    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    pub(crate) fn queue_name(&self) -> &str {
        self.registry.name()
    }
}

impl<L> Drop for Registration<'_, L> {
    fn drop(&mut self) {
        self.registry.deregister(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry<Mutex<()>> {
        Registry::new(CallQueueConfig::new().with_name("test"))
    }

    #[test]
    fn test_register_creates_and_removes_entry() {
        let registry = registry();
        assert_eq!(registry.len(), 0);

        let registration = registry.register("A");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.waiters("A"), 1);
        assert_eq!(registration.key(), "A");
        assert_eq!(registration.queue_name(), "test");

        drop(registration);
        assert_eq!(registry.len(), 0);
        assert_eq!(registry.waiters("A"), 0);
    }

    #[test]
    fn test_registrations_share_one_lock_per_key() {
        let registry = registry();
        let first = registry.register("A");
        let second = registry.register("A");
        let other = registry.register("B");

        assert!(std::ptr::eq(first.lock(), second.lock()));
        assert!(!std::ptr::eq(first.lock(), other.lock()));
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.waiters("A"), 2);

        drop(first);
        assert_eq!(registry.waiters("A"), 1);
        assert_eq!(registry.len(), 2);

        drop(second);
        drop(other);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_new_registration_after_removal_gets_fresh_state() {
        let registry = registry();
        let first = registry.register("A");
        let stale = Arc::clone(&first.lock);
        drop(first);

        let second = registry.register("A");
        assert_eq!(registry.waiters("A"), 1);
        assert!(!Arc::ptr_eq(&stale, &second.lock));
    }

    #[test]
    fn test_unsatisfiable_capacity_hint_is_ignored() {
        let registry: Registry<Mutex<()>> =
            Registry::new(CallQueueConfig::new().with_initial_capacity(usize::MAX));
        assert_eq!(registry.len(), 0);

        let registration = registry.register("A");
        assert_eq!(registry.waiters("A"), 1);
        drop(registration);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_empty_key_is_an_ordinary_key() {
        let registry = registry();
        let registration = registry.register("");
        assert_eq!(registry.waiters(""), 1);
        assert_eq!(registry.len(), 1);
        drop(registration);
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_snapshot_reports_waiters_per_key() {
        let registry = registry();
        let _a1 = registry.register("A");
        let _a2 = registry.register("A");
        let _b = registry.register("B");

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.name, "test");
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot.waiters("A"), 2);
        assert_eq!(snapshot.waiters("B"), 1);
    }

    #[test]
    fn test_registration_drops_during_unwind() {
        let registry = registry();
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _registration = registry.register("A");
            panic!("unwinding");
        }));
        assert!(result.is_err());
        assert_eq!(registry.len(), 0);
    }
}
