//! Blocking call queue for OS threads

use crate::config::CallQueueConfig;
use crate::error::{CallQueueError, Result};
use crate::registry::Registry;
use crate::snapshot::CallQueueSnapshot;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard};
use tracing::debug;

/// Serializes work per key across threads
///
/// Work submitted under the same key runs one invocation at a time; work
/// under different keys runs in parallel. Waiters for a key are admitted in
/// no particular order.
///
/// ```
/// use swissarmyhammer_call_queue::CallQueue;
///
/// let queue = CallQueue::new();
/// let built = queue.run("resource-x", || "rebuilt");
///
/// assert_eq!(built, "rebuilt");
/// assert!(queue.is_empty());
/// ```
#[derive(Debug)]
pub struct CallQueue {
    registry: Registry<Mutex<()>>,
}

impl CallQueue {
    /// Create an empty queue with default configuration
    pub fn new() -> Self {
        Self::with_config(CallQueueConfig::default())
    }

    /// Create an empty queue with custom configuration
    pub fn with_config(config: CallQueueConfig) -> Self {
        Self {
            registry: Registry::new(config),
        }
    }

    /// Run `work` while holding the exclusion lock for `key`
    ///
    /// Blocks until no other caller is running work for `key`. The return
    /// value of `work` is passed through, and a panic in `work` unwinds out
    /// of this call unchanged once the lock is released and the caller is
    /// deregistered.
    pub fn run<F, R>(&self, key: &str, work: F) -> R
    where
        F: FnOnce() -> R,
    {
        let registration = self.registry.register(key);
        let _exclusive = acquire(
            registration.lock(),
            registration.queue_name(),
            registration.key(),
        );
        work()
    }

    /// Like [`run`](Self::run), but a panic in `work` is returned as
    /// [`CallQueueError::WorkPanicked`] instead of unwinding
    pub fn run_catching<F, R>(&self, key: &str, work: F) -> Result<R>
    where
        F: FnOnce() -> R,
    {
        panic::catch_unwind(AssertUnwindSafe(|| self.run(key, work))).map_err(|payload| {
            let err = CallQueueError::from_panic(key, payload.as_ref());
            debug!(queue = %self.name(), key, "{}", err);
            err
        })
    }

    /// Number of keys with at least one registered caller
    pub fn len(&self) -> usize {
        self.registry.len()
    }

    /// Whether no key has a registered caller
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Callers registered for `key`, counting the one running and those waiting
    pub fn waiters(&self, key: &str) -> usize {
        self.registry.waiters(key)
    }

    /// Whether `key` has at least one registered caller
    pub fn is_active(&self, key: &str) -> bool {
        self.waiters(key) > 0
    }

    /// Capture the live keys and their waiter counts
    pub fn snapshot(&self) -> CallQueueSnapshot {
        self.registry.snapshot()
    }

    /// Name from the queue's configuration
    pub fn name(&self) -> &str {
        self.registry.name()
    }
}

impl Default for CallQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Take a key's exclusion lock
///
/// The lock guards no data, so poisoning left by a panicking holder carries
/// no meaning and the lock is taken anyway.
fn acquire<'a>(lock: &'a Mutex<()>, queue: &str, key: &str) -> MutexGuard<'a, ()> {
    lock.lock().unwrap_or_else(|poisoned| {
        debug!(queue, key, "previous work for key panicked, continuing");
        poisoned.into_inner()
    })
}
