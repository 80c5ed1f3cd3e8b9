//! Call queue for tokio tasks
//!
//! [`AsyncCallQueue`] keeps the same per-key contract as
//! [`CallQueue`](crate::CallQueue), but waiting for a key's exclusion lock
//! yields to the runtime instead of blocking a worker thread.
//!
//! Dropping a [`run`](AsyncCallQueue::run) future abandons the call at
//! whatever point it reached. A caller still waiting for the lock is simply
//! deregistered, which makes it safe to race a call against a timer:
//!
//! ```
//! use std::time::Duration;
//! use swissarmyhammer_call_queue::AsyncCallQueue;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let queue = AsyncCallQueue::new();
//! let result = tokio::time::timeout(
//!     Duration::from_secs(5),
//!     queue.run("resource-x", || async { "rebuilt" }),
//! )
//! .await;
//!
//! assert_eq!(result.ok(), Some("rebuilt"));
//! assert!(queue.is_empty());
//! # }
//! ```

use crate::config::CallQueueConfig;
use crate::error::{CallQueueError, Result};
use crate::registry::Registry;
use crate::snapshot::CallQueueSnapshot;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use tokio::sync::Mutex;
use tracing::debug;

/// Serializes async work per key across tasks
#[derive(Debug)]
pub struct AsyncCallQueue {
    registry: Registry<Mutex<()>>,
}

impl AsyncCallQueue {
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

    /// Run the future produced by `work` while holding the exclusion lock
    /// for `key`
    ///
    /// `work` is only called once the lock is held. Its output is passed
    /// through, and a panic while polling it unwinds out of this future after
    /// the lock is released and the caller is deregistered.
    pub async fn run<F, Fut>(&self, key: &str, work: F) -> Fut::Output
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        let registration = self.registry.register(key);
        let _exclusive = registration.lock().lock().await;
        work().await
    }

    /// Like [`run`](Self::run), but a panic in `work` is returned as
    /// [`CallQueueError::WorkPanicked`] instead of unwinding
    pub async fn run_catching<F, Fut>(&self, key: &str, work: F) -> Result<Fut::Output>
    where
        F: FnOnce() -> Fut,
        Fut: Future,
    {
        AssertUnwindSafe(self.run(key, work))
            .catch_unwind()
            .await
            .map_err(|payload| {
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

impl Default for AsyncCallQueue {
    fn default() -> Self {
        Self::new()
    }
}
