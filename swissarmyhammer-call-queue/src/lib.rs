//! Key-scoped mutual exclusion for serializing work per logical key.
//!
//! A call queue is a namespace of keys. Work submitted under one key runs one
//! invocation at a time, while work under different keys proceeds in
//! parallel. Use it to keep two rebuilds of the same resource from
//! overlapping without serializing unrelated resources.
//!
//! # Overview
//!
//! - **Lazy per-key state**: a key's state exists only while some caller is
//!   registered for it, so memory tracks active keys rather than every key
//!   ever seen
//! - **Panic safe**: the exclusion lock is released and the caller is
//!   deregistered even when the work panics; the panic then reaches the
//!   caller unchanged
//! - **No fairness**: waiters for a key are admitted in no particular order
//! - **Blocking and async**: [`CallQueue`] for OS threads, [`AsyncCallQueue`]
//!   for tokio tasks
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::thread;
//! use swissarmyhammer_call_queue::CallQueue;
//!
//! let queue = Arc::new(CallQueue::new());
//!
//! let handles: Vec<_> = (0..4)
//!     .map(|i| {
//!         let queue = Arc::clone(&queue);
//!         thread::spawn(move || {
//!             // Rebuilds of "index" never overlap.
//!             queue.run("index", || i * 2)
//!         })
//!     })
//!     .collect();
//!
//! for handle in handles {
//!     handle.join().unwrap();
//! }
//! assert_eq!(queue.len(), 0);
//! ```
//!
//! # Custom Configuration
//!
//! ```
//! use swissarmyhammer_call_queue::{CallQueue, CallQueueConfig};
//!
//! let config = CallQueueConfig::new()
//!     .with_name("index-rebuilds")
//!     .with_initial_capacity(128);
//!
//! let queue = CallQueue::with_config(config);
//! assert_eq!(queue.name(), "index-rebuilds");
//! ```

mod async_queue;
mod config;
mod error;
mod queue;
mod registry;
mod snapshot;

pub use async_queue::AsyncCallQueue;
pub use config::{CallQueueConfig, DEFAULT_QUEUE_NAME};
pub use error::{CallQueueError, Result};
pub use queue::CallQueue;
pub use snapshot::CallQueueSnapshot;
