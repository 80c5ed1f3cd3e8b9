//! Configuration for call queues

use serde::{Deserialize, Serialize};

/// Default queue name used in tracing events
pub const DEFAULT_QUEUE_NAME: &str = "call-queue";

/// Configuration for a [`CallQueue`](crate::CallQueue) or
/// [`AsyncCallQueue`](crate::AsyncCallQueue)
///
/// ```
/// use swissarmyhammer_call_queue::CallQueueConfig;
///
/// let config = CallQueueConfig::new()
///     .with_name("index-rebuilds")
///     .with_initial_capacity(64);
///
/// assert_eq!(config.name, "index-rebuilds");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallQueueConfig {
    /// Name attached to every tracing event emitted by the queue
    pub name: String,
    /// Capacity hint for the key map, ignored when it cannot be reserved
    pub initial_capacity: usize,
}

impl Default for CallQueueConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_QUEUE_NAME.to_string(),
            initial_capacity: 0,
        }
    }
}

impl CallQueueConfig {
    /// Create a configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the queue name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the capacity hint for the key map
    pub fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }
}
