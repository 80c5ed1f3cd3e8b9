//! Point-in-time view of a queue's live keys

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Live keys of a queue and their waiter counts, captured at one instant
///
/// Concurrent activity may change the queue right after the snapshot is
/// taken, so this is for diagnostics only.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallQueueSnapshot {
    /// Name of the queue the snapshot was taken from
    pub name: String,
    /// Waiter count per live key
    pub keys: BTreeMap<String, usize>,
}

impl CallQueueSnapshot {
    /// Number of distinct live keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether no key was live
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Waiters registered for `key`, zero when the key was not live
    pub fn waiters(&self, key: &str) -> usize {
        self.keys.get(key).copied().unwrap_or(0)
    }

    /// Waiters across all keys
    pub fn total_waiters(&self) -> usize {
        self.keys.values().sum()
    }
}
