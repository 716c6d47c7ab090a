//! Keyed mutual exclusion for in-process critical sections.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("lock poisoned by a panicking holder")]
pub struct LockPoisoned;

/// One mutex per key, created on demand and dropped when nobody holds or waits for it.
///
/// Holders of different keys never block each other.
#[derive(Debug)]
pub struct KeyedLocks<K> {
    slots: Mutex<HashMap<K, Arc<Mutex<()>>>>,
}

impl<K> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
        }
    }
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the lock for `key`.
    pub fn with_lock<R>(&self, key: &K, f: impl FnOnce() -> R) -> Result<R, LockPoisoned> {
        let slot = {
            let mut slots = self.slots.lock().map_err(|_| LockPoisoned)?;
            slots.entry(key.clone()).or_default().clone()
        };

        let result = {
            let _guard = slot.lock().map_err(|_| LockPoisoned)?;
            f()
        };

        // Map + our handle == 2: no other holder or waiter, safe to drop the slot.
        if let Ok(mut slots) = self.slots.lock() {
            if Arc::strong_count(&slot) == 2 {
                slots.remove(key);
            }
        }

        Ok(result)
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }
}
