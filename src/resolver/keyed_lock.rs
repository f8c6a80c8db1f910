// per-key mutual exclusion
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// Registry of one async mutex per key. Entries are created on first use
/// and never removed; the key space is bounded by node and VM count.
#[derive(Default)]
pub struct KeyedLock {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Held lock for one key. Released when dropped.
pub struct KeyedLockGuard {
    _guard: OwnedMutexGuard<()>,
}

impl KeyedLockGuard {
    pub fn release(self) {}
}

impl KeyedLock {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    pub async fn acquire(&self, key: &str) -> KeyedLockGuard {
        // the map shard guard must be gone before awaiting the mutex
        let lock = self
            .locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyedLockGuard {
            _guard: lock.lock_owned().await,
        }
    }

    /// Number of keys ever locked.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
