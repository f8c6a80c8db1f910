// TTL cache with an injected loader
use super::keyed_lock::KeyedLock;
use super::resolver_error::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheReadType {
    /// Serve a fresh entry, reload an expired or missing one.
    Default,
    /// Serve any entry even if expired; reload only when missing.
    Unsafe,
    /// Always reload.
    ForceRefresh,
}

/// Produces the value for a cache key. Called with the key lock held, so
/// at most one load per key is in flight.
#[async_trait]
pub trait CacheLoader<V>: Send + Sync {
    async fn load(&self, key: &str) -> Result<V>;
}

struct CacheEntry<V> {
    value: V,
    created_at: Instant,
}

impl<V> CacheEntry<V> {
    fn new(value: V) -> Self {
        Self {
            value,
            created_at: Instant::now(),
        }
    }

    fn is_expired(&self, ttl: Duration) -> bool {
        self.created_at.elapsed() >= ttl
    }
}

pub struct TimedCache<V> {
    entries: DashMap<String, CacheEntry<V>>,
    locks: KeyedLock,
    loader: Arc<dyn CacheLoader<V>>,
    ttl: Duration,
    disabled: bool,
}

impl<V: Clone + Send + Sync + 'static> TimedCache<V> {
    /// With `disabled` set every `get` goes straight to the loader and
    /// nothing is stored.
    pub fn new(ttl: Duration, loader: Arc<dyn CacheLoader<V>>, disabled: bool) -> Self {
        Self {
            entries: DashMap::new(),
            locks: KeyedLock::new(),
            loader,
            ttl,
            disabled,
        }
    }

    pub async fn get(&self, key: &str, read_type: CacheReadType) -> Result<V> {
        if self.disabled {
            return self.loader.load(key).await;
        }

        // waiters for an in-flight load see its result on the check below
        let _guard = self.locks.acquire(key).await;
        if read_type != CacheReadType::ForceRefresh {
            if let Some(value) = self.cached(key, read_type) {
                return Ok(value);
            }
        }

        log::debug!("loading cache entry {} ({:?})", key, read_type);
        // a failed load leaves the previous entry in place
        let value = self.loader.load(key).await?;
        self.entries
            .insert(key.to_string(), CacheEntry::new(value.clone()));
        Ok(value)
    }

    fn cached(&self, key: &str, read_type: CacheReadType) -> Option<V> {
        let entry = self.entries.get(key)?;
        if read_type == CacheReadType::Unsafe || !entry.is_expired(self.ttl) {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn set(&self, key: &str, value: V) {
        if self.disabled {
            return;
        }
        self.entries.insert(key.to_string(), CacheEntry::new(value));
    }

    pub fn delete(&self, key: &str) {
        self.entries.remove(key);
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
