//! In-memory TTL store backed by DashMap.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;

use crate::observability::metrics;
use crate::store::{CorrelationStore, StoreError};

/// One stored value with its expiry deadline.
#[derive(Debug, Clone)]
struct Entry {
    value: Value,
    deadline: Instant,
}

impl Entry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.deadline
    }
}

/// A thread-safe in-memory store with per-entry TTL.
///
/// Expiry is lazy: an expired entry is dropped on the next read. The
/// optional sweeper task bounds memory for keys that are never read again
/// (abandoned requests are reclaimed here rather than by explicit purge).
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<DashMap<String, Entry>>,
}

impl MemoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(DashMap::new()),
        }
    }

    /// Number of live (possibly expired, not yet reaped) entries.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// True when the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Drop every expired entry.
    pub fn purge_expired(&self) {
        let now = Instant::now();
        let before = self.inner.len();
        self.inner.retain(|_, entry| !entry.is_expired(now));
        let reaped = before - self.inner.len();
        if reaped > 0 {
            metrics::record_store_evictions(reaped);
            tracing::debug!(reaped, "correlation store sweep");
        }
        metrics::record_store_size(self.inner.len());
    }

    /// Spawn a background sweeper that reaps expired entries every
    /// `interval` until the shutdown signal fires.
    pub fn spawn_sweeper(&self, interval: Duration, mut shutdown: broadcast::Receiver<()>) {
        let store = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => store.purge_expired(),
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

#[async_trait]
impl CorrelationStore for MemoryStore {
    async fn put(&self, key: &str, value: Value, ttl: Duration) -> Result<(), StoreError> {
        let entry = Entry {
            value,
            deadline: Instant::now() + ttl,
        };
        self.inner.insert(key.to_string(), entry);
        metrics::record_store_size(self.inner.len());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let now = Instant::now();
        // Clone out of the guard before any remove; DashMap deadlocks on
        // same-shard re-entry.
        let hit = match self.inner.get(key) {
            Some(entry) if !entry.is_expired(now) => Some(entry.value.clone()),
            Some(_) => None,
            None => return Ok(None),
        };
        match hit {
            Some(value) => Ok(Some(value)),
            None => {
                self.inner.remove(key);
                metrics::record_store_evictions(1);
                Ok(None)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.remove(key);
        Ok(())
    }
}
