//! Time-bounded memoisation of loaded tables.
//!
//! The cache is an ordinary value handed to whoever needs it (usually a
//! [`Loader`](crate::loader::Loader)). Entries expire by age only; content
//! changes at the source are not detected. Two concurrent misses for the same
//! key both run their fetch and the last one to finish wins.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

/// Default validity window for remote datasets.
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

struct Entry<V> {
    value: Arc<V>,
    stored_at: Instant,
}

pub struct TtlCache<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for TtlCache<K, V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone + std::fmt::Debug,
{
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the cached value for `key` if it is younger than `ttl`.
    pub fn get(&self, key: &K, ttl: Duration) -> Option<Arc<V>> {
        self.lock()
            .get(key)
            .filter(|e| e.stored_at.elapsed() < ttl)
            .map(|e| Arc::clone(&e.value))
    }

    /// Stores `value` under `key`, replacing any previous entry.
    pub fn insert(&self, key: K, value: V) -> Arc<V> {
        let value = Arc::new(value);
        self.lock().insert(
            key,
            Entry {
                value: Arc::clone(&value),
                stored_at: Instant::now(),
            },
        );
        value
    }

    /// Returns the cached value for `key`, or runs `fetch` and caches its
    /// result. Errors are returned as-is and never cached.
    pub async fn get_or_fetch<F, Fut, E>(&self, key: &K, ttl: Duration, fetch: F) -> Result<Arc<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key, ttl) {
            debug!(?key, "Cache hit");
            return Ok(hit);
        }

        debug!(?key, "Cache miss");
        let value = fetch().await?;
        Ok(self.insert(key.clone(), value))
    }

    /// Drops every entry older than `ttl`.
    pub fn purge_expired(&self, ttl: Duration) {
        self.lock().retain(|_, e| e.stored_at.elapsed() < ttl);
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
