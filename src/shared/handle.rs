//! Shared Cache Handle
//!
//! Thread-safe facade over [`CacheStore`]. Every operation takes one exclusive
//! lock, so concurrent callers observe a single total order of gets, sets,
//! invalidations and clears.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use crate::cache::{operation_ttl, CacheKey, CacheObserver, CacheStats, CacheStore, Ttl};
use crate::config::Config;
use crate::error::Result;

/// Thread-safe memoization cache.
///
/// Construct one per process (see [`crate::shared::global`]) or per test and
/// hand out references or `Arc`s to collaborators.
pub struct MemoCache<V = Value> {
    store: Mutex<CacheStore<V>>,
    config: Config,
}

impl<V> MemoCache<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    /// Builds a cache, hydrating it from disk when persistence is enabled.
    pub fn new(config: Config) -> Result<Self> {
        let store = CacheStore::new(config.clone())?;
        Ok(Self::from_store(store, config))
    }

    /// Builds a cache that reports disk outcomes to `observer`.
    pub fn with_observer(config: Config, observer: Arc<dyn CacheObserver>) -> Result<Self> {
        let store = CacheStore::with_observer(config.clone(), observer)?;
        Ok(Self::from_store(store, config))
    }

    fn from_store(store: CacheStore<V>, config: Config) -> Self {
        Self {
            store: Mutex::new(store),
            config,
        }
    }

    // == Get ==
    /// Returns the live value for `key`, counting a hit or a miss.
    pub fn get(&self, key: &CacheKey) -> Option<V> {
        self.store.lock().get(key)
    }

    // == Set ==
    /// Stores `value` under `key`, evicting and writing through to disk as
    /// needed. Disk failures go to the observer, never to the caller.
    pub fn set(&self, key: CacheKey, value: V, ttl: Ttl) {
        self.store.lock().set(key, value, ttl);
    }

    // == Invalidate ==
    /// Removes one entry and its file. Returns whether it was cached.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        self.store.lock().invalidate(key)
    }

    // == Clear ==
    /// Drops every entry and entry file and resets the statistics.
    pub fn clear(&self) {
        self.store.lock().clear();
    }

    /// Presence check that leaves counters and access metadata alone.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.store.lock().contains(key)
    }

    // == Stats ==
    /// Snapshot of the current size and counters.
    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    /// Number of entries held in memory, expired ones included until read.
    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Whether entries are currently mirrored to disk.
    pub fn is_persistent(&self) -> bool {
        self.store.lock().is_persistent()
    }

    /// Configuration this cache was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    // == Cached Call ==
    /// Returns the cached value for `key`, or runs `producer` and caches its
    /// result.
    ///
    /// With `force_refresh` the lookup is skipped and the fresh result
    /// overwrites whatever was cached. `producer` runs at most once, outside
    /// the cache lock, and its error is returned unchanged (nothing is cached
    /// in that case).
    pub fn cached_call<F, E>(
        &self,
        key: &CacheKey,
        ttl: Ttl,
        force_refresh: bool,
        producer: F,
    ) -> std::result::Result<V, E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if !force_refresh {
            if let Some(value) = self.get(key) {
                return Ok(value);
            }
        }

        let value = producer()?;
        self.set(key.clone(), value.clone(), ttl);
        debug!("Cached fresh result for {}", key);
        Ok(value)
    }

    /// Like [`cached_call`](Self::cached_call), deriving the key from the
    /// request and using the operation's preset TTL.
    pub fn cached_call_for<I, K, F, E>(
        &self,
        operation_type: &str,
        primary_content: &str,
        params: I,
        force_refresh: bool,
        producer: F,
    ) -> std::result::Result<V, E>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
        F: FnOnce() -> std::result::Result<V, E>,
    {
        let key = CacheKey::derive(operation_type, primary_content, params);
        let ttl = Ttl::After(operation_ttl(operation_type));
        self.cached_call(&key, ttl, force_refresh, producer)
    }
}

impl<V> std::fmt::Debug for MemoCache<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
