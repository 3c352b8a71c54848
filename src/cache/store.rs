//! Cache Store Module
//!
//! Main cache engine combining HashMap storage with LRU eviction, lazy TTL
//! expiration and best-effort write-through to disk.
//!
//! The store itself is not synchronized; [`crate::shared::MemoCache`] wraps it
//! in a lock.

use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::cache::lru::select_victims;
use crate::cache::observer::{CacheObserver, TracingObserver};
use crate::cache::persistence::DiskStore;
use crate::cache::stats::StatsTracker;
use crate::cache::{CacheEntry, CacheKey, CacheStats, Ttl};
use crate::config::Config;
use crate::error::Result;

// == Cache Store ==
/// Main cache storage with LRU eviction and TTL support.
pub struct CacheStore<V> {
    /// Key-value storage
    entries: HashMap<CacheKey, CacheEntry<V>>,
    /// Hit/miss/eviction counters
    stats: StatsTracker,
    /// Immutable configuration
    config: Config,
    /// Disk mirror, None when persistence is disabled or unavailable
    disk: Option<DiskStore>,
    /// Sink for absorbed disk errors and evictions
    observer: Arc<dyn CacheObserver>,
}

impl<V> CacheStore<V>
where
    V: Clone + Serialize + DeserializeOwned,
{
    // == Constructor ==
    /// Creates a store and, when disk persistence is enabled, hydrates it from
    /// the cache directory before returning.
    pub fn new(config: Config) -> Result<Self> {
        Self::with_observer(config, Arc::new(TracingObserver))
    }

    /// Same as [`new`](Self::new) with a custom observer.
    pub fn with_observer(config: Config, observer: Arc<dyn CacheObserver>) -> Result<Self> {
        config.validate()?;

        let disk = if config.enable_disk_cache {
            let disk = DiskStore::new(&config.cache_dir);
            match disk.ensure_dir() {
                Ok(()) => Some(disk),
                Err(e) => {
                    // Memory-only for the rest of this instance's life
                    observer.on_disk_error(&e);
                    None
                }
            }
        } else {
            None
        };

        let mut store = Self {
            entries: HashMap::new(),
            stats: StatsTracker::new(),
            config,
            disk,
            observer,
        };
        store.hydrate();
        Ok(store)
    }

    fn hydrate(&mut self) {
        let Some(disk) = &self.disk else {
            return;
        };

        let report = disk.load_all::<V>();
        for error in &report.errors {
            self.observer.on_disk_error(error);
        }
        self.entries.extend(report.entries);
        self.observer.on_load_complete(&report.summary);

        // A directory written by a larger instance may hold more than fits.
        // Trim memory only: the files still belong to that instance.
        while self.entries.len() > self.config.max_size {
            self.drop_lru(None);
        }
    }

    // == Get ==
    /// Retrieves a value by key.
    ///
    /// Returns the value if found and not expired. Expired entries are removed
    /// from memory and disk and counted as misses.
    pub fn get(&mut self, key: &CacheKey) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => {
                self.stats.record_miss();
                return None;
            }
            Some(entry) => entry.is_expired(),
        };

        if expired {
            self.entries.remove(key);
            self.delete_from_disk(key);
            self.stats.record_miss();
            debug!("Expired entry removed on access: {}", key);
            return None;
        }

        let entry = self.entries.get_mut(key)?;
        let value = entry.access().clone();
        self.stats.record_hit();
        Some(value)
    }

    // == Set ==
    /// Stores a value, replacing any existing entry for the key.
    ///
    /// If the store grows past `max_size`, the least recently used entries are
    /// evicted before the new entry is written through to disk.
    pub fn set(&mut self, key: CacheKey, value: V, ttl: Ttl) {
        let entry = CacheEntry::new(value, ttl.resolve(self.config.default_ttl));
        self.entries.insert(key.clone(), entry);

        if self.entries.len() > self.config.max_size {
            self.evict_lru(Some(&key));
        }

        if let (Some(disk), Some(entry)) = (&self.disk, self.entries.get(&key)) {
            if let Err(e) = disk.save(&key, entry) {
                self.observer.on_disk_error(&e);
            }
        }
    }

    // == Evict ==
    /// Drops the oldest 10% of entries (at least one) by last access.
    fn evict_lru(&mut self, keep: Option<&CacheKey>) {
        for key in self.drop_lru(keep) {
            self.delete_from_disk(&key);
        }
    }

    /// Removes one LRU batch from memory and returns the victims.
    fn drop_lru(&mut self, keep: Option<&CacheKey>) -> Vec<CacheKey> {
        let victims = select_victims(&self.entries, keep);
        for key in &victims {
            self.entries.remove(key);
        }
        self.stats.record_evictions(victims.len());
        self.observer.on_eviction(victims.len());
        victims
    }

    // == Invalidate ==
    /// Removes an entry and its file. Returns whether anything was in memory.
    pub fn invalidate(&mut self, key: &CacheKey) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.delete_from_disk(key);
        }
        removed
    }

    // == Clear ==
    /// Removes all entries, resets the counters and deletes every entry file.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.stats.reset();
        if let Some(disk) = &self.disk {
            for error in disk.clear() {
                self.observer.on_disk_error(&error);
            }
        }
    }

    // == Contains ==
    /// Checks for a live entry without touching counters or access metadata.
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.get(key).map_or(false, |entry| !entry.is_expired())
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.entries.len(), self.config.max_size)
    }

    /// Configuration this store was built with.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Whether entries are currently mirrored to disk.
    pub fn is_persistent(&self) -> bool {
        self.disk.is_some()
    }

    // == Length ==
    /// Returns the current number of entries in the cache.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn entry(&self, key: &CacheKey) -> Option<&CacheEntry<V>> {
        self.entries.get(key)
    }

    fn delete_from_disk(&self, key: &CacheKey) {
        if let Some(disk) = &self.disk {
            if let Err(e) = disk.delete(key) {
                self.observer.on_disk_error(&e);
            }
        }
    }
}

impl<V> std::fmt::Debug for CacheStore<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("len", &self.entries.len())
            .field("config", &self.config)
            .field("persistent", &self.disk.is_some())
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::observer::testing::RecordingObserver;
    use crate::cache::observer::NoopObserver;
    use serde_json::{json, Value};
    use std::thread::sleep;
    use std::time::Duration;
    use tempfile::TempDir;

    fn key(name: &str) -> CacheKey {
        CacheKey::derive("test", name, Vec::<(String, Value)>::new())
    }

    fn memory_store(max_size: usize) -> CacheStore<Value> {
        let config = Config::default()
            .with_max_size(max_size)
            .with_disk_cache(false);
        CacheStore::with_observer(config, Arc::new(NoopObserver)).unwrap()
    }

    fn disk_store(dir: &TempDir, max_size: usize) -> CacheStore<Value> {
        let config = Config::default()
            .with_cache_dir(dir.path())
            .with_max_size(max_size);
        CacheStore::with_observer(config, Arc::new(NoopObserver)).unwrap()
    }

    #[test]
    fn test_store_new() {
        let store = memory_store(100);
        assert_eq!(store.len(), 0);
        assert!(store.is_empty());
        assert!(!store.is_persistent());
    }

    #[test]
    fn test_store_rejects_invalid_config() {
        let config = Config::default().with_max_size(0).with_disk_cache(false);
        assert!(CacheStore::<Value>::new(config).is_err());
    }

    #[test]
    fn test_store_set_and_get() {
        let mut store = memory_store(100);

        store.set(key("key1"), json!("value1"), Ttl::Default);
        assert_eq!(store.get(&key("key1")), Some(json!("value1")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_get_nonexistent() {
        let mut store = memory_store(100);

        assert_eq!(store.get(&key("nonexistent")), None);
        assert_eq!(store.stats().misses, 1);
        assert_eq!(store.stats().hits, 0);
    }

    #[test]
    fn test_get_tracks_access() {
        let mut store = memory_store(100);
        store.set(key("k"), json!(1), Ttl::Default);

        store.get(&key("k"));
        store.get(&key("k"));

        assert_eq!(store.entry(&key("k")).unwrap().access_count, 2);
    }

    #[test]
    fn test_set_uses_default_ttl() {
        let config = Config::default()
            .with_disk_cache(false)
            .with_default_ttl(Some(Duration::from_secs(42)));
        let mut store: CacheStore<Value> = CacheStore::with_observer(config, Arc::new(NoopObserver)).unwrap();

        store.set(key("a"), json!(1), Ttl::Default);
        store.set(key("b"), json!(1), Ttl::Never);
        store.set(key("c"), json!(1), Ttl::After(Duration::from_secs(7)));

        assert_eq!(store.entry(&key("a")).unwrap().ttl, Some(Duration::from_secs(42)));
        assert_eq!(store.entry(&key("b")).unwrap().ttl, None);
        assert_eq!(store.entry(&key("c")).unwrap().ttl, Some(Duration::from_secs(7)));
    }

    #[test]
    fn test_store_invalidate() {
        let mut store = memory_store(100);

        store.set(key("key1"), json!("value1"), Ttl::Default);
        assert!(store.invalidate(&key("key1")));
        assert!(!store.invalidate(&key("key1")));

        assert!(store.is_empty());
        assert_eq!(store.get(&key("key1")), None);
    }

    #[test]
    fn test_store_overwrite_resets_metadata() {
        let mut store = memory_store(100);

        store.set(key("key1"), json!("value1"), Ttl::Default);
        store.get(&key("key1"));
        store.set(key("key1"), json!("value2"), Ttl::Default);

        assert_eq!(store.entry(&key("key1")).unwrap().access_count, 0);
        assert_eq!(store.get(&key("key1")), Some(json!("value2")));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_store_ttl_expiration() {
        let mut store = memory_store(100);

        store.set(key("key1"), json!("value1"), Ttl::After(Duration::from_millis(100)));
        assert!(store.get(&key("key1")).is_some());

        sleep(Duration::from_millis(150));

        assert_eq!(store.get(&key("key1")), None);
        assert!(store.is_empty());
        assert_eq!(store.stats().misses, 1);
    }

    #[test]
    fn test_store_lru_eviction() {
        let mut store = memory_store(3);

        store.set(key("key1"), json!(1), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("key2"), json!(2), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("key3"), json!(3), Ttl::Default);
        sleep(Duration::from_millis(2));

        // Size 4 > 3 triggers eviction of max(1, 4/10) = 1 entry, key1
        store.set(key("key4"), json!(4), Ttl::Default);

        assert_eq!(store.len(), 3);
        assert!(!store.contains(&key("key1")));
        assert!(store.contains(&key("key2")));
        assert!(store.contains(&key("key3")));
        assert!(store.contains(&key("key4")));
        assert_eq!(store.stats().evictions, 1);
    }

    #[test]
    fn test_store_lru_touch_on_get() {
        let mut store = memory_store(3);

        store.set(key("key1"), json!(1), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("key2"), json!(2), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("key3"), json!(3), Ttl::Default);
        sleep(Duration::from_millis(2));

        // Access key1 to make it most recently used
        store.get(&key("key1"));
        sleep(Duration::from_millis(2));

        // Adding key4 should evict key2 (now oldest)
        store.set(key("key4"), json!(4), Ttl::Default);

        assert!(store.contains(&key("key1")));
        assert!(!store.contains(&key("key2")));
    }

    #[test]
    fn test_eviction_batch_is_ten_percent() {
        let mut store = memory_store(20);
        for i in 0..20 {
            store.set(key(&i.to_string()), json!(i), Ttl::Default);
        }
        assert_eq!(store.len(), 20);

        // 21 entries -> evict 2
        store.set(key("overflow"), json!("x"), Ttl::Default);
        assert_eq!(store.len(), 19);
        assert!(store.contains(&key("overflow")));
    }

    #[test]
    fn test_store_stats() {
        let mut store = memory_store(100);

        store.set(key("key1"), json!("value1"), Ttl::Default);
        store.get(&key("key1")); // hit
        store.get(&key("nonexistent")); // miss

        let stats = store.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.size, 1);
        assert_eq!(stats.max_size, 100);
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.hit_rate(), "50.00%");
    }

    #[test]
    fn test_contains_does_not_count() {
        let mut store = memory_store(100);
        store.set(key("a"), json!(1), Ttl::Default);

        assert!(store.contains(&key("a")));
        assert!(!store.contains(&key("b")));
        assert_eq!(store.stats().total_requests, 0);
    }

    #[test]
    fn test_clear_resets_everything() {
        let dir = TempDir::new().unwrap();
        let mut store = disk_store(&dir, 100);
        store.set(key("a"), json!(1), Ttl::Default);
        store.get(&key("a"));
        store.get(&key("b"));

        store.clear();

        let stats = store.stats();
        assert_eq!((stats.size, stats.hits, stats.misses), (0, 0, 0));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_write_through_and_reload() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = disk_store(&dir, 100);
            store.set(key("a"), json!({"doc": "text"}), Ttl::Default);
        }

        let mut reloaded = disk_store(&dir, 100);
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.get(&key("a")), Some(json!({"doc": "text"})));
    }

    #[test]
    fn test_expired_get_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut store = disk_store(&dir, 100);
        store.set(key("a"), json!(1), Ttl::After(Duration::from_millis(50)));
        let path = DiskStore::new(dir.path()).entry_path(&key("a"));
        assert!(path.exists());

        sleep(Duration::from_millis(100));

        assert_eq!(store.get(&key("a")), None);
        assert!(!path.exists());
    }

    #[test]
    fn test_eviction_removes_files() {
        let dir = TempDir::new().unwrap();
        let mut store = disk_store(&dir, 2);
        store.set(key("a"), json!(1), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("b"), json!(2), Ttl::Default);
        sleep(Duration::from_millis(2));
        store.set(key("c"), json!(3), Ttl::Default);

        let disk = DiskStore::new(dir.path());
        assert!(!disk.entry_path(&key("a")).exists());
        assert!(disk.entry_path(&key("b")).exists());
        assert!(disk.entry_path(&key("c")).exists());
    }

    #[test]
    fn test_hydrate_respects_max_size() {
        let dir = TempDir::new().unwrap();
        {
            let mut big = disk_store(&dir, 100);
            for i in 0..10 {
                big.set(key(&i.to_string()), json!(i), Ttl::Never);
            }
        }

        let small = disk_store(&dir, 5);
        assert!(small.len() <= 5);
    }

    #[test]
    fn test_small_instance_keeps_larger_instance_files() {
        let dir = TempDir::new().unwrap();
        {
            let mut big = disk_store(&dir, 100);
            for i in 0..20 {
                big.set(key(&i.to_string()), json!(i), Ttl::Never);
            }
        }

        let small = disk_store(&dir, 5);
        assert!(small.len() <= 5);
        drop(small);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 20);

        let mut reopened = disk_store(&dir, 100);
        assert_eq!(reopened.len(), 20);
        assert_eq!(reopened.get(&key("7")), Some(json!(7)));
    }

    #[test]
    fn test_write_failure_after_construction_keeps_value() {
        let dir = TempDir::new().unwrap();
        let cache_dir = dir.path().join("cache");
        let observer = Arc::new(RecordingObserver::default());
        let config = Config::default().with_cache_dir(&cache_dir);
        let mut store: CacheStore<Value> = CacheStore::with_observer(config, observer.clone()).unwrap();
        assert!(store.is_persistent());

        std::fs::remove_dir_all(&cache_dir).unwrap();
        store.set(key("a"), json!(1), Ttl::Default);

        assert_eq!(store.get(&key("a")), Some(json!(1)));
        assert_eq!(store.stats().hits, 1);
        let errors = observer.errors.lock();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Disk unavailable while trying to write"), "{}", errors[0]);
    }

    #[test]
    fn test_unwritable_dir_degrades_to_memory() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let config = Config::default().with_cache_dir(blocker.join("sub"));
        let mut store: CacheStore<Value> = CacheStore::with_observer(config, observer.clone()).unwrap();

        assert!(!store.is_persistent());
        store.set(key("a"), json!(1), Ttl::Default);
        assert_eq!(store.get(&key("a")), Some(json!(1)));
        assert_eq!(observer.errors.lock().len(), 1);
    }

    #[test]
    fn test_observer_sees_load_and_eviction() {
        let dir = TempDir::new().unwrap();
        std::fs::write(DiskStore::new(dir.path()).entry_path(&key("bad")), b"garbage").unwrap();

        let observer = Arc::new(RecordingObserver::default());
        let config = Config::default().with_cache_dir(dir.path()).with_max_size(1);
        let mut store: CacheStore<Value> = CacheStore::with_observer(config, observer.clone()).unwrap();

        assert_eq!(observer.loads.lock()[0].corrupt, 1);
        assert_eq!(observer.errors.lock().len(), 1);

        store.set(key("a"), json!(1), Ttl::Default);
        store.set(key("b"), json!(2), Ttl::Default);
        assert_eq!(*observer.evictions.lock(), vec![1]);
    }
}
