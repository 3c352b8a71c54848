//! Cache Module
//!
//! Provides content-addressed memoization with TTL expiration, LRU eviction
//! and a best-effort disk mirror.

mod entry;
mod key;
mod lru;
mod observer;
mod persistence;
mod stats;
mod store;


// Re-export public types
pub use entry::{CacheEntry, Ttl};
pub use key::{operation_ttl, CacheKey, KEY_LENGTH, TTL_LONG, TTL_MEDIUM, TTL_SHORT, TTL_WEEK};
pub use lru::{eviction_batch_size, select_victims};
pub use observer::{CacheObserver, LoadSummary, NoopObserver, TracingObserver};
pub use persistence::{DiskStore, LoadReport, ENTRY_EXTENSION, FORMAT_VERSION};
pub use stats::{CacheStats, StatsTracker};
pub use store::CacheStore;
