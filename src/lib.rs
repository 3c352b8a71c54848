//! Memocache - A disk-backed memoization cache for expensive operations
//!
//! Derives content-addressed keys for AI completions, code reviews and similar
//! idempotent calls, and serves repeated requests from memory or disk with TTL
//! expiration and LRU eviction.

pub mod cache;
pub mod config;
pub mod error;
pub mod shared;

pub use cache::{operation_ttl, CacheKey, CacheStats, Ttl};
pub use config::Config;
pub use error::{CacheError, DiskError, Result};
pub use shared::MemoCache;
