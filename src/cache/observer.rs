//! Cache Observer Module
//!
//! Receives disk outcomes and eviction events that the store absorbs instead
//! of returning to callers.

use tracing::{debug, info, warn};

use crate::error::DiskError;

// == Load Summary ==
/// Result of hydrating a store from its cache directory.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Entries inserted into memory
    pub loaded: usize,
    /// Files removed because their entry had already expired
    pub expired: usize,
    /// Files removed because they could not be decoded
    pub corrupt: usize,
    /// Files left in place because of a format version mismatch
    pub incompatible: usize,
}

// == Observer Trait ==
/// Sink for conditions the cache handles internally.
pub trait CacheObserver: Send + Sync {
    /// A persistence operation failed; the in-memory operation still succeeded.
    fn on_disk_error(&self, error: &DiskError);

    /// Startup hydration finished.
    fn on_load_complete(&self, _summary: &LoadSummary) {}

    /// An eviction round removed `count` entries.
    fn on_eviction(&self, _count: usize) {}
}

// == Tracing Observer ==
/// Default observer, reports through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CacheObserver for TracingObserver {
    fn on_disk_error(&self, error: &DiskError) {
        match error {
            DiskError::Unavailable { operation, .. } => {
                warn!("Disk cache {} failed, continuing in memory: {}", operation, error)
            }
            DiskError::Corrupt { .. } => warn!("Discarded corrupt cache file: {}", error),
            DiskError::Unencodable { .. } => warn!("Cache entry kept in memory only: {}", error),
            DiskError::Incompatible { .. } => warn!("Skipped incompatible cache file: {}", error),
        }
    }

    fn on_load_complete(&self, summary: &LoadSummary) {
        info!(
            "Disk cache loaded: {} entries, {} expired, {} corrupt, {} incompatible",
            summary.loaded, summary.expired, summary.corrupt, summary.incompatible
        );
    }

    fn on_eviction(&self, count: usize) {
        debug!("LRU eviction removed {} entries", count);
    }
}

// == Noop Observer ==
/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl CacheObserver for NoopObserver {
    fn on_disk_error(&self, _error: &DiskError) {}
}
