//! Cache Statistics Module
//!
//! Tracks cache performance metrics including hits, misses, and evictions.

use serde::{Serialize, Serializer};

// == Cache Stats ==
/// Snapshot of cache performance metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CacheStats {
    /// Current number of entries in memory
    pub size: usize,
    /// Configured size bound
    pub max_size: usize,
    /// Number of successful cache retrievals
    pub hits: u64,
    /// Number of failed cache retrievals (key not found or expired)
    pub misses: u64,
    /// Hit rate, serialized as a percentage string such as `"66.67%"`
    #[serde(serialize_with = "serialize_hit_rate", rename = "hit_rate")]
    hit_rate_percent: f64,
    /// hits + misses
    pub total_requests: u64,
    /// Number of entries evicted due to LRU policy
    pub evictions: u64,
}

fn serialize_hit_rate<S: Serializer>(rate: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&format!("{:.2}%", rate))
}

impl CacheStats {
    /// Hit rate as a percentage in `[0, 100]`, 0 when nothing was requested.
    pub fn hit_rate_percent(&self) -> f64 {
        self.hit_rate_percent
    }

    /// Hit rate formatted to two decimal places, e.g. `"50.00%"`.
    pub fn hit_rate(&self) -> String {
        format!("{:.2}%", self.hit_rate_percent)
    }
}

// == Counters ==
/// Running hit/miss/eviction counters owned by the store.
#[derive(Debug, Clone, Default)]
pub struct StatsTracker {
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl StatsTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_evictions(&mut self, count: usize) {
        self.evictions += count as u64;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    // == Snapshot ==
    /// Builds a stats report for the given store dimensions.
    pub fn snapshot(&self, size: usize, max_size: usize) -> CacheStats {
        let total_requests = self.hits + self.misses;
        let hit_rate_percent = if total_requests == 0 {
            0.0
        } else {
            self.hits as f64 / total_requests as f64 * 100.0
        };

        CacheStats {
            size,
            max_size,
            hits: self.hits,
            misses: self.misses,
            hit_rate_percent,
            total_requests,
            evictions: self.evictions,
        }
    }
}
