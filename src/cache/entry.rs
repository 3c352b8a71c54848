//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support and
//! access tracking.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// == TTL Policy ==
/// How long an entry written by `set` should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// Use the cache instance's configured default TTL
    #[default]
    Default,
    /// Never expires
    Never,
    /// Expires once this much time has passed since creation
    After(Duration),
}

impl Ttl {
    /// Resolves the policy against an instance default.
    pub fn resolve(self, default_ttl: Option<Duration>) -> Option<Duration> {
        match self {
            Ttl::Default => default_ttl,
            Ttl::Never => None,
            Ttl::After(ttl) => Some(ttl),
        }
    }
}

impl From<Duration> for Ttl {
    fn from(ttl: Duration) -> Self {
        Ttl::After(ttl)
    }
}

// == Cache Entry ==
/// A cached value plus its lifecycle metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<V> {
    /// The stored value
    pub value: V,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Time to live, None = no expiration
    pub ttl: Option<Duration>,
    /// Number of successful retrievals
    pub access_count: u64,
    /// Timestamp of the most recent retrieval (or creation)
    pub last_accessed: DateTime<Utc>,
}

impl<V> CacheEntry<V> {
    // == Constructor ==
    /// Creates a new cache entry with optional TTL.
    pub fn new(value: V, ttl: Option<Duration>) -> Self {
        let now = Utc::now();
        Self {
            value,
            created_at: now,
            ttl,
            access_count: 0,
            last_accessed: now,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once strictly more than `ttl` has elapsed since
    /// creation. If the clock moved backwards the entry is considered fresh.
    pub fn is_expired(&self) -> bool {
        match self.ttl {
            Some(ttl) => match self.age() {
                Some(age) => age > ttl,
                None => false,
            },
            None => false,
        }
    }

    // == Access ==
    /// Records a retrieval and returns the value.
    ///
    /// Callers check [`is_expired`](Self::is_expired) first.
    pub fn access(&mut self) -> &V {
        self.access_count += 1;
        self.last_accessed = Utc::now();
        &self.value
    }

    // == Time To Live ==
    /// Returns remaining TTL, or None if no expiration is set.
    ///
    /// Returns `Some(Duration::ZERO)` once the entry has expired.
    pub fn ttl_remaining(&self) -> Option<Duration> {
        self.ttl.map(|ttl| {
            let age = self.age().unwrap_or(Duration::ZERO);
            ttl.saturating_sub(age)
        })
    }

    fn age(&self) -> Option<Duration> {
        (Utc::now() - self.created_at).to_std().ok()
    }
}
