//! LRU Eviction Module
//!
//! Picks the least recently used entries to drop when the store grows past
//! its size bound.

use std::collections::HashMap;

use crate::cache::{CacheEntry, CacheKey};

// == Batch Size ==
/// Number of entries removed per eviction round: 10% of the store, at least one.
pub fn eviction_batch_size(len: usize) -> usize {
    (len / 10).max(1)
}

// == Select Victims ==
/// Returns the keys to evict, oldest `last_accessed` first.
///
/// Entries with identical `last_accessed` are ordered by `created_at`, then by
/// key, so the choice is deterministic for a given map. `keep` is never
/// selected; the store passes the key it just wrote.
pub fn select_victims<V>(
    entries: &HashMap<CacheKey, CacheEntry<V>>,
    keep: Option<&CacheKey>,
) -> Vec<CacheKey> {
    let count = eviction_batch_size(entries.len()).min(entries.len());

    let mut by_age: Vec<(&CacheKey, &CacheEntry<V>)> = entries
        .iter()
        .filter(|(key, _)| Some(*key) != keep)
        .collect();
    by_age.sort_by(|(ka, a), (kb, b)| {
        a.last_accessed
            .cmp(&b.last_accessed)
            .then(a.created_at.cmp(&b.created_at))
            .then(ka.cmp(kb))
    });

    by_age
        .into_iter()
        .take(count)
        .map(|(key, _)| key.clone())
        .collect()
}
