//! Process-wide Cache Instance
//!
//! A single [`MemoCache`] shared by everything in the process. It is built
//! exactly once, by the first successful [`init`] call; later calls return the
//! same instance and ignore their configuration.

use std::sync::OnceLock;

use parking_lot::Mutex;
use tracing::info;

use crate::config::Config;
use crate::error::Result;
use crate::shared::MemoCache;

static GLOBAL_CACHE: OnceLock<MemoCache> = OnceLock::new();

// Serializes construction so a failing config cannot race a valid one and
// hydration from disk happens once.
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// Returns the process-wide cache, constructing it from `config` on first use.
///
/// Concurrent first callers are serialized; exactly one instance is created.
/// If construction fails nothing is stored and a later call may retry.
pub fn init(config: Config) -> Result<&'static MemoCache> {
    if let Some(cache) = GLOBAL_CACHE.get() {
        return Ok(cache);
    }

    let _guard = INIT_LOCK.lock();
    if let Some(cache) = GLOBAL_CACHE.get() {
        return Ok(cache);
    }

    let cache: MemoCache = MemoCache::new(config)?;
    info!(
        "Process-wide cache initialized: max_size={}, disk={}",
        cache.config().max_size,
        cache.is_persistent()
    );
    Ok(GLOBAL_CACHE.get_or_init(|| cache))
}

/// Returns the process-wide cache if it has been initialized.
pub fn get() -> Option<&'static MemoCache> {
    GLOBAL_CACHE.get()
}
