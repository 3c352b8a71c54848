//! Configuration Module
//!
//! Handles loading and managing cache configuration from environment variables.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{CacheError, Result};

/// Default maximum number of in-memory entries
pub const DEFAULT_MAX_SIZE: usize = 1000;

/// Default TTL applied when `set` does not specify one
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);

/// Cache configuration parameters.
///
/// Immutable once a cache instance has been built from it.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Root directory for on-disk entries
    pub cache_dir: PathBuf,
    /// Maximum number of entries held in memory
    pub max_size: usize,
    /// Fallback TTL when `set` omits one, None = never expires
    pub default_ttl: Option<Duration>,
    /// Whether entries are written through to `cache_dir`
    pub enable_disk_cache: bool,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `MEMOCACHE_DIR` - Cache directory (default: user cache dir)
    /// - `MEMOCACHE_MAX_SIZE` - Maximum entries (default: 1000)
    /// - `MEMOCACHE_DEFAULT_TTL` - Default TTL in seconds, or `none` (default: 3600)
    /// - `MEMOCACHE_DISK` - Enable disk persistence (default: true)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            cache_dir: env::var("MEMOCACHE_DIR")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            max_size: env::var("MEMOCACHE_MAX_SIZE")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.max_size),
            default_ttl: env::var("MEMOCACHE_DEFAULT_TTL")
                .ok()
                .and_then(|v| parse_ttl(&v))
                .unwrap_or(defaults.default_ttl),
            enable_disk_cache: env::var("MEMOCACHE_DISK")
                .ok()
                .and_then(|v| parse_bool(&v))
                .unwrap_or(defaults.enable_disk_cache),
        }
    }

    // == Builders ==
    /// Sets the directory entry files are written to.
    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Sets the in-memory entry bound.
    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.max_size = max_size;
        self
    }

    /// Sets the TTL used by `Ttl::Default`; None means entries never expire.
    pub fn with_default_ttl(mut self, default_ttl: Option<Duration>) -> Self {
        self.default_ttl = default_ttl;
        self
    }

    /// Turns write-through persistence on or off.
    pub fn with_disk_cache(mut self, enabled: bool) -> Self {
        self.enable_disk_cache = enabled;
        self
    }

    /// Checks the configuration can back a cache instance.
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(CacheError::InvalidConfig(
                "max_size must be a positive integer".to_string(),
            ));
        }
        if self.enable_disk_cache && self.cache_dir.as_os_str().is_empty() {
            return Err(CacheError::InvalidConfig(
                "cache_dir must not be empty when disk cache is enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            max_size: DEFAULT_MAX_SIZE,
            default_ttl: Some(DEFAULT_TTL),
            enable_disk_cache: true,
        }
    }
}

/// User-scoped cache location: OS cache dir, then `~/.cache`, then the temp dir.
pub fn default_cache_dir() -> PathBuf {
    dirs::cache_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join(".cache")))
        .unwrap_or_else(env::temp_dir)
        .join("memocache")
}

// Outer None = unparseable, inner None = never expires.
fn parse_ttl(raw: &str) -> Option<Option<Duration>> {
    let raw = raw.trim();
    if raw.eq_ignore_ascii_case("none") || raw.eq_ignore_ascii_case("never") {
        return Some(None);
    }
    raw.parse::<u64>().ok().map(|secs| Some(Duration::from_secs(secs)))
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
