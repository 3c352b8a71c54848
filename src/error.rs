//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Errors surfaced by the public cache API.
///
/// Disk failures never show up here; they are reported as [`DiskError`]
/// through the configured observer instead.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration rejected at construction time
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Key string is not a valid derived key
    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}

// == Disk Error Enum ==
/// Outcome of a failed persistence operation.
#[derive(Error, Debug)]
pub enum DiskError {
    /// The filesystem refused the operation
    #[error("Disk unavailable while trying to {operation} {path}: {source}")]
    Unavailable {
        operation: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File exists but cannot be decoded as an entry
    #[error("Corrupt cache entry {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Value could not be encoded; nothing was written
    #[error("Cannot encode cache entry {path}: {reason}")]
    Unencodable { path: PathBuf, reason: String },

    /// File was written with a different record format
    #[error("Incompatible cache entry {path}: format version {found}, expected {expected}")]
    Incompatible {
        path: PathBuf,
        found: u32,
        expected: u32,
    },
}

impl DiskError {
    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        DiskError::Unavailable {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Path of the file the failure relates to.
    pub fn path(&self) -> &std::path::Path {
        match self {
            DiskError::Unavailable { path, .. }
            | DiskError::Corrupt { path, .. }
            | DiskError::Unencodable { path, .. }
            | DiskError::Incompatible { path, .. } => path,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
