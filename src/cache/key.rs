//! Cache Key Module
//!
//! Derives content-addressed keys from an operation, its primary content and
//! keyword parameters, and holds the per-operation TTL presets.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{CacheError, Result};

/// Length of a key in hex characters (SHA-256)
pub const KEY_LENGTH: usize = 64;

// == TTL Presets ==
/// 5 minutes, for rapidly changing results
pub const TTL_SHORT: Duration = Duration::from_secs(300);
/// 1 hour, default for most queries
pub const TTL_MEDIUM: Duration = Duration::from_secs(3600);
/// 24 hours, for stable results
pub const TTL_LONG: Duration = Duration::from_secs(86_400);
/// 7 days, for documentation and reviews
pub const TTL_WEEK: Duration = Duration::from_secs(604_800);

/// Returns the default TTL for an operation type.
///
/// Unrecognized operation types get [`TTL_MEDIUM`].
pub fn operation_ttl(operation_type: &str) -> Duration {
    match operation_type {
        "query" => TTL_MEDIUM,
        "code_review" => TTL_LONG,
        "generate_docs" => TTL_WEEK,
        "fix_code" => TTL_SHORT,
        "batch_process" => TTL_MEDIUM,
        _ => TTL_MEDIUM,
    }
}

// == Cache Key ==
/// Opaque, fixed-length identifier for one semantic request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyEnvelope<'a> {
    operation: &'a str,
    content: &'a str,
    params: BTreeMap<String, Value>,
}

impl CacheKey {
    // == Derive ==
    /// Derives a key from an operation type, primary content and parameters.
    ///
    /// Parameter order does not matter: parameters are sorted by name before
    /// hashing, and nested JSON objects serialize with sorted keys. When a
    /// parameter name is repeated the last value wins.
    pub fn derive<I, K>(operation_type: &str, primary_content: &str, params: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let envelope = KeyEnvelope {
            operation: operation_type,
            content: primary_content,
            params: params.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        };

        // Serializing strings and JSON values into a Vec cannot fail.
        let bytes = serde_json::to_vec(&envelope).unwrap_or_default();
        CacheKey(hex::encode(Sha256::digest(&bytes)))
    }

    // == Parse ==
    /// Accepts a previously derived key in its string form.
    pub fn parse(raw: &str) -> Result<Self> {
        let valid = raw.len() == KEY_LENGTH
            && raw
                .bytes()
                .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        if valid {
            Ok(CacheKey(raw.to_string()))
        } else {
            Err(CacheError::InvalidKey(raw.to_string()))
        }
    }

    /// The 64-character hex form, also used as the entry file stem.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
