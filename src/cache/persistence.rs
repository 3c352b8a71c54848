//! Persistence Module
//!
//! Mirrors cache entries to one JSON file per key inside the cache directory.
//! Writes go through a temporary file and a rename, so a crash mid-write never
//! leaves a truncated entry file behind.

use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::cache::observer::LoadSummary;
use crate::cache::{CacheEntry, CacheKey};
use crate::error::DiskError;

/// Suffix of entry files
pub const ENTRY_EXTENSION: &str = "cache";

/// Suffix of in-flight writes; each write gets its own randomly named file
const TEMP_SUFFIX: &str = ".cache.tmp";

/// In-flight files older than this are leftovers from a crashed writer
const STALE_TEMP_AGE: Duration = Duration::from_secs(60 * 60);

/// Record layout version written into every entry file
pub const FORMAT_VERSION: u32 = 1;

#[derive(Serialize)]
struct EntryRecord<'a, V> {
    format_version: u32,
    #[serde(flatten)]
    entry: &'a CacheEntry<V>,
}

// == Load Report ==
/// Everything recovered from disk at startup.
#[derive(Debug)]
pub struct LoadReport<V> {
    /// Live entries to insert into memory
    pub entries: Vec<(CacheKey, CacheEntry<V>)>,
    /// Counts of what happened to each file
    pub summary: LoadSummary,
    /// Failures encountered along the way
    pub errors: Vec<DiskError>,
}

// == Disk Store ==
/// Per-entry file storage rooted at a cache directory.
#[derive(Debug, Clone)]
pub struct DiskStore {
    dir: PathBuf,
}

impl DiskStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Creates the cache directory (and parents) if missing.
    pub fn ensure_dir(&self) -> Result<(), DiskError> {
        fs::create_dir_all(&self.dir).map_err(|e| DiskError::io("create", &self.dir, e))
    }

    /// Path of the entry file for `key`.
    pub fn entry_path(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.{}", key, ENTRY_EXTENSION))
    }

    // == Save ==
    /// Writes the full entry state for `key`, replacing any previous file.
    pub fn save<V: Serialize>(&self, key: &CacheKey, entry: &CacheEntry<V>) -> Result<(), DiskError> {
        let path = self.entry_path(key);
        let record = EntryRecord {
            format_version: FORMAT_VERSION,
            entry,
        };
        let bytes = serde_json::to_vec(&record).map_err(|e| DiskError::Unencodable {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        // Dropping the temp file on an error path removes it
        let mut temp = tempfile::Builder::new()
            .prefix(&format!("{}.", key))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| DiskError::io("write", &self.dir, e))?;
        temp.write_all(&bytes)
            .map_err(|e| DiskError::io("write", temp.path(), e))?;
        temp.persist(&path)
            .map_err(|e| DiskError::io("rename", &path, e.error))?;
        Ok(())
    }

    // == Delete ==
    /// Removes the file for `key`; a missing file is not an error.
    pub fn delete(&self, key: &CacheKey) -> Result<(), DiskError> {
        remove_if_present(&self.entry_path(key))
    }

    // == Clear ==
    /// Removes every entry file, including incompatible ones and stale
    /// in-flight writes.
    ///
    /// Keeps going past individual failures and returns them.
    pub fn clear(&self) -> Vec<DiskError> {
        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => return vec![DiskError::io("list", &self.dir, e)],
        };

        read_dir
            .filter_map(|dir_entry| dir_entry.ok().map(|d| d.path()))
            .filter(|path| is_entry_file(path) || is_stale_temp_file(path))
            .filter_map(|path| remove_if_present(&path).err())
            .collect()
    }

    // == Load All ==
    /// Reads every entry file in the cache directory.
    ///
    /// Corrupt files and expired entries are deleted. Files written with a
    /// different format version are skipped but left in place. A failure on
    /// one file never stops the others from loading.
    pub fn load_all<V: DeserializeOwned>(&self) -> LoadReport<V> {
        let mut report = LoadReport {
            entries: Vec::new(),
            summary: LoadSummary::default(),
            errors: Vec::new(),
        };

        let read_dir = match fs::read_dir(&self.dir) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return report,
            Err(e) => {
                report.errors.push(DiskError::io("list", &self.dir, e));
                return report;
            }
        };

        for path in read_dir.filter_map(|dir_entry| dir_entry.ok().map(|d| d.path())) {
            if is_temp_file(&path) {
                // Fresh ones may be another instance's write in progress
                if is_stale_temp_file(&path) {
                    if let Err(e) = remove_if_present(&path) {
                        report.errors.push(e);
                    }
                }
                continue;
            }
            if !is_entry_file(&path) {
                continue;
            }

            match read_entry::<V>(&path) {
                Ok((key, entry)) if entry.is_expired() => {
                    report.summary.expired += 1;
                    if let Err(e) = self.delete(&key) {
                        report.errors.push(e);
                    }
                }
                Ok((key, entry)) => {
                    report.summary.loaded += 1;
                    report.entries.push((key, entry));
                }
                Err(err @ DiskError::Corrupt { .. }) => {
                    report.summary.corrupt += 1;
                    if let Err(e) = remove_if_present(&path) {
                        report.errors.push(e);
                    }
                    report.errors.push(err);
                }
                Err(err @ DiskError::Incompatible { .. }) => {
                    report.summary.incompatible += 1;
                    report.errors.push(err);
                }
                Err(err) => report.errors.push(err),
            }
        }

        report
    }
}

fn read_entry<V: DeserializeOwned>(path: &Path) -> Result<(CacheKey, CacheEntry<V>), DiskError> {
    let corrupt = |reason: String| DiskError::Corrupt {
        path: path.to_path_buf(),
        reason,
    };

    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| corrupt("file name is not valid UTF-8".to_string()))?;
    let key = CacheKey::parse(stem).map_err(|e| corrupt(e.to_string()))?;

    let bytes = fs::read(path).map_err(|e| DiskError::io("read", path, e))?;
    let raw: Value = serde_json::from_slice(&bytes).map_err(|e| corrupt(e.to_string()))?;

    let found = raw
        .get("format_version")
        .and_then(Value::as_u64)
        .ok_or_else(|| corrupt("missing format_version".to_string()))?;
    if found != u64::from(FORMAT_VERSION) {
        return Err(DiskError::Incompatible {
            path: path.to_path_buf(),
            found: u32::try_from(found).unwrap_or(u32::MAX),
            expected: FORMAT_VERSION,
        });
    }

    let entry = serde_json::from_value(raw).map_err(|e| corrupt(e.to_string()))?;
    Ok((key, entry))
}

fn remove_if_present(path: &Path) -> Result<(), DiskError> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(DiskError::io("remove", path, e)),
    }
}

fn is_entry_file(path: &Path) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ENTRY_EXTENSION)
}

fn is_temp_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map_or(false, |n| n.ends_with(TEMP_SUFFIX))
}

fn is_stale_temp_file(path: &Path) -> bool {
    is_temp_file(path)
        && fs::metadata(path)
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| modified.elapsed().ok())
            .map_or(false, |age| age > STALE_TEMP_AGE)
}
