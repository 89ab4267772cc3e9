//! Cache types

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key injected into every cache file next to the raw service payload
pub const CACHE_META_KEY: &str = "_cacheMeta";

/// Identity of an input file, computed by streaming its bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileFingerprint {
    /// SHA-256 of the full byte content (hex)
    pub content_hash: String,
    /// File size in bytes
    pub size: u64,
    /// Last modification time, when the filesystem reports one
    pub modified: Option<DateTime<Utc>>,
    /// Path the file was read from (informational only, never part of the key)
    pub path: PathBuf,
}

/// Provenance stored alongside a cached payload
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheMeta {
    pub file_hash: String,
    pub file_size: u64,
    pub file_mtime: Option<DateTime<Utc>>,
    pub cached_at: DateTime<Utc>,
    pub source_path: String,
}

impl CacheMeta {
    pub fn from_fingerprint(fingerprint: &FileFingerprint) -> Self {
        Self {
            file_hash: fingerprint.content_hash.clone(),
            file_size: fingerprint.size,
            file_mtime: fingerprint.modified,
            cached_at: Utc::now(),
            source_path: fingerprint.path.to_string_lossy().to_string(),
        }
    }
}

/// Statistics about the on-disk cache
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of committed entries
    pub entries: usize,
    /// Total bytes across committed entries
    pub total_bytes: u64,
}

/// Outcome of an age-based cleanup sweep
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Files examined
    pub scanned: usize,
    /// Files deleted
    pub removed: usize,
    /// Files that could not be inspected or deleted
    pub failed: usize,
}

/// Cache errors
///
/// Only `invalidate` returns these; reads and writes log and degrade.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("Cache IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid cache key: {0}")]
    InvalidKey(String),
}
