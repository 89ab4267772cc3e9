//! Parse cache backends
//!
//! Entries are raw parse-service payloads keyed by content hash. The cache
//! sits in front of the service only; normalization and splitting always run
//! on the returned payload, so those stages can change freely.
//!
//! # Concurrency
//!
//! Writers stage into a unique temp file in the cache directory and rename
//! it onto `<hash>.json`. Readers therefore only ever see complete files.
//! Two writers racing on the same hash both succeed; the last rename wins
//! and both payloads describe the same bytes.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use serde_json::Value;
use uuid::Uuid;

use super::hash::is_valid_key;
use super::types::{CacheError, CacheMeta, CacheStats, CleanupReport, FileFingerprint, CACHE_META_KEY};

const ENTRY_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const SECS_PER_DAY: u64 = 24 * 60 * 60;

// ============================================================================
// Cache Trait
// ============================================================================

/// Content-addressed store for raw parse payloads
#[async_trait]
pub trait ParseCache: Send + Sync {
    /// Look up a payload; any failure reads as a miss
    async fn get(&self, content_hash: &str) -> Option<Value>;

    /// Store a payload; returns whether an entry was written
    async fn put(&self, fingerprint: &FileFingerprint, payload: &Value) -> bool;

    /// Delete an entry; returns whether one existed
    async fn invalidate(&self, content_hash: &str) -> Result<bool, CacheError>;

    /// Delete entries older than `max_age_days`
    async fn cleanup(&self, max_age_days: u64) -> CleanupReport;

    /// Entry count and size
    async fn stats(&self) -> CacheStats;

    /// Check if an entry exists without decoding it
    async fn contains(&self, content_hash: &str) -> bool {
        self.get(content_hash).await.is_some()
    }
}

/// Whether a payload looks like a real service response
///
/// Requires an `elements` list or an `api` marker so that empty or error
/// bodies never get cached.
pub fn is_cacheable(payload: &Value) -> bool {
    let Some(object) = payload.as_object() else {
        return false;
    };
    let has_elements = object.get("elements").map(Value::is_array).unwrap_or(false);
    let has_api = object.get("api").map(|v| !v.is_null()).unwrap_or(false);
    has_elements || has_api
}

// ============================================================================
// Filesystem Cache
// ============================================================================

/// One JSON file per content hash in a single directory
#[derive(Debug, Clone)]
pub struct FileParseCache {
    dir: PathBuf,
}

impl FileParseCache {
    /// Create a cache rooted at `dir` (created on first write)
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_path(&self, content_hash: &str) -> PathBuf {
        self.dir.join(format!("{}.{}", content_hash, ENTRY_EXTENSION))
    }

    fn temp_path(&self, content_hash: &str) -> PathBuf {
        self.dir
            .join(format!(".{}.{}.{}", content_hash, Uuid::new_v4(), TEMP_EXTENSION))
    }

    async fn write_atomic(&self, content_hash: &str, bytes: &[u8]) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.dir).await?;

        let temp_path = self.temp_path(content_hash);
        if let Err(e) = tokio::fs::write(&temp_path, bytes).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        if let Err(e) = tokio::fs::rename(&temp_path, self.entry_path(content_hash)).await {
            let _ = tokio::fs::remove_file(&temp_path).await;
            return Err(e);
        }

        Ok(())
    }
}

#[async_trait]
impl ParseCache for FileParseCache {
    async fn get(&self, content_hash: &str) -> Option<Value> {
        if !is_valid_key(content_hash) {
            tracing::warn!(content_hash = %content_hash, "Refusing cache lookup with invalid key");
            return None;
        }

        let path = self.entry_path(content_hash);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(content_hash = %content_hash, "Parse cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read cache entry");
                return None;
            }
        };

        let mut payload: Value = match serde_json::from_slice(&bytes) {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt cache entry, treating as miss");
                return None;
            }
        };

        match payload.as_object_mut() {
            Some(object) => {
                object.remove(CACHE_META_KEY);
            }
            None => {
                tracing::warn!(path = %path.display(), "Cache entry is not a JSON object");
                return None;
            }
        }

        tracing::debug!(content_hash = %content_hash, "Parse cache hit");
        Some(payload)
    }

    async fn put(&self, fingerprint: &FileFingerprint, payload: &Value) -> bool {
        let content_hash = fingerprint.content_hash.as_str();

        if !is_valid_key(content_hash) {
            tracing::warn!(content_hash = %content_hash, "Refusing cache write with invalid key");
            return false;
        }

        if !is_cacheable(payload) {
            tracing::warn!(
                content_hash = %content_hash,
                "Payload has neither elements nor api marker, not caching"
            );
            return false;
        }

        let mut entry = payload.clone();
        let meta = match serde_json::to_value(CacheMeta::from_fingerprint(fingerprint)) {
            Ok(meta) => meta,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode cache metadata");
                return false;
            }
        };
        if let Some(object) = entry.as_object_mut() {
            object.insert(CACHE_META_KEY.to_string(), meta);
        }

        let bytes = match serde_json::to_vec(&entry) {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode cache entry");
                return false;
            }
        };

        match self.write_atomic(content_hash, &bytes).await {
            Ok(()) => {
                tracing::info!(
                    content_hash = %content_hash,
                    bytes = bytes.len(),
                    source = %fingerprint.path.display(),
                    "Stored parse result in cache"
                );
                true
            }
            Err(e) => {
                tracing::warn!(content_hash = %content_hash, error = %e, "Failed to write cache entry");
                false
            }
        }
    }

    async fn invalidate(&self, content_hash: &str) -> Result<bool, CacheError> {
        if !is_valid_key(content_hash) {
            return Err(CacheError::InvalidKey(content_hash.to_string()));
        }

        match tokio::fs::remove_file(self.entry_path(content_hash)).await {
            Ok(()) => {
                tracing::info!(content_hash = %content_hash, "Invalidated cache entry");
                Ok(true)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn cleanup(&self, max_age_days: u64) -> CleanupReport {
        let mut report = CleanupReport::default();
        let max_age = Duration::from_secs(max_age_days.saturating_mul(SECS_PER_DAY));
        let now = SystemTime::now();

        let mut entries = match tokio::fs::read_dir(&self.dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return report,
            Err(e) => {
                tracing::warn!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                report.failed += 1;
                return report;
            }
        };

        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read cache directory entry");
                    report.failed += 1;
                    break;
                }
            };

            let path = entry.path();
            let managed = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| ext == ENTRY_EXTENSION || ext == TEMP_EXTENSION)
                .unwrap_or(false);
            if !managed {
                continue;
            }
            report.scanned += 1;

            let modified = match entry.metadata().await.and_then(|m| m.modified()) {
                Ok(modified) => modified,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Cannot stat cache file");
                    report.failed += 1;
                    continue;
                }
            };

            // Future mtimes (clock skew) count as fresh
            let expired = now
                .duration_since(modified)
                .map(|age| age > max_age)
                .unwrap_or(false);
            if !expired {
                continue;
            }

            match tokio::fs::remove_file(&path).await {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "Cannot delete cache file");
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            scanned = report.scanned,
            removed = report.removed,
            failed = report.failed,
            max_age_days = max_age_days,
            "Parse cache cleanup complete"
        );

        report
    }

    async fn stats(&self) -> CacheStats {
        let mut stats = CacheStats::default();
        let Ok(mut entries) = tokio::fs::read_dir(&self.dir).await else {
            return stats;
        };

        while let Ok(Some(entry)) = entries.next_entry().await {
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            if let Ok(metadata) = entry.metadata().await {
                stats.entries += 1;
                stats.total_bytes += metadata.len();
            }
        }

        stats
    }

    async fn contains(&self, content_hash: &str) -> bool {
        is_valid_key(content_hash)
            && tokio::fs::try_exists(self.entry_path(content_hash))
                .await
                .unwrap_or(false)
    }
}

// ============================================================================
// Disabled Cache
// ============================================================================

/// Cache that never stores anything, for runs with caching turned off
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

#[async_trait]
impl ParseCache for NoopCache {
    async fn get(&self, _content_hash: &str) -> Option<Value> {
        None
    }

    async fn put(&self, _fingerprint: &FileFingerprint, _payload: &Value) -> bool {
        false
    }

    async fn invalidate(&self, _content_hash: &str) -> Result<bool, CacheError> {
        Ok(false)
    }

    async fn cleanup(&self, _max_age_days: u64) -> CleanupReport {
        CleanupReport::default()
    }

    async fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

// ============================================================================
// Tests
// ============================================================================
