//! Content-addressed parse cache
//!
//! Raw parse-service payloads are stored one file per SHA-256 content hash,
//! so identical bytes always hit the same entry no matter the file name.
//!
//! # Usage
//!
//! ```rust,ignore
//! use amnesia_ingest::cache::{hash_file, FileParseCache, ParseCache};
//!
//! let cache = FileParseCache::new("./.cache/parse");
//! let fingerprint = hash_file(path).await?;
//!
//! if let Some(payload) = cache.get(&fingerprint.content_hash).await {
//!     // hit: no service call needed
//! }
//! ```

mod hash;
mod store;
mod types;

pub use hash::{hash_bytes, hash_file, is_valid_key, HASH_CHUNK_SIZE};
pub use store::{is_cacheable, FileParseCache, NoopCache, ParseCache};
pub use types::{CacheError, CacheMeta, CacheStats, CleanupReport, FileFingerprint, CACHE_META_KEY};
