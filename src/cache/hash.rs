//! Streaming content hashing
//!
//! Cache keys depend only on file bytes, never on name or location.

use std::path::Path;

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use tokio::io::AsyncReadExt;

use super::types::FileFingerprint;

/// Read buffer size for hashing
pub const HASH_CHUNK_SIZE: usize = 64 * 1024;

/// Hash a file's content without loading it whole into memory
pub async fn hash_file(path: &Path) -> std::io::Result<FileFingerprint> {
    let mut file = tokio::fs::File::open(path).await?;
    let metadata = file.metadata().await?;

    let mut hasher = Sha256::new();
    let mut buffer = vec![0u8; HASH_CHUNK_SIZE];
    loop {
        let read = file.read(&mut buffer).await?;
        if read == 0 {
            break;
        }
        hasher.update(&buffer[..read]);
    }

    Ok(FileFingerprint {
        content_hash: hex::encode(hasher.finalize()),
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        path: path.to_path_buf(),
    })
}

/// SHA-256 of an in-memory buffer (hex)
pub fn hash_bytes(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Whether `key` looks like a hex digest and is safe to use as a file name
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty() && key.len() <= 128 && key.bytes().all(|b| b.is_ascii_hexdigit())
}
