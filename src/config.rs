//! Configuration management for the ingestion pipeline
//!
//! Every knob has a default; `from_env` overrides them from the process
//! environment (after loading `.env` when present).

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::error::IngestError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct IngestConfig {
    pub service: ServiceConfig,
    pub cache: CacheConfig,
    pub chunking: ChunkingConfig,
    pub layout: LayoutConfig,
}

/// External layout-parsing service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub dir: PathBuf,
}

/// Chunked dispatch and retry policy
#[derive(Debug, Clone, Deserialize)]
pub struct ChunkingConfig {
    /// Pages per chunk; documents at or below this size go in one request
    pub chunk_size: usize,
    /// Maximum chunk calls in flight
    pub max_workers: usize,
    /// Attempts per call (first try included)
    pub max_retries: u32,
    /// Per-attempt timeout in seconds
    pub call_timeout_secs: u64,
    /// First backoff delay in milliseconds, doubled on every retry
    pub backoff_base_ms: u64,
}

/// Geometry thresholds, as fractions of the page (0..1)
#[derive(Debug, Clone, Deserialize)]
pub struct LayoutConfig {
    pub centerline: f64,
    pub footer_threshold: f64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            endpoint: "https://api.upstage.ai/v1/document-digitization".to_string(),
            api_key: String::new(),
            model: "document-parse".to_string(),
        }
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        CacheConfig {
            enabled: true,
            dir: PathBuf::from("./.cache/parse"),
        }
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        ChunkingConfig {
            chunk_size: 10,
            max_workers: 5,
            max_retries: 3,
            call_timeout_secs: 120,
            backoff_base_ms: 1000,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            centerline: 0.5,
            footer_threshold: 0.85,
        }
    }
}

impl ChunkingConfig {
    pub fn call_timeout(&self) -> Duration {
        Duration::from_secs(self.call_timeout_secs)
    }

    pub fn backoff_base(&self) -> Duration {
        Duration::from_millis(self.backoff_base_ms)
    }
}

impl IngestConfig {
    pub fn from_env() -> Result<Self, IngestError> {
        dotenvy::dotenv().ok();

        let defaults = IngestConfig::default();

        let config = IngestConfig {
            service: ServiceConfig {
                endpoint: env::var("PARSE_API_URL").unwrap_or(defaults.service.endpoint),
                api_key: env::var("PARSE_API_KEY").unwrap_or_default(),
                model: env::var("PARSE_MODEL").unwrap_or(defaults.service.model),
            },
            cache: CacheConfig {
                enabled: parse_var("INGEST_CACHE_ENABLED", defaults.cache.enabled),
                dir: env::var("INGEST_CACHE_DIR")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.cache.dir),
            },
            chunking: ChunkingConfig {
                chunk_size: parse_var("INGEST_CHUNK_SIZE", defaults.chunking.chunk_size),
                max_workers: parse_var("INGEST_MAX_WORKERS", defaults.chunking.max_workers),
                max_retries: parse_var("INGEST_MAX_RETRIES", defaults.chunking.max_retries),
                call_timeout_secs: parse_var(
                    "INGEST_CALL_TIMEOUT_SECS",
                    defaults.chunking.call_timeout_secs,
                ),
                backoff_base_ms: parse_var("INGEST_BACKOFF_BASE_MS", defaults.chunking.backoff_base_ms),
            },
            layout: LayoutConfig {
                centerline: parse_var("INGEST_CENTERLINE", defaults.layout.centerline),
                footer_threshold: parse_var(
                    "INGEST_FOOTER_THRESHOLD",
                    defaults.layout.footer_threshold,
                ),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with
    pub fn validate(&self) -> Result<(), IngestError> {
        if self.chunking.chunk_size == 0 {
            return Err(IngestError::Config("chunk_size must be at least 1".into()));
        }
        if self.chunking.max_workers == 0 {
            return Err(IngestError::Config("max_workers must be at least 1".into()));
        }
        if self.chunking.max_retries == 0 {
            return Err(IngestError::Config("max_retries must be at least 1".into()));
        }
        for (name, value) in [
            ("centerline", self.layout.centerline),
            ("footer_threshold", self.layout.footer_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(IngestError::Config(format!(
                    "{} must be within 0..1, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key = key, value = %raw, "Ignoring unparsable config value");
            default
        }),
        Err(_) => default,
    }
}
