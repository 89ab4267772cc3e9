//! Parse-service error types

use std::time::Duration;

use thiserror::Error;

/// Errors from a single parse-service interaction
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Rate limited by parse service (HTTP 429)")]
    RateLimited { retry_after: Option<Duration> },

    #[error("Transient network error: {0}")]
    Transient(String),

    #[error("Parse call timed out after {0} seconds")]
    Timeout(u64),

    #[error("Parse service returned {status}: {body}")]
    Http { status: u16, body: String },

    #[error("Failed to build parse request: {0}")]
    Request(String),

    #[error("Failed to decode parse response: {0}")]
    Decode(String),

    #[error("Failed to probe page count: {0}")]
    Probe(String),

    #[error("Failed to open document for page extraction: {0}")]
    Open(String),

    #[error("Failed to extract pages {start}..{end}: {message}")]
    Slice {
        start: usize,
        end: usize,
        message: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Whether the retry loop should try again after this error
    ///
    /// Only rate limiting and network-level failures qualify. Any other HTTP
    /// status fails the call immediately.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimited { .. } | Self::Transient(_) | Self::Timeout(_)
        )
    }

    /// Whether the error came from cutting the local document, not the service
    pub fn is_extraction(&self) -> bool {
        matches!(self, Self::Open(_) | Self::Slice { .. })
    }

    /// Server-suggested delay, if any
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ParseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
            ParseError::Transient(err.to_string())
        } else if err.is_decode() {
            ParseError::Decode(err.to_string())
        } else if let Some(status) = err.status() {
            ParseError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            }
        } else {
            ParseError::Request(err.to_string())
        }
    }
}
