//! Error types for the ingestion pipeline
//!
//! Only conditions that leave no usable result surface here. Cache IO
//! problems, failed chunks, footer noise and empty page sides degrade to
//! partial results and are reported as warnings instead.

use std::path::PathBuf;

use thiserror::Error;

use crate::parse::{ChunkFailure, ParseError};

/// Pipeline-wide result type
pub type Result<T> = std::result::Result<T, IngestError>;

/// Fatal ingestion errors
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Input file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("All {} chunks failed to parse", .0.len())]
    AllChunksFailed(Vec<ChunkFailure>),

    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl IngestError {
    /// Map an IO error on the input file, keeping "not found" distinct
    pub fn from_input_io(path: &std::path::Path, err: std::io::Error) -> Self {
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound(path.to_path_buf())
        } else {
            Self::Io(err)
        }
    }
}
