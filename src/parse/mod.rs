//! External layout-parse integration
//!
//! Turns a PDF into the service's raw element list:
//!
//! - `client`: HTTP client for the layout parsing service
//! - `pdf`: page-count probe and page-range extraction
//! - `retry`: per-call timeout and exponential backoff
//! - `orchestrator`: chunking, bounded parallel dispatch, caching
//! - `merge`: page offsetting and id renumbering across chunks

mod client;
mod error;
mod merge;
mod orchestrator;
mod pdf;
mod retry;
mod types;

pub use client::{LayoutParseClient, ParseService};
pub use error::ParseError;
pub use merge::{merge_chunks, MergedElements};
pub use orchestrator::{CachedParse, ParseOrchestrator};
pub use pdf::{LoadedPdf, PageSlicer, PageSource, PdfPageSlicer};
pub use retry::{call_with_retry, RetryOutcome, RetryPolicy};
pub use types::{
    plan_chunks, ChunkFailure, ChunkJob, ChunkResult, IngestSummary, MarkupContent, ParseResponse,
    Point, RawDocument, RawElement, Usage,
};
