//! Amnesia Ingest Library
//!
//! Turns scanned book PDFs into virtual pages and chapter text.
//!
//! # Modules
//!
//! - `cache`: content-addressed store for raw parse results
//! - `parse`: chunked, retried calls to the layout parsing service
//! - `layout`: element normalization and duplex page splitting
//! - `structure`: footer-driven chapter boundaries and text assembly
//! - `pipeline`: all of the above behind one `ingest` call
//!
//! # Example
//!
//! ```rust,ignore
//! use amnesia_ingest::{IngestConfig, IngestPipeline};
//!
//! let config = IngestConfig::from_env()?;
//! let pipeline = IngestPipeline::from_config(&config)?;
//! let report = pipeline.ingest(Path::new("book.pdf"), true).await?;
//!
//! for bundle in &report.assembly.bundles {
//!     println!("{} ({} pages)", bundle.title, bundle.pages.len());
//! }
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod layout;
pub mod parse;
pub mod pipeline;
pub mod structure;
pub mod telemetry;

pub use config::IngestConfig;
pub use error::{IngestError, Result};
pub use pipeline::{IngestPipeline, IngestReport};
