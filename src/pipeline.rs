//! End-to-end ingestion
//!
//! Wires the stages together:
//!
//! ```text
//! file ─► hash ─► cache ─► parse orchestrator ─► normalize ─► split ─► analyze ─► assemble
//! ```
//!
//! Everything after the orchestrator is pure, so re-running ingestion on a
//! cached file only repeats the cheap stages.

use std::path::Path;
use std::sync::Arc;

use serde::Serialize;

use crate::cache::{FileParseCache, NoopCache, ParseCache};
use crate::config::{IngestConfig, LayoutConfig};
use crate::error::Result;
use crate::layout::{build_document, normalize, split_pages, ParsedDocument, SplitConfig};
use crate::parse::{LayoutParseClient, ParseOrchestrator, PdfPageSlicer, RawDocument};
use crate::structure::{analyze, assemble, Assembly, BoundaryConfig, StructuralBoundary};

/// Everything ingestion produced for one file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestReport {
    pub content_hash: String,
    pub cache_hit: bool,
    pub document: ParsedDocument,
    pub boundary: StructuralBoundary,
    pub assembly: Assembly,
    /// Degraded conditions worth surfacing (dropped chunks, page mismatch, gaps)
    pub warnings: Vec<String>,
}

pub struct IngestPipeline {
    orchestrator: ParseOrchestrator,
    split: SplitConfig,
    boundary: BoundaryConfig,
}

impl IngestPipeline {
    pub fn new(orchestrator: ParseOrchestrator, layout: &LayoutConfig) -> Self {
        Self {
            orchestrator,
            split: SplitConfig::from(layout),
            boundary: BoundaryConfig::from(layout),
        }
    }

    /// Production wiring: HTTP client, file cache (or none), MuPDF/lopdf slicer
    pub fn from_config(config: &IngestConfig) -> Result<Self> {
        config.validate()?;

        let service = Arc::new(LayoutParseClient::new(&config.service)?);
        let cache: Arc<dyn ParseCache> = if config.cache.enabled {
            Arc::new(FileParseCache::new(config.cache.dir.clone()))
        } else {
            Arc::new(NoopCache)
        };

        if config.service.api_key.is_empty() {
            tracing::warn!("PARSE_API_KEY is empty; only cached documents will ingest");
        }

        let orchestrator = ParseOrchestrator::new(
            service,
            Arc::new(PdfPageSlicer),
            cache,
            &config.chunking,
        );

        Ok(Self::new(orchestrator, &config.layout))
    }

    pub fn orchestrator(&self) -> &ParseOrchestrator {
        &self.orchestrator
    }

    /// Run every stage on one PDF
    pub async fn ingest(&self, path: &Path, force_split: bool) -> Result<IngestReport> {
        let parsed = self.orchestrator.parse_cached(path).await?;
        let mut warnings = raw_warnings(&parsed.document);

        let elements = normalize(&parsed.document.elements);
        let pages = split_pages(&elements, force_split, &self.split);
        let boundary = analyze(&pages, &self.boundary);
        let assembly = assemble(&pages, &boundary);
        let document = build_document(pages, force_split);

        for gap in &assembly.gaps {
            warnings.push(format!(
                "Chapter {} ({}) covers pages {}-{} but none were found",
                gap.order_index + 1,
                gap.title.as_deref().unwrap_or("untitled"),
                gap.start_page,
                gap.end_page
            ));
        }

        tracing::info!(
            content_hash = %parsed.fingerprint.content_hash,
            cache_hit = parsed.cache_hit,
            virtual_pages = document.total_pages,
            chapters = assembly.bundles.len(),
            warnings = warnings.len(),
            "Ingested document"
        );

        Ok(IngestReport {
            content_hash: parsed.fingerprint.content_hash,
            cache_hit: parsed.cache_hit,
            document,
            boundary,
            assembly,
            warnings,
        })
    }
}

fn raw_warnings(document: &RawDocument) -> Vec<String> {
    let mut warnings: Vec<String> = document
        .failed_chunks
        .iter()
        .map(|f| {
            format!(
                "Pages {}-{} missing: chunk {} failed after {} attempts ({})",
                f.job.start_page + 1,
                f.job.end_page,
                f.job.index,
                f.attempts,
                f.error
            )
        })
        .collect();

    if let Some((expected, parsed)) = document.page_mismatch() {
        warnings.push(format!("Expected {} pages but parsed {}", expected, parsed));
    }

    warnings
}
