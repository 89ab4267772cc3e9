//! PDF page probing and page-range extraction
//!
//! All operations are blocking; the orchestrator runs them on
//! `spawn_blocking`. A document is opened once per chunked parse and every
//! chunk is cut from that loaded copy.

use std::path::Path;
use std::sync::Arc;

use super::error::ParseError;

/// Page-level access to the input document
pub trait PageSlicer: Send + Sync {
    /// Total number of pages
    fn page_count(&self, path: &Path) -> Result<usize, ParseError>;

    /// Load the document for repeated range extraction
    fn open(&self, path: &Path) -> Result<Arc<dyn PageSource>, ParseError>;
}

/// A loaded document that page ranges are cut from
pub trait PageSource: Send + Sync {
    /// Standalone document holding pages `start..end` (0-based, end exclusive)
    fn extract_pages(&self, start: usize, end: usize) -> Result<Vec<u8>, ParseError>;
}

/// MuPDF for counting, lopdf for rewriting page subsets
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPageSlicer;

impl PageSlicer for PdfPageSlicer {
    fn page_count(&self, path: &Path) -> Result<usize, ParseError> {
        let path_str = path.to_string_lossy();
        let doc = mupdf::Document::open(&*path_str).map_err(|e| ParseError::Probe(e.to_string()))?;
        let count = doc.page_count().map_err(|e| ParseError::Probe(e.to_string()))?;
        usize::try_from(count).map_err(|_| ParseError::Probe(format!("negative page count {}", count)))
    }

    fn open(&self, path: &Path) -> Result<Arc<dyn PageSource>, ParseError> {
        let doc = lopdf::Document::load(path).map_err(|e| ParseError::Open(e.to_string()))?;
        tracing::debug!(pages = doc.get_pages().len(), "Loaded document for page extraction");
        Ok(Arc::new(LoadedPdf { doc }))
    }
}

/// A parsed lopdf document; each extraction works on its own copy
#[derive(Debug)]
pub struct LoadedPdf {
    doc: lopdf::Document,
}

impl LoadedPdf {
    pub fn from_bytes(data: &[u8]) -> Result<Self, ParseError> {
        let doc = lopdf::Document::load_mem(data).map_err(|e| ParseError::Open(e.to_string()))?;
        Ok(Self { doc })
    }
}

impl PageSource for LoadedPdf {
    fn extract_pages(&self, start: usize, end: usize) -> Result<Vec<u8>, ParseError> {
        let slice_err = |message: String| ParseError::Slice { start, end, message };

        // lopdf numbers pages from 1
        let pages = self.doc.get_pages();
        if start >= end || end > pages.len() {
            return Err(slice_err(format!(
                "range outside document of {} pages",
                pages.len()
            )));
        }

        let out_of_range: Vec<u32> = pages
            .keys()
            .copied()
            .filter(|number| {
                let index = (*number as usize).saturating_sub(1);
                index < start || index >= end
            })
            .collect();

        let mut doc = self.doc.clone();
        doc.delete_pages(&out_of_range);
        doc.prune_objects();

        let mut buffer = Vec::new();
        doc.save_to(&mut buffer).map_err(|e| slice_err(e.to_string()))?;

        tracing::debug!(
            start = start,
            end = end,
            bytes = buffer.len(),
            "Extracted page range"
        );

        Ok(buffer)
    }
}
