//! Merging chunk results into one document
//!
//! Workers finish in any order; merging sorts by chunk start page first, so
//! the output is identical regardless of completion order.

use super::types::{ChunkResult, RawElement};

/// Concatenated elements of all successful chunks
#[derive(Debug, Clone, Default)]
pub struct MergedElements {
    pub api: Option<String>,
    pub model: Option<String>,
    pub elements: Vec<RawElement>,
    pub pages_parsed: usize,
}

/// Offset pages by chunk start and renumber ids 0, 1, 2, ... across chunks
pub fn merge_chunks(mut results: Vec<ChunkResult>) -> MergedElements {
    results.sort_by_key(|r| r.job.start_page);

    let mut merged = MergedElements::default();
    let mut next_id: u64 = 0;

    for result in results {
        let offset = result.job.start_page as u32;
        let response = result.response;

        if merged.api.is_none() {
            merged.api = response.api;
        }
        if merged.model.is_none() {
            merged.model = response.model;
        }

        merged.pages_parsed += response.usage.pages.unwrap_or_else(|| result.job.page_count());

        merged.elements.reserve(response.elements.len());
        for mut element in response.elements {
            element.page += offset;
            element.id = next_id;
            next_id += 1;
            merged.elements.push(element);
        }
    }

    merged
}
