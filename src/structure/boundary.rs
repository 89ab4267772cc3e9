//! Structural boundary detection
//!
//! Infers front matter, chapters and back matter from how footer section
//! labels change across virtual pages. Purely heuristic: pages with missing
//! or noisy footers contribute no hint, and the result may be incomplete.

use std::collections::HashSet;

use crate::layout::VirtualPage;

use super::classify::classify_label;
use super::footer::extract_footer_records;
use super::types::{BoundaryConfig, ChapterBoundary, FooterRecord, SectionKind, StructuralBoundary};

/// A page where the section label differs from the previous labelled page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryEvent {
    pub page: u32,
    pub label: String,
    pub kind: SectionKind,
}

/// Infer the structural skeleton of a split document
pub fn analyze(pages: &[VirtualPage], config: &BoundaryConfig) -> StructuralBoundary {
    let records = extract_footer_records(pages, config.footer_threshold);
    let last_page = pages.iter().map(|p| p.page_number).max().unwrap_or(0);

    let boundary = derive_boundary(&records, last_page);

    tracing::debug!(
        pages = pages.len(),
        footer_records = records.len(),
        chapters = boundary.chapters.len(),
        pre_body = ?boundary.pre_body_range,
        post_body_start = ?boundary.post_body_start,
        "Analyzed structural boundaries"
    );

    boundary
}

/// Label changes in page order; the first labelled page always counts
pub fn boundary_events(records: &[FooterRecord]) -> Vec<BoundaryEvent> {
    let mut events = Vec::new();
    let mut previous: Option<&str> = None;

    for record in records {
        let Some(label) = record.section_label.as_deref() else {
            continue;
        };
        if previous != Some(label) {
            events.push(BoundaryEvent {
                page: record.page,
                label: label.to_string(),
                kind: classify_label(label),
            });
        }
        previous = Some(label);
    }

    events
}

fn derive_boundary(records: &[FooterRecord], last_page: u32) -> StructuralBoundary {
    let mut pre_pages = Vec::new();
    let mut post_pages = Vec::new();

    for record in records {
        let Some(label) = record.section_label.as_deref() else {
            continue;
        };
        match classify_label(label) {
            SectionKind::PreBody => pre_pages.push(record.page),
            SectionKind::PostBody => post_pages.push(record.page),
            SectionKind::Chapter | SectionKind::Unclassified => {}
        }
    }

    let pre_body_range = match (pre_pages.iter().min(), pre_pages.iter().max()) {
        (Some(&min), Some(&max)) => Some((min, max)),
        _ => None,
    };
    let post_body_start = post_pages.iter().min().copied();

    // Running footers repeat; a label seen before does not open a new chapter
    let mut seen = HashSet::new();
    let starts: Vec<(u32, String)> = boundary_events(records)
        .into_iter()
        .filter(|e| e.kind == SectionKind::Chapter)
        .filter(|e| seen.insert(e.label.clone()))
        .map(|e| (e.page, e.label))
        .collect();

    let chapters = starts
        .iter()
        .enumerate()
        .map(|(index, (start, title))| {
            let end_page = match starts.get(index + 1) {
                Some((next_start, _)) => next_start - 1,
                None => match post_body_start {
                    Some(post) if post > *start => post - 1,
                    _ => last_page.max(*start),
                },
            };

            ChapterBoundary {
                order_index: index,
                title: Some(title.clone()),
                start_page: *start,
                end_page,
            }
        })
        .collect();

    StructuralBoundary {
        pre_body_range,
        post_body_start,
        chapters,
    }
}
