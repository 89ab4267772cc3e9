//! Duplex page splitting
//!
//! Scans of open books hold two pages side by side. Each original page's
//! elements are partitioned at a fixed centerline into a left and a right
//! virtual page, then numbered with a single global counter.
//!
//! A side without elements produces no page. Single-page scans therefore
//! degrade to a 1:1 mapping on their own.

use std::collections::BTreeMap;

use crate::config::LayoutConfig;

use super::types::{ParsedDocument, Side, StructuredElement, VirtualPage};

/// Splitter geometry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SplitConfig {
    /// Elements with `x0` below this go left
    pub centerline: f64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { centerline: 0.5 }
    }
}

impl From<&LayoutConfig> for SplitConfig {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            centerline: config.centerline,
        }
    }
}

/// Partition elements into numbered virtual pages
///
/// `force_split` is accepted for callers that distinguish duplex from
/// single-page scans, but the centerline partition applies either way.
pub fn split_pages(
    elements: &[StructuredElement],
    force_split: bool,
    config: &SplitConfig,
) -> Vec<VirtualPage> {
    let mut by_page: BTreeMap<u32, Vec<&StructuredElement>> = BTreeMap::new();
    for element in elements {
        by_page.entry(element.original_page).or_default().push(element);
    }

    let mut pages = Vec::with_capacity(by_page.len() * 2);
    let mut next_number: u32 = 1;

    for (original_page, page_elements) in by_page {
        let (left, right): (Vec<_>, Vec<_>) = page_elements
            .into_iter()
            .partition(|e| e.bbox.x0 < config.centerline);

        for (side, side_elements) in [(Side::Left, left), (Side::Right, right)] {
            if side_elements.is_empty() {
                continue;
            }
            pages.push(virtual_page(next_number, original_page, side, side_elements));
            next_number += 1;
        }
    }

    tracing::debug!(
        elements = elements.len(),
        virtual_pages = pages.len(),
        force_split = force_split,
        centerline = config.centerline,
        "Split pages"
    );

    pages
}

fn virtual_page(
    page_number: u32,
    original_page: u32,
    side: Side,
    mut elements: Vec<&StructuredElement>,
) -> VirtualPage {
    // Reading order: top to bottom, then left to right
    elements.sort_by(|a, b| {
        a.bbox
            .y0
            .total_cmp(&b.bbox.y0)
            .then(a.bbox.x0.total_cmp(&b.bbox.x0))
    });

    let raw_text = elements
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");

    VirtualPage {
        page_number,
        original_page,
        side,
        elements: elements.into_iter().cloned().collect(),
        raw_text,
    }
}

/// Wrap split pages with document-level counts
pub fn build_document(pages: Vec<VirtualPage>, force_split: bool) -> ParsedDocument {
    let total_elements = pages.iter().map(|p| p.elements.len()).sum();

    let mut sides_per_original: BTreeMap<u32, usize> = BTreeMap::new();
    for page in &pages {
        *sides_per_original.entry(page.original_page).or_default() += 1;
    }

    ParsedDocument {
        total_pages: pages.len(),
        total_elements,
        original_pages: sides_per_original.len(),
        split_applied: sides_per_original.values().any(|&sides| sides > 1),
        force_split,
        pages,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::types::BBox;

    fn element(id: u64, page: u32, x0: f64, y0: f64, text: &str) -> StructuredElement {
        StructuredElement {
            id,
            original_page: page,
            text: text.to_string(),
            category: "paragraph".into(),
            font_size: 12.0,
            bbox: BBox::from_corners(x0, y0, x0 + 0.1, y0 + 0.05),
        }
    }

    #[test]
    fn test_single_left_element_gives_one_left_page() {
        let pages = split_pages(&[element(0, 1, 0.3, 0.2, "a")], false, &SplitConfig::default());

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].side, Side::Left);
        assert_eq!(pages[0].page_number, 1);
    }

    #[test]
    fn test_right_element_adds_second_page() {
        let elements = [element(0, 1, 0.3, 0.2, "a"), element(1, 1, 0.7, 0.2, "b")];
        let pages = split_pages(&elements, false, &SplitConfig::default());

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].side, Side::Right);
        assert_eq!(pages[1].page_number, 2);
        assert_eq!(pages[1].raw_text, "b");
    }

    #[test]
    fn test_reading_order_within_side() {
        let elements = [
            element(0, 0, 0.30, 0.50, "third"),
            element(1, 0, 0.20, 0.10, "second"),
            element(2, 0, 0.05, 0.10, "first"),
        ];
        let pages = split_pages(&elements, true, &SplitConfig::default());

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].raw_text, "first second third");
        let ids: Vec<u64> = pages[0].elements.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1, 0]);
    }

    #[test]
    fn test_raw_text_joins_every_element_with_one_space() {
        let elements = [
            element(0, 0, 0.05, 0.10, "top"),
            element(1, 0, 0.05, 0.20, ""),
            element(2, 0, 0.05, 0.30, "bottom"),
        ];
        let pages = split_pages(&elements, false, &SplitConfig::default());

        // Empty texts still take a slot in the join
        assert_eq!(pages[0].raw_text, "top  bottom");
        assert_eq!(pages[0].elements.len(), 3);
    }

    #[test]
    fn test_sides_partition_every_page() {
        let elements: Vec<StructuredElement> = (0..40)
            .map(|i| element(i, (i % 7) as u32, (i % 10) as f64 / 10.0, 0.1, "t"))
            .collect();
        let pages = split_pages(&elements, false, &SplitConfig::default());

        for original in 0..7u32 {
            let on_page = elements.iter().filter(|e| e.original_page == original).count();
            let split: usize = pages
                .iter()
                .filter(|p| p.original_page == original)
                .map(|p| p.elements.len())
                .sum();
            assert_eq!(on_page, split);
        }

        // Numbers are consecutive from 1
        for (i, page) in pages.iter().enumerate() {
            assert_eq!(page.page_number, i as u32 + 1);
        }
    }

    #[test]
    fn test_empty_side_is_skipped_and_order_is_by_original_page() {
        let elements = [
            element(0, 5, 0.6, 0.1, "p5 right"),
            element(1, 2, 0.1, 0.1, "p2 left"),
            element(2, 2, 0.8, 0.1, "p2 right"),
        ];
        let pages = split_pages(&elements, false, &SplitConfig::default());

        let layout: Vec<(u32, u32, Side)> = pages
            .iter()
            .map(|p| (p.page_number, p.original_page, p.side))
            .collect();
        assert_eq!(
            layout,
            vec![(1, 2, Side::Left), (2, 2, Side::Right), (3, 5, Side::Right)]
        );
    }

    #[test]
    fn test_custom_centerline() {
        let config = SplitConfig { centerline: 0.2 };
        let pages = split_pages(&[element(0, 0, 0.3, 0.1, "x")], false, &config);
        assert_eq!(pages[0].side, Side::Right);
    }

    #[test]
    fn test_build_document_counts() {
        let elements = [
            element(0, 0, 0.1, 0.1, "a"),
            element(1, 0, 0.6, 0.1, "b"),
            element(2, 1, 0.1, 0.1, "c"),
        ];
        let document = build_document(split_pages(&elements, true, &SplitConfig::default()), true);

        assert_eq!(document.total_pages, 3);
        assert_eq!(document.total_elements, 3);
        assert_eq!(document.original_pages, 2);
        assert!(document.split_applied);
        assert!(document.force_split);

        let single = build_document(
            split_pages(&[element(0, 0, 0.1, 0.1, "a")], false, &SplitConfig::default()),
            false,
        );
        assert!(!single.split_applied);
    }

    #[test]
    fn test_empty_input() {
        let document = build_document(split_pages(&[], false, &SplitConfig::default()), false);
        assert_eq!(document.total_pages, 0);
        assert_eq!(document.original_pages, 0);
    }
}
