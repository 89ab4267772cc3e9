//! Chapter text assembly

use crate::layout::VirtualPage;

use super::types::{Assembly, ChapterGap, ChapterTextBundle, PageText, StructuralBoundary};

/// Collect each chapter's pages; chapters matching no page become gaps
pub fn assemble(pages: &[VirtualPage], boundary: &StructuralBoundary) -> Assembly {
    let mut chapters: Vec<_> = boundary.chapters.iter().collect();
    chapters.sort_by_key(|c| c.order_index);

    let mut assembly = Assembly::default();

    for chapter in chapters {
        let mut chapter_pages: Vec<PageText> = pages
            .iter()
            .filter(|p| (chapter.start_page..=chapter.end_page).contains(&p.page_number))
            .map(|p| PageText {
                page_number: p.page_number,
                text: p.raw_text.clone(),
            })
            .collect();
        chapter_pages.sort_by_key(|p| p.page_number);

        if chapter_pages.is_empty() {
            tracing::warn!(
                order_index = chapter.order_index,
                start_page = chapter.start_page,
                end_page = chapter.end_page,
                "Chapter range matched no pages"
            );
            assembly.gaps.push(ChapterGap {
                order_index: chapter.order_index,
                title: chapter.title.clone(),
                start_page: chapter.start_page,
                end_page: chapter.end_page,
            });
            continue;
        }

        let chapter_number = chapter.order_index + 1;
        assembly.bundles.push(ChapterTextBundle {
            order_index: chapter.order_index,
            chapter_number,
            title: chapter
                .title
                .clone()
                .unwrap_or_else(|| format!("Chapter {}", chapter_number)),
            start_page: chapter.start_page,
            end_page: chapter.end_page,
            pages: chapter_pages,
        });
    }

    assembly
}
