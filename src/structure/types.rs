//! Structure types

use serde::{Deserialize, Serialize};

use crate::config::LayoutConfig;

/// Element category the service assigns to running footers
pub const FOOTER_CATEGORY: &str = "footer";

/// Boundary detector tuning
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundaryConfig {
    /// Footer elements must start below this fraction of the page height
    pub footer_threshold: f64,
}

impl Default for BoundaryConfig {
    fn default() -> Self {
        Self {
            footer_threshold: 0.85,
        }
    }
}

impl From<&LayoutConfig> for BoundaryConfig {
    fn from(config: &LayoutConfig) -> Self {
        Self {
            footer_threshold: config.footer_threshold,
        }
    }
}

/// What a virtual page's footer says about it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FooterRecord {
    /// Virtual page number
    pub page: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section_label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub printed_page_number: Option<u32>,
}

/// Classification of a footer section label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SectionKind {
    /// Front matter: preface, foreword, dedication, ...
    PreBody,
    /// Back matter: epilogue, appendix, index, ...
    PostBody,
    Chapter,
    /// No hint; body continuation
    Unclassified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterBoundary {
    /// 0-based position in reading order
    pub order_index: usize,
    pub title: Option<String>,
    pub start_page: u32,
    /// Inclusive
    pub end_page: u32,
}

/// Inferred book skeleton; advisory only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuralBoundary {
    /// Inclusive `[first, last]` front-matter pages
    pub pre_body_range: Option<(u32, u32)>,
    pub post_body_start: Option<u32>,
    pub chapters: Vec<ChapterBoundary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageText {
    pub page_number: u32,
    pub text: String,
}

/// All text of one chapter, page by page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterTextBundle {
    pub order_index: usize,
    /// 1-based, for display
    pub chapter_number: usize,
    pub title: String,
    pub start_page: u32,
    pub end_page: u32,
    pub pages: Vec<PageText>,
}

impl ChapterTextBundle {
    /// Page texts joined with blank lines
    pub fn full_text(&self) -> String {
        self.pages
            .iter()
            .map(|p| p.text.as_str())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// A chapter whose range matched no virtual page
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterGap {
    pub order_index: usize,
    pub title: Option<String>,
    pub start_page: u32,
    pub end_page: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assembly {
    pub bundles: Vec<ChapterTextBundle>,
    pub gaps: Vec<ChapterGap>,
}
