//! Element normalization
//!
//! Raw service elements carry HTML-ish markup and a polygon of normalized
//! points. This reduces each to plain text, a font size and a bounding box.
//! Malformed input degrades to defaults; nothing here fails.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::parse::{Point, RawElement};

use super::types::{BBox, StructuredElement};

/// Font size assumed when the markup carries none
pub const DEFAULT_FONT_SIZE: f64 = 12.0;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static FONT_SIZE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)font-size\s*:\s*(\d+(?:\.\d+)?)\s*px").unwrap());

/// Normalize every element, preserving order and ids
pub fn normalize(elements: &[RawElement]) -> Vec<StructuredElement> {
    elements.iter().map(normalize_element).collect()
}

pub fn normalize_element(element: &RawElement) -> StructuredElement {
    let markup = element.content.markup().unwrap_or("");

    StructuredElement {
        id: element.id,
        original_page: element.page,
        text: markup_to_text(markup),
        category: element.category.clone(),
        font_size: font_size(markup),
        bbox: bounding_box(&element.coordinates),
    }
}

/// Strip tags, decode entities, collapse whitespace
pub fn markup_to_text(markup: &str) -> String {
    if markup.is_empty() {
        return String::new();
    }

    // Tags become spaces so adjacent cells don't run together
    let stripped = TAG_RE.replace_all(markup, " ");
    let decoded = html_escape::decode_html_entities(&stripped);
    WHITESPACE_RE.replace_all(decoded.trim(), " ").into_owned()
}

/// First `font-size:<N>px` in the markup
pub fn font_size(markup: &str) -> f64 {
    FONT_SIZE_RE
        .captures(markup)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .filter(|size| size.is_finite() && *size > 0.0)
        .unwrap_or(DEFAULT_FONT_SIZE)
}

/// Min/max over the points; zero rect for an empty list
pub fn bounding_box(points: &[Point]) -> BBox {
    let Some(first) = points.first() else {
        return BBox::default();
    };

    let (mut x0, mut y0, mut x1, mut y1) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        x0 = x0.min(p.x);
        y0 = y0.min(p.y);
        x1 = x1.max(p.x);
        y1 = y1.max(p.y);
    }

    BBox::from_corners(x0, y0, x1, y1)
}
