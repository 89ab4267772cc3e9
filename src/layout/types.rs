//! Layout types
//!
//! Normalized elements and the virtual pages built from them. Serialized in
//! camelCase for downstream consumers.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in normalized page coordinates
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
    pub width: f64,
    pub height: f64,
}

impl BBox {
    pub fn from_corners(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self {
            x0,
            y0,
            x1,
            y1,
            width: x1 - x0,
            height: y1 - y0,
        }
    }
}

/// Plain-text element derived from one raw service element
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredElement {
    pub id: u64,
    /// Page of the scanned original, 0-based as returned by the service
    pub original_page: u32,
    pub text: String,
    pub category: String,
    pub font_size: f64,
    pub bbox: BBox,
}

/// Half of a duplex scan
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Left,
    Right,
}

/// One logical book page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualPage {
    /// Global 1-based number, strictly increasing
    pub page_number: u32,
    pub original_page: u32,
    pub side: Side,
    /// Elements in reading order
    pub elements: Vec<StructuredElement>,
    pub raw_text: String,
}

/// Split document handed to downstream consumers
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedDocument {
    pub pages: Vec<VirtualPage>,
    pub total_pages: usize,
    pub total_elements: usize,
    /// Distinct original pages that produced at least one virtual page
    pub original_pages: usize,
    /// Whether any original page produced both a left and a right page
    pub split_applied: bool,
    /// Caller's split request, recorded as given
    pub force_split: bool,
}
