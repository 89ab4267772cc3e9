//! Page layout
//!
//! Normalizes raw service elements and splits duplex scans into virtual
//! pages. Everything here is pure and synchronous.

mod normalize;
mod split;
mod types;

pub use normalize::{bounding_box, font_size, markup_to_text, normalize, normalize_element, DEFAULT_FONT_SIZE};
pub use split::{build_document, split_pages, SplitConfig};
pub use types::{BBox, ParsedDocument, Side, StructuredElement, VirtualPage};
