//! Book structure inference
//!
//! - `footer`: section labels and printed page numbers from running footers
//! - `classify`: label to front matter / back matter / chapter
//! - `boundary`: chapter ranges from label changes
//! - `assemble`: per-chapter text bundles

mod assemble;
mod boundary;
mod classify;
mod footer;
mod types;

pub use assemble::assemble;
pub use boundary::{analyze, boundary_events, BoundaryEvent};
pub use classify::classify_label;
pub use footer::{extract_footer_records, parse_footer_text};
pub use types::{
    Assembly, BoundaryConfig, ChapterBoundary, ChapterGap, ChapterTextBundle, FooterRecord,
    PageText, SectionKind, StructuralBoundary, FOOTER_CATEGORY,
};
