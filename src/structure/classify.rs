//! Footer label classification
//!
//! Case-insensitive keyword matching over Korean and English section names.
//! Checked in priority order: front matter, back matter, chapter markers.

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::SectionKind;

const PRE_BODY_KEYWORDS: &[&str] = &[
    "서문",
    "머리말",
    "머리글",
    "프롤로그",
    "들어가며",
    "들어가는 글",
    "추천사",
    "추천의 글",
    "감사의 글",
    "헌사",
    "저자",
    "지은이",
    "옮긴이",
    "preface",
    "foreword",
    "prologue",
    "acknowledg",
    "dedication",
    "author",
];

const POST_BODY_KEYWORDS: &[&str] = &[
    "에필로그",
    "맺음말",
    "나가며",
    "나오며",
    "후기",
    "부록",
    "주석",
    "미주",
    "참고문헌",
    "참고 문헌",
    "찾아보기",
    "색인",
    "용어",
    "epilogue",
    "afterword",
    "appendix",
    "endnote",
    "notes",
    "index",
    "glossary",
    "bibliography",
    "references",
];

const CHAPTER_KEYWORDS: &[&str] = &["챕터", "chapter"];

/// Numbered chapter or part markers: 제1장, 3장, 제2부, Part II
///
/// A bare roman numeral is not a marker; in footers it is a front-matter folio.
static CHAPTER_MARKER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        제\s*[0-9一二三四五六七八九十]+\s*[장부편]
        | [0-9]+\s*[장부]
        | \bpart\b
        ",
    )
    .unwrap()
});

/// Classify a footer section label
pub fn classify_label(label: &str) -> SectionKind {
    let lowered = label.trim().to_lowercase();
    if lowered.is_empty() {
        return SectionKind::Unclassified;
    }

    if contains_any(&lowered, PRE_BODY_KEYWORDS) {
        SectionKind::PreBody
    } else if contains_any(&lowered, POST_BODY_KEYWORDS) {
        SectionKind::PostBody
    } else if contains_any(&lowered, CHAPTER_KEYWORDS) || CHAPTER_MARKER_RE.is_match(&lowered) {
        SectionKind::Chapter
    } else {
        SectionKind::Unclassified
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| text.contains(k))
}
