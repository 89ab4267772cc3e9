//! Footer extraction
//!
//! Running footers typically read like `12 | 제1장 시작`, `Chapter One · 37`
//! or, in front matter, `Preface · xii`. Tokens made only of digits are
//! printed page numbers, as are lone roman numerals (front-matter folios)
//! unless they follow a word like "Chapter" or "Part". Everything else is
//! the section label.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::layout::{StructuredElement, VirtualPage};

use super::types::{FooterRecord, FOOTER_CATEGORY};

/// Characters that separate footer tokens besides whitespace
const SEPARATORS: &[char] = &['|', '·', '•', '/', '-', '–', '—', '_', ':'];

/// Words after which a roman numeral names a section instead of a page
const NUMBERED_SECTION_WORDS: &[&str] = &["chapter", "part", "book", "section"];

/// Canonical roman numerals up to 399; `l`/`c` only so words like "mix" or "dim" stay text
static ROMAN_FOLIO_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^c{0,3}(xc|xl|l?x{0,3})(ix|iv|v?i{0,3})$").unwrap()
});

/// One record per page whose bottom region has a usable footer
pub fn extract_footer_records(pages: &[VirtualPage], footer_threshold: f64) -> Vec<FooterRecord> {
    pages
        .iter()
        .filter_map(|page| footer_record(page, footer_threshold))
        .collect()
}

fn footer_record(page: &VirtualPage, footer_threshold: f64) -> Option<FooterRecord> {
    let texts: Vec<&str> = page
        .elements
        .iter()
        .filter(|e| is_footer(e, footer_threshold))
        .map(|e| e.text.as_str())
        .collect();

    if texts.is_empty() {
        return None;
    }

    let (section_label, printed_page_number) = parse_footer_text(&texts.join(" "));
    if section_label.is_none() && printed_page_number.is_none() {
        return None;
    }

    Some(FooterRecord {
        page: page.page_number,
        section_label,
        printed_page_number,
    })
}

fn is_footer(element: &StructuredElement, footer_threshold: f64) -> bool {
    element.category.eq_ignore_ascii_case(FOOTER_CATEGORY) && element.bbox.y0 > footer_threshold
}

/// Split footer text into `(label, printed page number)`
///
/// The first arabic number wins; a roman folio is used only when there is none.
pub fn parse_footer_text(text: &str) -> (Option<String>, Option<u32>) {
    let mut number = None;
    let mut roman_number = None;
    let mut label_tokens: Vec<&str> = Vec::new();

    for token in text
        .split(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
        .filter(|t| !t.is_empty())
    {
        if token.chars().all(|c| c.is_ascii_digit()) {
            if number.is_none() {
                number = token.parse::<u32>().ok();
            }
            continue;
        }

        let names_section = label_tokens
            .last()
            .map(|prev| NUMBERED_SECTION_WORDS.contains(&prev.to_lowercase().as_str()))
            .unwrap_or(false);

        match roman_value(token) {
            Some(value) if !names_section => {
                if roman_number.is_none() {
                    roman_number = Some(value);
                }
            }
            _ => label_tokens.push(token),
        }
    }

    let label = if label_tokens.is_empty() {
        None
    } else {
        Some(label_tokens.join(" "))
    };

    (label, number.or(roman_number))
}

/// Value of a canonical lowercase or uppercase roman numeral (`i`..`cccxcix`)
pub fn roman_value(token: &str) -> Option<u32> {
    let mixed_case = token.chars().any(|c| c.is_ascii_lowercase())
        && token.chars().any(|c| c.is_ascii_uppercase());
    if mixed_case || !ROMAN_FOLIO_RE.is_match(token) {
        return None;
    }

    let digit = |c: char| match c.to_ascii_lowercase() {
        'i' => 1,
        'v' => 5,
        'x' => 10,
        'l' => 50,
        'c' => 100,
        _ => 0,
    };

    let values: Vec<u32> = token.chars().map(digit).collect();
    let mut total = 0;
    for (i, value) in values.iter().enumerate() {
        match values.get(i + 1) {
            Some(next) if next > value => total -= *value as i64,
            _ => total += *value as i64,
        }
    }
    u32::try_from(total).ok().filter(|v| *v > 0)
}
