//! Parse-service wire types and orchestrator results
//!
//! The service response is loosely shaped and evolves upstream, so every
//! field is optional, explicit `null`s fall back to defaults and unknown
//! fields are ignored.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::error::ParseError;

// ============================================================================
// Wire Types
// ============================================================================

/// Key of the provenance summary stored in cached payloads
pub const INGEST_SUMMARY_KEY: &str = "_ingest";

/// Full response body of one parse call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParseResponse {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub api: Option<String>,

    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    #[serde(default, deserialize_with = "null_default")]
    pub usage: Usage,

    #[serde(default, deserialize_with = "null_default")]
    pub content: MarkupContent,

    #[serde(default, deserialize_with = "null_default")]
    pub elements: Vec<RawElement>,

    /// Provenance we add before caching; never sent by the service
    #[serde(default, rename = "_ingest", skip_serializing_if = "Option::is_none")]
    pub ingest: Option<IngestSummary>,
}

impl ParseResponse {
    /// Decode a raw JSON payload
    pub fn from_value(value: Value) -> Result<Self, ParseError> {
        serde_json::from_value(value).map_err(|e| ParseError::Decode(e.to_string()))
    }

    /// Highest element page number, if any element carries one
    pub fn max_page(&self) -> Option<u32> {
        self.elements.iter().map(|e| e.page).max()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pages: Option<usize>,
}

/// Markup variants the service may return for a document or element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarkupContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub markdown: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl MarkupContent {
    /// Preferred markup: HTML, then markdown, then plain text
    pub fn markup(&self) -> Option<&str> {
        self.html
            .as_deref()
            .or(self.markdown.as_deref())
            .or(self.text.as_deref())
    }
}

/// Normalized point (0..1 on both axes, origin top-left)
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    #[serde(default, deserialize_with = "null_default")]
    pub x: f64,
    #[serde(default, deserialize_with = "null_default")]
    pub y: f64,
}

/// One layout element as returned by the service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawElement {
    #[serde(default, deserialize_with = "lenient_number")]
    pub id: u64,

    /// Page number within the submitted document
    #[serde(default, deserialize_with = "lenient_number")]
    pub page: u32,

    #[serde(default, deserialize_with = "null_default")]
    pub category: String,

    #[serde(default, deserialize_with = "null_default")]
    pub coordinates: Vec<Point>,

    #[serde(default, deserialize_with = "null_default")]
    pub content: MarkupContent,
}

/// How a merged result was produced
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub total_pages_expected: Option<usize>,
    pub total_pages_parsed: usize,
    pub chunked: bool,
    pub chunk_count: usize,
}

fn null_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accept strings or numbers (e.g. `"api": 2.0`) as text
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => Some(s),
        Some(Value::Null) | None => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Accept integers, integral floats (`1.0`) and numeric strings (`"1"`);
/// anything else falls back to the default
fn lenient_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + TryFrom<u64>,
{
    let raw = match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_u64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Some(Value::String(s)) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    Ok(raw.and_then(|n| T::try_from(n).ok()).unwrap_or_default())
}

// ============================================================================
// Chunking
// ============================================================================

/// Contiguous page range dispatched as one call (0-based, end exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkJob {
    pub index: usize,
    pub start_page: usize,
    pub end_page: usize,
}

impl ChunkJob {
    pub fn page_count(&self) -> usize {
        self.end_page.saturating_sub(self.start_page)
    }
}

/// Split `total_pages` into `ceil(total / chunk_size)` contiguous jobs
pub fn plan_chunks(total_pages: usize, chunk_size: usize) -> Vec<ChunkJob> {
    let chunk_size = chunk_size.max(1);
    (0..total_pages)
        .step_by(chunk_size)
        .enumerate()
        .map(|(index, start_page)| ChunkJob {
            index,
            start_page,
            end_page: (start_page + chunk_size).min(total_pages),
        })
        .collect()
}

/// A chunk that parsed successfully
#[derive(Debug, Clone)]
pub struct ChunkResult {
    pub job: ChunkJob,
    pub response: ParseResponse,
    pub attempts: u32,
}

/// A chunk dropped from the merged result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChunkFailure {
    pub job: ChunkJob,
    pub attempts: u32,
    pub error: String,
    /// Whether the last error was retryable (rate limit or network)
    pub retryable: bool,
    /// The chunk never reached the service because page extraction failed
    pub extraction_failed: bool,
}

impl ChunkFailure {
    pub fn new(job: ChunkJob, attempts: u32, error: &ParseError) -> Self {
        Self {
            job,
            attempts,
            error: error.to_string(),
            retryable: error.is_retryable(),
            extraction_failed: error.is_extraction(),
        }
    }
}

// ============================================================================
// Orchestrator Output
// ============================================================================

/// Merged parse result of a whole document, before normalization
#[derive(Debug, Clone, Default)]
pub struct RawDocument {
    pub api: Option<String>,
    pub model: Option<String>,
    pub elements: Vec<RawElement>,
    /// Page count from the probe (or the service when the probe failed)
    pub total_pages_expected: Option<usize>,
    pub total_pages_parsed: usize,
    pub chunked: bool,
    pub chunk_count: usize,
    pub failed_chunks: Vec<ChunkFailure>,
}

impl RawDocument {
    /// Build from a single whole-document response
    pub fn from_single(response: ParseResponse, probed_pages: Option<usize>) -> Self {
        let parsed = response
            .usage
            .pages
            .or_else(|| response.max_page().map(|p| p as usize))
            .unwrap_or(0);

        Self {
            api: response.api,
            model: response.model,
            elements: response.elements,
            total_pages_expected: probed_pages.or(Some(parsed)),
            total_pages_parsed: parsed,
            chunked: false,
            chunk_count: 1,
            failed_chunks: Vec::new(),
        }
    }

    /// Rebuild from a cached payload
    pub fn from_payload(payload: Value) -> Result<Self, ParseError> {
        let response = ParseResponse::from_value(payload)?;
        match response.ingest.clone() {
            Some(summary) => Ok(Self {
                api: response.api,
                model: response.model,
                elements: response.elements,
                total_pages_expected: summary.total_pages_expected,
                total_pages_parsed: summary.total_pages_parsed,
                chunked: summary.chunked,
                chunk_count: summary.chunk_count,
                failed_chunks: Vec::new(),
            }),
            None => Ok(Self::from_single(response, None)),
        }
    }

    /// How this document was produced, for storing next to its payload
    pub fn summary(&self) -> IngestSummary {
        IngestSummary {
            total_pages_expected: self.total_pages_expected,
            total_pages_parsed: self.total_pages_parsed,
            chunked: self.chunked,
            chunk_count: self.chunk_count,
        }
    }

    /// Add the `_ingest` summary to a raw service payload
    pub fn annotate_payload(&self, payload: &mut Value) -> Result<(), ParseError> {
        let summary = serde_json::to_value(self.summary()).map_err(|e| ParseError::Decode(e.to_string()))?;
        if let Some(object) = payload.as_object_mut() {
            object.insert(INGEST_SUMMARY_KEY.to_string(), summary);
        }
        Ok(())
    }

    /// Serialize back into the service response shape for caching
    pub fn to_payload(&self) -> Result<Value, ParseError> {
        let response = ParseResponse {
            api: self.api.clone(),
            model: self.model.clone(),
            usage: Usage {
                pages: Some(self.total_pages_parsed),
            },
            content: MarkupContent::default(),
            elements: self.elements.clone(),
            ingest: Some(self.summary()),
        };
        serde_json::to_value(response).map_err(|e| ParseError::Decode(e.to_string()))
    }

    /// `(expected, parsed)` when they disagree
    pub fn page_mismatch(&self) -> Option<(usize, usize)> {
        match self.total_pages_expected {
            Some(expected) if expected != self.total_pages_parsed => {
                Some((expected, self.total_pages_parsed))
            }
            _ => None,
        }
    }

    pub fn is_partial(&self) -> bool {
        !self.failed_chunks.is_empty()
    }
}
