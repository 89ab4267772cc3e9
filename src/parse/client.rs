//! Layout parsing service client
//!
//! Defines the service seam and the HTTP implementation used in production.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde_json::Value;

use crate::config::ServiceConfig;

use super::error::ParseError;

/// Longest error body kept in error messages
const MAX_ERROR_BODY: usize = 512;

/// Layout parsing service
///
/// Returns the raw JSON body so it can be cached verbatim; decoding into
/// typed elements happens in the orchestrator.
#[async_trait]
pub trait ParseService: Send + Sync {
    /// Parse one (sub-)document
    async fn parse_document(&self, file_name: &str, data: Vec<u8>) -> Result<Value, ParseError>;
}

/// HTTP client for the document-parse endpoint
pub struct LayoutParseClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

impl LayoutParseClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ParseError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ParseError::Request(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn form(&self, file_name: &str, data: Vec<u8>) -> Result<Form, ParseError> {
        let document = Part::bytes(data)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")
            .map_err(|e| ParseError::Request(e.to_string()))?;

        Ok(Form::new()
            .part("document", document)
            .text("ocr", "force")
            .text("base64_encoding", "['table']")
            .text("model", self.model.clone()))
    }
}

#[async_trait]
impl ParseService for LayoutParseClient {
    async fn parse_document(&self, file_name: &str, data: Vec<u8>) -> Result<Value, ParseError> {
        let bytes = data.len();
        let form = self.form(file_name, data)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ParseError::RateLimited { retry_after });
        }

        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            truncate_utf8(&mut body, MAX_ERROR_BODY);
            return Err(ParseError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| ParseError::Decode(e.to_string()))?;

        let elements = element_count(&payload);
        tracing::debug!(
            file_name = %file_name,
            request_bytes = bytes,
            elements = elements,
            "Parse service responded"
        );

        Ok(payload)
    }
}

/// Length of the top-level `elements` array, zero when absent
fn element_count(payload: &Value) -> usize {
    payload
        .get("elements")
        .and_then(serde_json::Value::as_array)
        .map(Vec::len)
        .unwrap_or(0)
}

fn truncate_utf8(text: &mut String, max: usize) {
    if text.len() <= max {
        return;
    }
    let mut cut = max;
    while !text.is_char_boundary(cut) {
        cut -= 1;
    }
    text.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_trims_endpoint() {
        let config = ServiceConfig {
            endpoint: "https://parse.example.com/v1/document/".into(),
            api_key: "key".into(),
            model: "document-parse".into(),
        };
        let client = LayoutParseClient::new(&config).unwrap();
        assert_eq!(client.endpoint, "https://parse.example.com/v1/document");
        assert_eq!(client.model, "document-parse");
    }

    #[test]
    fn test_element_count() {
        let payload = serde_json::json!({ "api": "2.0", "elements": [{ "id": 0 }, { "id": 1 }] });
        assert_eq!(element_count(&payload), 2);
        assert_eq!(element_count(&serde_json::json!({ "elements": null })), 0);
        assert_eq!(element_count(&serde_json::json!({})), 0);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let mut text = "가나다라".to_string(); // 3 bytes per char
        truncate_utf8(&mut text, 4);
        assert_eq!(text, "가");

        let mut short = "ok".to_string();
        truncate_utf8(&mut short, 10);
        assert_eq!(short, "ok");
    }
}
