//! HTTP OCR service backend
//!
//! POSTs the receipt to `{host}/v1/extract` and maps the response onto
//! `OcrExtraction`. When the image ref points at a readable local file,
//! the bytes are inlined base64 so the service never needs access to the
//! image store.

use base64::Engine;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{OcrBackend, OcrExtraction, OcrFailure, OcrResult};
use async_trait::async_trait;

/// Backend for a self-hosted OCR/vision service speaking a small JSON API
#[derive(Debug, Clone)]
pub struct HttpOcrBackend {
    http_client: Client,
    base_url: String,
}

impl HttpOcrBackend {
    /// Create a new HTTP OCR backend
    pub fn new(base_url: &str) -> Self {
        Self {
            http_client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Create from environment variables
    pub fn from_env() -> Option<Self> {
        let host = std::env::var("SPENDSCAN_OCR_HOST").ok()?;
        Some(Self::new(&host))
    }
}

/// Request to the OCR service
#[derive(Debug, Serialize)]
struct ExtractRequest {
    /// Opaque reference into the image store
    image_ref: String,
    /// Base64 image bytes when the ref resolved locally
    #[serde(skip_serializing_if = "Option::is_none")]
    image_data: Option<String>,
}

/// Response from the OCR service
#[derive(Debug, Deserialize)]
struct ExtractResponse {
    raw_text: String,
    vendor: Option<String>,
    amount: Option<String>,
    date: Option<String>,
    fields: Option<serde_json::Value>,
}

#[async_trait]
impl OcrBackend for HttpOcrBackend {
    async fn extract(&self, image_ref: &str) -> OcrResult {
        let image_data = match std::fs::read(image_ref) {
            Ok(bytes) => Some(base64::engine::general_purpose::STANDARD.encode(bytes)),
            Err(_) => None, // remote ref; let the service resolve it
        };

        let request = ExtractRequest {
            image_ref: image_ref.to_string(),
            image_data,
        };

        debug!(image_ref = %image_ref, host = %self.base_url, "OCR extract call");

        let response = self
            .http_client
            .post(format!("{}/v1/extract", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                warn!(error = %e, "OCR service unreachable");
                OcrFailure::transient(format!("OCR service unreachable: {}", e))
            })?;

        match response.status() {
            status if status.is_success() => {}
            StatusCode::UNPROCESSABLE_ENTITY | StatusCode::UNSUPPORTED_MEDIA_TYPE => {
                return Err(OcrFailure::permanent(format!(
                    "OCR service rejected image: {}",
                    response.status()
                )));
            }
            status if status.is_client_error() => {
                return Err(OcrFailure::permanent(format!(
                    "OCR request rejected: {}",
                    status
                )));
            }
            status => {
                return Err(OcrFailure::transient(format!(
                    "OCR service error: {}",
                    status
                )));
            }
        }

        let body: ExtractResponse = response
            .json()
            .await
            .map_err(|e| OcrFailure::transient(format!("Malformed OCR response: {}", e)))?;

        Ok(OcrExtraction {
            raw_text: body.raw_text,
            vendor: body.vendor,
            amount: body.amount,
            date: body.date,
            fields: body.fields,
        })
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(format!("{}/health", self.base_url))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn host(&self) -> &str {
        &self.base_url
    }
}
