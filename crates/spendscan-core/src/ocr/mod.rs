//! Pluggable receipt OCR adapter
//!
//! The OCR service is an external collaborator; this module only owns
//! the boundary. The pipeline treats its output as untrusted input and
//! validates it before any state mutation.
//!
//! # Architecture
//!
//! - `OcrBackend` trait: the extraction interface
//! - `OcrClient` enum: concrete wrapper providing Clone + compile-time dispatch
//! - Backend implementations: `HttpOcrBackend`, `MockOcrBackend`
//!
//! # Configuration
//!
//! Environment variables:
//! - `OCR_BACKEND`: Backend to use (http, mock). Default: http
//! - `SPENDSCAN_OCR_HOST`: OCR service URL (required for http backend)

mod http;
mod mock;

pub use http::HttpOcrBackend;
pub use mock::MockOcrBackend;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Raw extraction result from the OCR service
///
/// Field values arrive as the service read them; the pipeline parses and
/// validates (amount > 0, valid date, non-empty vendor) before use.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OcrExtraction {
    /// Full recognized text of the receipt
    pub raw_text: String,
    /// Vendor name as printed, if detected
    pub vendor: Option<String>,
    /// Total amount as a decimal string (e.g. "12.34"), if detected
    pub amount: Option<String>,
    /// Purchase date as "YYYY-MM-DD", if detected
    pub date: Option<String>,
    /// Additional structured fields (line items, tax, etc.)
    pub fields: Option<serde_json::Value>,
}

/// Whether a failed OCR call is worth retrying
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OcrFailureKind {
    /// Timeouts, 5xx, connection errors - retry with backoff
    Transient,
    /// Unsupported format, unreadable image - retrying cannot help
    Permanent,
}

/// An OCR call failure with a user-visible reason
#[derive(Debug, Clone)]
pub struct OcrFailure {
    pub kind: OcrFailureKind,
    pub reason: String,
}

impl OcrFailure {
    pub fn transient(reason: impl Into<String>) -> Self {
        Self {
            kind: OcrFailureKind::Transient,
            reason: reason.into(),
        }
    }

    pub fn permanent(reason: impl Into<String>) -> Self {
        Self {
            kind: OcrFailureKind::Permanent,
            reason: reason.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == OcrFailureKind::Transient
    }
}

impl std::fmt::Display for OcrFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.reason)
    }
}

pub type OcrResult = std::result::Result<OcrExtraction, OcrFailure>;

/// Trait defining the interface for OCR backends
#[async_trait]
pub trait OcrBackend: Send + Sync {
    /// Run OCR over a receipt image. May be slow; callers await without
    /// blocking other pipelines.
    async fn extract(&self, image_ref: &str) -> OcrResult;

    /// Check if the backend is reachable
    async fn health_check(&self) -> bool;

    /// Get the host URL (for logging)
    fn host(&self) -> &str;
}

/// Concrete OCR client enum
///
/// Provides Clone and compile-time dispatch without Box<dyn> overhead.
#[derive(Debug, Clone)]
pub enum OcrClient {
    /// HTTP OCR service backend
    Http(HttpOcrBackend),
    /// Mock backend for testing
    Mock(MockOcrBackend),
}

impl OcrClient {
    /// Create an OCR client from environment variables
    ///
    /// Fails with `Error::Adapter` when the http backend is selected
    /// but `SPENDSCAN_OCR_HOST` is not set.
    pub fn from_env() -> crate::error::Result<Self> {
        let backend = std::env::var("OCR_BACKEND").unwrap_or_else(|_| "http".to_string());

        match backend.to_lowercase().as_str() {
            "mock" => Ok(OcrClient::Mock(MockOcrBackend::new())),
            other => {
                if other != "http" {
                    tracing::warn!(backend = %backend, "Unknown OCR_BACKEND, falling back to http");
                }
                HttpOcrBackend::from_env()
                    .map(OcrClient::Http)
                    .ok_or_else(|| {
                        crate::error::Error::Adapter(
                            "SPENDSCAN_OCR_HOST is not set; no OCR service to call".to_string(),
                        )
                    })
            }
        }
    }

    /// Create an HTTP backend directly
    pub fn http(host: &str) -> Self {
        OcrClient::Http(HttpOcrBackend::new(host))
    }

    /// Create a mock backend for testing
    pub fn mock() -> Self {
        OcrClient::Mock(MockOcrBackend::new())
    }
}

#[async_trait]
impl OcrBackend for OcrClient {
    async fn extract(&self, image_ref: &str) -> OcrResult {
        match self {
            OcrClient::Http(b) => b.extract(image_ref).await,
            OcrClient::Mock(b) => b.extract(image_ref).await,
        }
    }

    async fn health_check(&self) -> bool {
        match self {
            OcrClient::Http(b) => b.health_check().await,
            OcrClient::Mock(b) => b.health_check().await,
        }
    }

    fn host(&self) -> &str {
        match self {
            OcrClient::Http(b) => b.host(),
            OcrClient::Mock(b) => b.host(),
        }
    }
}
