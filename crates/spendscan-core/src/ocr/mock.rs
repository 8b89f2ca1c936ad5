//! Mock OCR backend for testing
//!
//! Returns canned extractions and scripted failures without a running
//! OCR service. Useful for unit tests and pipeline development.

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{OcrBackend, OcrExtraction, OcrFailure, OcrResult};

/// Mock OCR backend
///
/// Scripted responses are keyed by image ref and consumed in order, so a
/// test can stage "two transient failures, then success". Unscripted
/// refs get a predictable extraction derived from the ref itself.
#[derive(Debug, Clone, Default)]
pub struct MockOcrBackend {
    scripts: Arc<Mutex<HashMap<String, VecDeque<OcrResult>>>>,
    /// Whether health_check should return true
    pub healthy: bool,
}

impl MockOcrBackend {
    /// Create a new mock backend (healthy by default)
    pub fn new() -> Self {
        Self {
            scripts: Arc::new(Mutex::new(HashMap::new())),
            healthy: true,
        }
    }

    /// Queue a response for an image ref. Responses are consumed in FIFO
    /// order; once the queue drains the unscripted fallback applies.
    pub fn script(&self, image_ref: &str, result: OcrResult) {
        let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
        scripts
            .entry(image_ref.to_string())
            .or_default()
            .push_back(result);
    }

    /// Convenience: queue a successful extraction
    pub fn script_extraction(
        &self,
        image_ref: &str,
        vendor: &str,
        amount: &str,
        date: &str,
    ) {
        self.script(
            image_ref,
            Ok(OcrExtraction {
                raw_text: format!("{}\nTOTAL {}\n{}", vendor, amount, date),
                vendor: Some(vendor.to_string()),
                amount: Some(amount.to_string()),
                date: Some(date.to_string()),
                fields: None,
            }),
        );
    }

    /// Convenience: queue a transient failure
    pub fn script_transient_failure(&self, image_ref: &str, reason: &str) {
        self.script(image_ref, Err(OcrFailure::transient(reason)));
    }

    /// Convenience: queue a permanent failure
    pub fn script_permanent_failure(&self, image_ref: &str, reason: &str) {
        self.script(image_ref, Err(OcrFailure::permanent(reason)));
    }
}

#[async_trait]
impl OcrBackend for MockOcrBackend {
    async fn extract(&self, image_ref: &str) -> OcrResult {
        let scripted = {
            let mut scripts = self.scripts.lock().unwrap_or_else(|e| e.into_inner());
            scripts.get_mut(image_ref).and_then(|q| q.pop_front())
        };
        if let Some(result) = scripted {
            return result;
        }

        // Unscripted fallback: a deterministic receipt derived from the ref
        let vendor = match image_ref.to_uppercase() {
            r if r.contains("STARBUCKS") => "STARBUCKS #4521",
            r if r.contains("AMAZON") => "AMAZON.COM",
            r if r.contains("WHOLEFOODS") || r.contains("WHOLE_FOODS") => "WHOLE FOODS MARKET",
            r if r.contains("SHELL") => "SHELL OIL",
            _ => "ACME STORE",
        };

        Ok(OcrExtraction {
            raw_text: format!("{}\nTOTAL 9.99\n2024-01-15", vendor),
            vendor: Some(vendor.to_string()),
            amount: Some("9.99".to_string()),
            date: Some("2024-01-15".to_string()),
            fields: None,
        })
    }

    async fn health_check(&self) -> bool {
        self.healthy
    }

    fn host(&self) -> &str {
        "mock://localhost"
    }
}
