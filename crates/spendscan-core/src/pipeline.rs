//! Receipt processing pipeline
//!
//! Owns the transaction lifecycle from upload to a reviewable
//! `classified` record:
//!
//! ```text
//! processing -> parsed -> classified -> {confirmed | corrected}
//!                  \______ error (any non-terminal state) ______/
//! ```
//!
//! Each uploaded receipt runs in its own task; pipelines for different
//! transactions never contend. Within one transaction every transition
//! is a conditional write keyed on the expected source state, so a late
//! or duplicate OCR result is discarded as a no-op instead of clobbering
//! later stages. A pending OCR call for a deleted transaction simply has
//! its result dropped by the same discipline.

use chrono::NaiveDate;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::classifier::Classifier;
use crate::config::CoreConfig;
use crate::confirm::ConfirmationRecorder;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::money::parse_cents;
use crate::models::{ConfirmRequest, Transaction, TransactionStatusView};
use crate::ocr::{OcrBackend, OcrClient, OcrExtraction};

/// Parsed and validated receipt fields, ready to persist
struct ParsedFields {
    /// May be empty: a vendorless receipt still classifies (to the fallback)
    vendor: String,
    amount_cents: i64,
    date: NaiveDate,
    raw_text: String,
    parsed_json: Option<String>,
}

/// Validate an OCR extraction into persistable fields.
///
/// Returns the user-visible failure reason on rejection. Zero or
/// negative amounts are parse failures, never silently accepted.
fn validate_extraction(extraction: &OcrExtraction) -> std::result::Result<ParsedFields, String> {
    if extraction.raw_text.trim().is_empty() {
        return Err("OCR returned an empty result".to_string());
    }

    let amount_str = extraction
        .amount
        .as_deref()
        .ok_or_else(|| "no amount detected on receipt".to_string())?;
    let amount_cents =
        parse_cents(amount_str).map_err(|_| format!("unparseable amount: {}", amount_str))?;
    if amount_cents <= 0 {
        return Err(format!(
            "non-positive amount on receipt: {}",
            amount_str.trim()
        ));
    }

    let date_str = extraction
        .date
        .as_deref()
        .ok_or_else(|| "no date detected on receipt".to_string())?;
    let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d")
        .map_err(|_| format!("unparseable date: {}", date_str.trim()))?;

    let parsed_json = extraction
        .fields
        .as_ref()
        .and_then(|f| serde_json::to_string(f).ok());

    Ok(ParsedFields {
        vendor: extraction.vendor.as_deref().unwrap_or("").trim().to_string(),
        amount_cents,
        date,
        raw_text: extraction.raw_text.clone(),
        parsed_json,
    })
}

/// The transaction state machine and its stage orchestration
#[derive(Clone)]
pub struct ReceiptPipeline {
    db: Database,
    ocr: OcrClient,
    classifier: Classifier,
    recorder: ConfirmationRecorder,
    config: CoreConfig,
}

impl ReceiptPipeline {
    pub fn new(db: Database, ocr: OcrClient, config: CoreConfig) -> Self {
        let classifier = Classifier::new(db.clone(), config.clone());
        let recorder = ConfirmationRecorder::new(db.clone(), config.clone());
        Self {
            db,
            ocr,
            classifier,
            recorder,
            config,
        }
    }

    /// Start the pipeline for a new receipt. Fire-and-forget: the row is
    /// created in `processing` and the stages run in a spawned task.
    pub fn upload_receipt(&self, owner_id: &str, image_ref: &str) -> Result<i64> {
        if image_ref.trim().is_empty() {
            return Err(Error::Validation("image reference must not be empty".to_string()));
        }

        let id = self
            .db
            .insert_processing_transaction(owner_id, image_ref.trim())?;
        info!(transaction = id, owner = %owner_id, "Receipt upload accepted");

        let pipeline = self.clone();
        let owner = owner_id.to_string();
        tokio::spawn(async move {
            if let Err(e) = pipeline.process(&owner, id).await {
                error!(transaction = id, error = %e, "Pipeline task failed");
            }
        });

        Ok(id)
    }

    /// Run the parse and classify stages for one transaction.
    ///
    /// Adapter failures are recovered here (retry, then settle in the
    /// `error` status); they are never propagated to the uploader. The
    /// returned error covers infrastructure faults only.
    pub async fn process(&self, owner_id: &str, id: i64) -> Result<()> {
        let tx = self.db.get_transaction(owner_id, id)?;
        let image_ref = tx.image_ref.clone().ok_or_else(|| {
            Error::Invariant(format!("transaction {} has no image reference", id))
        })?;

        let extraction = match self.run_ocr_with_retry(&image_ref).await {
            Ok(extraction) => extraction,
            Err(reason) => {
                if self.db.mark_transaction_error(owner_id, id, &reason)? {
                    warn!(transaction = id, reason = %reason, "Parse stage failed");
                }
                return Ok(());
            }
        };

        let fields = match validate_extraction(&extraction) {
            Ok(fields) => fields,
            Err(reason) => {
                if self.db.mark_transaction_error(owner_id, id, &reason)? {
                    warn!(transaction = id, reason = %reason, "Extraction rejected");
                }
                return Ok(());
            }
        };

        // processing -> parsed. A zero-row write means a duplicate or
        // late result: the transaction already moved on or was deleted.
        let advanced = self.db.apply_parsed(
            owner_id,
            id,
            &fields.vendor,
            fields.amount_cents,
            fields.date,
            &fields.raw_text,
            fields.parsed_json.as_deref(),
        )?;
        if !advanced {
            debug!(transaction = id, "Discarding stale parse result");
            return Ok(());
        }

        // parsed -> classified. Cannot fail: a missing mapping falls back.
        let suggestion = self.classifier.classify(owner_id, &fields.vendor)?;
        let advanced =
            self.db
                .apply_classified(owner_id, id, suggestion.category_id, suggestion.confidence)?;
        if advanced {
            info!(
                transaction = id,
                category = suggestion.category_id,
                confidence = suggestion.confidence,
                "Transaction classified"
            );
        } else {
            debug!(transaction = id, "Discarding stale classification");
        }

        Ok(())
    }

    /// Call the OCR adapter with bounded retry and doubling backoff.
    /// Returns the retained failure reason after exhaustion.
    async fn run_ocr_with_retry(
        &self,
        image_ref: &str,
    ) -> std::result::Result<OcrExtraction, String> {
        let mut backoff = Duration::from_millis(self.config.retry_backoff_ms);
        let mut last_reason = String::new();

        for attempt in 1..=self.config.max_parse_attempts {
            match self.ocr.extract(image_ref).await {
                Ok(extraction) => return Ok(extraction),
                Err(failure) => {
                    warn!(
                        image_ref = %image_ref,
                        attempt,
                        transient = failure.is_transient(),
                        reason = %failure.reason,
                        "OCR call failed"
                    );
                    if !failure.is_transient() {
                        return Err(failure.reason);
                    }
                    last_reason = failure.reason;
                    if attempt < self.config.max_parse_attempts {
                        tokio::time::sleep(backoff).await;
                        backoff *= 2;
                    }
                }
            }
        }

        Err(format!(
            "OCR failed after {} attempts: {}",
            self.config.max_parse_attempts, last_reason
        ))
    }

    /// Processing status for polling clients
    pub fn get_status(&self, owner_id: &str, id: i64) -> Result<TransactionStatusView> {
        let tx = self.db.get_transaction(owner_id, id)?;
        Ok(TransactionStatusView {
            status: tx.status,
            confidence: tx.confidence,
            error_reason: tx.error_reason,
        })
    }

    /// Drive the `classified -> {confirmed | corrected}` transition
    pub fn confirm(&self, owner_id: &str, id: i64, req: &ConfirmRequest) -> Result<Transaction> {
        self.recorder.confirm(owner_id, id, req)
    }

    /// Run the pipeline again for a transaction in `error`, or one
    /// stranded in `processing` after its background task was cut short
    pub async fn retry(&self, owner_id: &str, id: i64) -> Result<()> {
        let tx = self.db.get_transaction(owner_id, id)?;
        if !self.db.reenter_processing(owner_id, id)? {
            return Err(Error::Conflict(format!(
                "transaction {} is {}; only error or stalled processing can be retried",
                id, tx.status
            )));
        }
        info!(transaction = id, "Retrying transaction");
        self.process(owner_id, id).await
    }

    /// Owner-initiated deletion. Any in-flight OCR result for this row is
    /// later discarded by the conditional writes.
    pub fn delete(&self, owner_id: &str, id: i64) -> Result<()> {
        self.db.delete_transaction(owner_id, id)?;
        info!(transaction = id, "Transaction deleted");
        Ok(())
    }
}
