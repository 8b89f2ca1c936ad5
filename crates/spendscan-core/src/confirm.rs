//! Confirmation and correction recording
//!
//! Drives the `classified -> {confirmed | corrected}` transition. The
//! submitted values are compared against the classifier's output: an
//! exact match confirms, any difference corrects and leaves one audit
//! row behind. Vendor feedback flows into the mapping store only when
//! the user opted in with `remember_vendor`.

use tracing::{debug, info};

use crate::config::CoreConfig;
use crate::db::{Database, NewAuditCorrection};
use crate::error::{Error, Result};
use crate::mappings::VendorMappingStore;
use crate::models::{ConfirmRequest, CorrectionType, Transaction, TransactionStatus};
use crate::normalize::normalize_vendor;

/// Which submitted fields differ from the classified record
struct FieldDiff {
    category: bool,
    vendor: bool,
    amount: bool,
    date: bool,
}

impl FieldDiff {
    fn compute(tx: &Transaction, req: &ConfirmRequest) -> Self {
        Self {
            category: tx.category_id != Some(req.category_id),
            // Compare normalized so OCR casing noise does not count as
            // a user correction
            vendor: tx.vendor.as_deref().map(normalize_vendor)
                != Some(normalize_vendor(&req.vendor)),
            amount: tx.amount_cents != Some(req.amount_cents),
            date: tx.date != Some(req.date),
        }
    }

    fn changed_count(&self) -> usize {
        [self.category, self.vendor, self.amount, self.date]
            .iter()
            .filter(|c| **c)
            .count()
    }

    fn any(&self) -> bool {
        self.changed_count() > 0
    }

    /// Audit label for this correction. Multi-field corrections and a
    /// date-only change (which has no dedicated label) record as `all`.
    fn correction_type(&self) -> CorrectionType {
        match (self.changed_count(), self.category, self.vendor, self.amount) {
            (1, true, _, _) => CorrectionType::Category,
            (1, _, true, _) => CorrectionType::Vendor,
            (1, _, _, true) => CorrectionType::Amount,
            _ => CorrectionType::All,
        }
    }
}

/// Records user verdicts on classified transactions
#[derive(Clone)]
pub struct ConfirmationRecorder {
    db: Database,
    mappings: VendorMappingStore,
}

impl ConfirmationRecorder {
    pub fn new(db: Database, config: CoreConfig) -> Self {
        let mappings = VendorMappingStore::new(db.clone(), config);
        Self { db, mappings }
    }

    /// Apply a user verdict to a classified transaction.
    ///
    /// Identical values finalize as `confirmed` with no audit row.
    /// Any difference finalizes as `corrected` with exactly one audit
    /// row describing what changed. Either way the transaction becomes
    /// terminal; a second confirmation is a conflict.
    pub fn confirm(&self, owner_id: &str, id: i64, req: &ConfirmRequest) -> Result<Transaction> {
        if req.amount_cents <= 0 {
            return Err(Error::Validation(
                "confirmed amount must be positive".to_string(),
            ));
        }
        // Also verifies the category is visible to this owner
        self.db.get_category(owner_id, req.category_id)?;

        let tx = self.db.get_transaction(owner_id, id)?;
        if tx.status != TransactionStatus::Classified {
            return Err(Error::Conflict(format!(
                "transaction {} is {}, not classified; cannot confirm",
                id, tx.status
            )));
        }

        let diff = FieldDiff::compute(&tx, req);
        let status = if diff.any() {
            TransactionStatus::Corrected
        } else {
            TransactionStatus::Confirmed
        };

        let finalized = self.db.finalize_confirmation(
            owner_id,
            id,
            status,
            req.category_id,
            req.vendor.trim(),
            req.amount_cents,
            req.date,
        )?;
        if !finalized {
            // Lost a race with another confirmation of the same row
            return Err(Error::Conflict(format!(
                "transaction {} was finalized concurrently",
                id
            )));
        }

        if diff.any() {
            self.db.insert_audit_correction(&NewAuditCorrection {
                transaction_id: id,
                owner_id: owner_id.to_string(),
                old_category_id: tx.category_id,
                new_category_id: req.category_id,
                old_vendor: tx.vendor.clone(),
                new_vendor: Some(req.vendor.trim().to_string()),
                old_amount_cents: tx.amount_cents,
                new_amount_cents: Some(req.amount_cents),
                correction_type: diff.correction_type(),
            })?;
        }

        if req.remember_vendor {
            if normalize_vendor(&req.vendor).is_empty() {
                debug!(transaction = id, "Skipping mapping update for empty vendor");
            } else {
                let mapping = self.mappings.remember(owner_id, &req.vendor, req.category_id)?;
                debug!(
                    vendor = %mapping.vendor_name,
                    category = mapping.category_id,
                    confidence = mapping.confidence,
                    "Vendor mapping updated from confirmation"
                );
            }
        }

        info!(transaction = id, status = %status, "Transaction finalized");
        self.db.get_transaction(owner_id, id)
    }
}
