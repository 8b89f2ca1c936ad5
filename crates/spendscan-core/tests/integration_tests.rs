//! Integration tests for spendscan-core
//!
//! These tests exercise the full upload → parse → classify → confirm →
//! report workflow against the mock OCR backend.

use std::time::Duration;

use chrono::NaiveDate;
use spendscan_core::{
    db::Database,
    models::{ConfirmRequest, CorrectionType, TransactionStatus, TransactionStatusView},
    ocr::{MockOcrBackend, OcrClient},
    reports::SpendReports,
    CoreConfig, Error, ReceiptPipeline,
};

const OWNER: &str = "user-1";

fn fast_config() -> CoreConfig {
    // Millisecond backoff keeps the transient-retry tests quick
    CoreConfig {
        retry_backoff_ms: 1,
        ..CoreConfig::default()
    }
}

fn setup() -> (Database, ReceiptPipeline, MockOcrBackend, SpendReports) {
    let db = Database::in_memory().expect("Failed to create in-memory database");
    let mock = MockOcrBackend::new();
    let pipeline = ReceiptPipeline::new(db.clone(), OcrClient::Mock(mock.clone()), fast_config());
    let reports = SpendReports::new(db.clone());
    (db, pipeline, mock, reports)
}

fn category_id(db: &Database, name: &str) -> i64 {
    db.list_categories(OWNER)
        .unwrap()
        .iter()
        .find(|c| c.name == name)
        .unwrap_or_else(|| panic!("missing category {}", name))
        .id
}

fn confirm_request(category_id: i64, vendor: &str, cents: i64, date: &str) -> ConfirmRequest {
    ConfirmRequest {
        category_id,
        vendor: vendor.to_string(),
        amount_cents: cents,
        date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
        remember_vendor: true,
    }
}

/// Poll until the background pipeline task settles the transaction
async fn wait_for_settle(
    pipeline: &ReceiptPipeline,
    id: i64,
) -> TransactionStatusView {
    for _ in 0..500 {
        let view = pipeline.get_status(OWNER, id).unwrap();
        match view.status {
            TransactionStatus::Processing | TransactionStatus::Parsed => {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
            _ => return view,
        }
    }
    panic!("transaction {} never left the in-flight states", id);
}

// =============================================================================
// Upload → classify → confirm, with vendor learning
// =============================================================================

#[tokio::test]
async fn test_unknown_vendor_falls_back_then_learns() {
    let (db, pipeline, mock, _) = setup();
    let food = category_id(&db, "Food & Dining");
    let fallback = category_id(&db, "Uncategorized");

    mock.script_extraction("r1.jpg", "BLUE BOTTLE COFFEE", "6.50", "2024-03-10");
    let first = pipeline.upload_receipt(OWNER, "r1.jpg").unwrap();

    let view = wait_for_settle(&pipeline, first).await;
    assert_eq!(view.status, TransactionStatus::Classified);
    // Unknown vendor: fallback bucket at zero confidence
    assert_eq!(view.confidence, Some(0));
    let tx = db.get_transaction(OWNER, first).unwrap();
    assert_eq!(tx.category_id, Some(fallback));
    assert_eq!(tx.amount_cents, Some(650));

    // User files it under Food & Dining and opts into remembering
    let tx = pipeline
        .confirm(
            OWNER,
            first,
            &confirm_request(food, "BLUE BOTTLE COFFEE", 650, "2024-03-10"),
        )
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Corrected);

    // Second receipt from the same vendor classifies from the learned
    // mapping at seed confidence
    mock.script_extraction("r2.jpg", "BLUE BOTTLE COFFEE", "4.25", "2024-03-12");
    let second = pipeline.upload_receipt(OWNER, "r2.jpg").unwrap();
    let view = wait_for_settle(&pipeline, second).await;
    assert_eq!(view.status, TransactionStatus::Classified);
    assert_eq!(view.confidence, Some(50));
    let tx = db.get_transaction(OWNER, second).unwrap();
    assert_eq!(tx.category_id, Some(food));

    // Agreeing again reinforces: 50 + (100-50)/4 = 62
    pipeline
        .confirm(
            OWNER,
            second,
            &confirm_request(food, "BLUE BOTTLE COFFEE", 425, "2024-03-12"),
        )
        .unwrap();
    let mapping = db
        .get_vendor_mapping(OWNER, "blue bottle coffee")
        .unwrap()
        .unwrap();
    assert_eq!(mapping.confidence, 62);
    assert_eq!(mapping.usage_count, 2);
}

#[tokio::test]
async fn test_exact_confirmation_leaves_no_audit() {
    let (db, pipeline, mock, _) = setup();
    let fallback = category_id(&db, "Uncategorized");

    mock.script_extraction("r.jpg", "CORNER DELI", "12.00", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;

    let mut req = confirm_request(fallback, "CORNER DELI", 1200, "2024-03-10");
    req.remember_vendor = false;
    let tx = pipeline.confirm(OWNER, id, &req).unwrap();
    assert_eq!(tx.status, TransactionStatus::Confirmed);
    assert!(db.list_transaction_corrections(OWNER, id).unwrap().is_empty());
    assert!(db.get_vendor_mapping(OWNER, "corner deli").unwrap().is_none());
}

// =============================================================================
// Correction flow and mapping override
// =============================================================================

#[tokio::test]
async fn test_category_correction_overrides_learned_mapping() {
    let (db, pipeline, mock, _) = setup();
    let food = category_id(&db, "Food & Dining");
    let groceries = category_id(&db, "Groceries");

    // Learn TRADER JOES -> Food & Dining
    mock.script_extraction("r1.jpg", "TRADER JOES", "30.00", "2024-03-01");
    let first = pipeline.upload_receipt(OWNER, "r1.jpg").unwrap();
    wait_for_settle(&pipeline, first).await;
    pipeline
        .confirm(OWNER, first, &confirm_request(food, "TRADER JOES", 3000, "2024-03-01"))
        .unwrap();

    // Next receipt classifies there; user moves it to Groceries
    mock.script_extraction("r2.jpg", "TRADER JOES", "45.00", "2024-03-08");
    let second = pipeline.upload_receipt(OWNER, "r2.jpg").unwrap();
    wait_for_settle(&pipeline, second).await;
    let tx = pipeline
        .confirm(
            OWNER,
            second,
            &confirm_request(groceries, "TRADER JOES", 4500, "2024-03-08"),
        )
        .unwrap();
    assert_eq!(tx.status, TransactionStatus::Corrected);

    let audit = db.list_transaction_corrections(OWNER, second).unwrap();
    assert_eq!(audit.len(), 1);
    assert_eq!(audit[0].correction_type, CorrectionType::Category);
    assert_eq!(audit[0].old_category_id, Some(food));
    assert_eq!(audit[0].new_category_id, groceries);

    // Override resets the mapping to the seed, not a blend
    let mapping = db.get_vendor_mapping(OWNER, "trader joes").unwrap().unwrap();
    assert_eq!(mapping.category_id, groceries);
    assert_eq!(mapping.confidence, 50);
    assert_eq!(mapping.usage_count, 1);
}

#[tokio::test]
async fn test_confirmation_is_terminal() {
    let (db, pipeline, mock, _) = setup();
    let food = category_id(&db, "Food & Dining");

    mock.script_extraction("r.jpg", "CHIPOTLE", "11.50", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;

    let req = confirm_request(food, "CHIPOTLE", 1150, "2024-03-10");
    pipeline.confirm(OWNER, id, &req).unwrap();

    // Re-confirming a settled transaction is a conflict, and its state
    // does not change
    let err = pipeline.confirm(OWNER, id, &req).unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(
        db.get_transaction(OWNER, id).unwrap().status,
        TransactionStatus::Corrected
    );
}

// =============================================================================
// OCR failure handling and retry
// =============================================================================

#[tokio::test]
async fn test_permanent_failure_settles_in_error_without_retry() {
    let (db, pipeline, mock, _) = setup();

    mock.script_permanent_failure("bad.jpg", "unsupported image format");
    // Only one response is scripted: a retry attempt would hit the
    // unscripted fallback and wrongly succeed
    let id = pipeline.upload_receipt(OWNER, "bad.jpg").unwrap();

    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Error);
    assert_eq!(view.error_reason.as_deref(), Some("unsupported image format"));
    let _ = db;
}

#[tokio::test]
async fn test_transient_failures_retry_until_success() {
    let (db, pipeline, mock, _) = setup();
    let fallback = category_id(&db, "Uncategorized");

    mock.script_transient_failure("flaky.jpg", "timeout");
    mock.script_transient_failure("flaky.jpg", "timeout");
    mock.script_extraction("flaky.jpg", "SHAKE SHACK", "15.25", "2024-03-10");

    let id = pipeline.upload_receipt(OWNER, "flaky.jpg").unwrap();
    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Classified);

    let tx = db.get_transaction(OWNER, id).unwrap();
    assert_eq!(tx.category_id, Some(fallback));
    assert_eq!(tx.amount_cents, Some(1525));
}

#[tokio::test]
async fn test_transient_failures_exhaust_attempts() {
    let (_, pipeline, mock, _) = setup();

    for _ in 0..3 {
        mock.script_transient_failure("down.jpg", "connection refused");
    }
    let id = pipeline.upload_receipt(OWNER, "down.jpg").unwrap();

    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Error);
    assert!(view.error_reason.unwrap().contains("after 3 attempts"));
}

#[tokio::test]
async fn test_retry_reruns_errored_transaction() {
    let (db, pipeline, mock, _) = setup();

    mock.script_permanent_failure("r.jpg", "blurry image");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Error);

    mock.script_extraction("r.jpg", "WALGREENS", "8.99", "2024-03-10");
    pipeline.retry(OWNER, id).await.unwrap();

    let tx = db.get_transaction(OWNER, id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Classified);
    assert!(tx.error_reason.is_none());
}

#[tokio::test]
async fn test_retry_recovers_stranded_processing_row() {
    let (db, pipeline, mock, _) = setup();

    // A row can be left in processing when the host exits before the
    // spawned parse task finishes. Retry must be able to pick it up.
    let id = db.insert_processing_transaction(OWNER, "r.jpg").unwrap();
    mock.script_extraction("r.jpg", "WALGREENS", "8.99", "2024-03-10");

    pipeline.retry(OWNER, id).await.unwrap();

    let tx = db.get_transaction(OWNER, id).unwrap();
    assert_eq!(tx.status, TransactionStatus::Classified);
}

#[tokio::test]
async fn test_retry_rejected_outside_error_state() {
    let (_, pipeline, mock, _) = setup();

    mock.script_extraction("r.jpg", "WALGREENS", "8.99", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;

    let err = pipeline.retry(OWNER, id).await.unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
}

#[tokio::test]
async fn test_rejected_extractions_settle_in_error() {
    let (_, pipeline, mock, _) = setup();

    // Zero amount
    mock.script("zero.jpg", Ok(spendscan_core::OcrExtraction {
        raw_text: "TOTAL 0.00".to_string(),
        vendor: Some("X".to_string()),
        amount: Some("0.00".to_string()),
        date: Some("2024-03-10".to_string()),
        fields: None,
    }));
    let id = pipeline.upload_receipt(OWNER, "zero.jpg").unwrap();
    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Error);
    assert!(view.error_reason.unwrap().contains("non-positive amount"));

    // Unparseable date
    mock.script("baddate.jpg", Ok(spendscan_core::OcrExtraction {
        raw_text: "receipt".to_string(),
        vendor: Some("X".to_string()),
        amount: Some("5.00".to_string()),
        date: Some("03/10/2024".to_string()),
        fields: None,
    }));
    let id = pipeline.upload_receipt(OWNER, "baddate.jpg").unwrap();
    let view = wait_for_settle(&pipeline, id).await;
    assert_eq!(view.status, TransactionStatus::Error);
    assert!(view.error_reason.unwrap().contains("unparseable date"));
}

#[tokio::test]
async fn test_upload_rejects_empty_image_ref() {
    let (_, pipeline, _, _) = setup();
    assert!(matches!(
        pipeline.upload_receipt(OWNER, "   ").unwrap_err(),
        Error::Validation(_)
    ));
}

// =============================================================================
// Reporting over the full pipeline
// =============================================================================

#[tokio::test]
async fn test_only_settled_transactions_count_toward_spend() {
    let (db, pipeline, mock, reports) = setup();
    let food = category_id(&db, "Food & Dining");
    db.upsert_budget(OWNER, food, "2024-03", 20_000).unwrap();

    // Two confirmed receipts
    for (r, vendor, amount, cents) in [
        ("a.jpg", "CHIPOTLE", "11.50", 1150),
        ("b.jpg", "CHIPOTLE", "13.00", 1300),
    ] {
        mock.script_extraction(r, vendor, amount, "2024-03-10");
        let id = pipeline.upload_receipt(OWNER, r).unwrap();
        wait_for_settle(&pipeline, id).await;
        pipeline
            .confirm(OWNER, id, &confirm_request(food, vendor, cents, "2024-03-10"))
            .unwrap();
    }

    // One classified but never confirmed, one errored
    mock.script_extraction("c.jpg", "CHIPOTLE", "99.00", "2024-03-11");
    let pending = pipeline.upload_receipt(OWNER, "c.jpg").unwrap();
    wait_for_settle(&pipeline, pending).await;
    mock.script_permanent_failure("d.jpg", "blurry");
    let errored = pipeline.upload_receipt(OWNER, "d.jpg").unwrap();
    wait_for_settle(&pipeline, errored).await;

    let spend = reports.spend_by_category(OWNER, "2024-03").unwrap();
    assert_eq!(spend.len(), 1);
    assert_eq!(spend[0].spent_cents, 2450);
    assert_eq!(spend[0].transaction_count, 2);

    let lines = reports.budget_vs_spend(OWNER, "2024-03").unwrap();
    let food_line = lines.iter().find(|l| l.category_id == food).unwrap();
    assert_eq!(food_line.remaining_cents, 17_550);
    assert_eq!(food_line.percentage_used, Some(12.25));

    let vendors = reports.top_vendors(OWNER, "2024-03", 5).unwrap();
    assert_eq!(vendors.len(), 1);
    assert_eq!(vendors[0].vendor, "CHIPOTLE");
    assert_eq!(vendors[0].transaction_count, 2);

    let summary = reports.dashboard_summary(OWNER, "2024-03").unwrap();
    assert_eq!(summary.total_spent_cents, 2450);
    assert_eq!(summary.transaction_count, 2);
}

#[tokio::test]
async fn test_corrected_amount_feeds_reports() {
    let (db, pipeline, mock, reports) = setup();
    let food = category_id(&db, "Food & Dining");

    // OCR misreads 12.00 as 72.00; the user corrects it on confirm
    mock.script_extraction("r.jpg", "CORNER DELI", "72.00", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;
    pipeline
        .confirm(OWNER, id, &confirm_request(food, "CORNER DELI", 1200, "2024-03-10"))
        .unwrap();

    let spend = reports.spend_by_category(OWNER, "2024-03").unwrap();
    assert_eq!(spend[0].spent_cents, 1200);
    let _ = db;
}

#[tokio::test]
async fn test_owner_isolation_end_to_end() {
    let (db, pipeline, mock, reports) = setup();
    let food = category_id(&db, "Food & Dining");

    mock.script_extraction("r.jpg", "CHIPOTLE", "11.50", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;
    pipeline
        .confirm(OWNER, id, &confirm_request(food, "CHIPOTLE", 1150, "2024-03-10"))
        .unwrap();

    // Another user sees none of it
    assert!(matches!(
        pipeline.get_status("user-2", id).unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(reports.spend_by_category("user-2", "2024-03").unwrap().is_empty());
    assert!(db.get_vendor_mapping("user-2", "chipotle").unwrap().is_none());
}

#[tokio::test]
async fn test_deleted_transaction_drops_out_everywhere() {
    let (db, pipeline, mock, reports) = setup();
    let food = category_id(&db, "Food & Dining");

    mock.script_extraction("r.jpg", "CHIPOTLE", "11.50", "2024-03-10");
    let id = pipeline.upload_receipt(OWNER, "r.jpg").unwrap();
    wait_for_settle(&pipeline, id).await;
    pipeline
        .confirm(OWNER, id, &confirm_request(food, "CHIPOTLE", 1150, "2024-02-10"))
        .unwrap();
    // Date correction above also proves the audit survives deletion
    assert_eq!(db.list_transaction_corrections(OWNER, id).unwrap().len(), 1);

    pipeline.delete(OWNER, id).unwrap();
    assert!(matches!(
        pipeline.get_status(OWNER, id).unwrap_err(),
        Error::NotFound(_)
    ));
    assert!(reports.spend_by_category(OWNER, "2024-02").unwrap().is_empty());
    assert_eq!(db.list_transaction_corrections(OWNER, id).unwrap().len(), 1);
}
