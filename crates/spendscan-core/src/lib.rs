//! Spendscan Core Library
//!
//! Shared functionality for the Spendscan receipt tracker:
//! - Database access and migrations
//! - Receipt processing pipeline (OCR, parse, classify)
//! - Pluggable OCR backends (HTTP service, mock)
//! - Self-improving vendor-to-category classifier
//! - Confirmation and correction recording with an audit trail
//! - Month-scoped budget and spend reporting

pub mod classifier;
pub mod config;
pub mod confirm;
pub mod db;
pub mod error;
pub mod mappings;
pub mod models;
pub mod money;
pub mod normalize;
pub mod ocr;
pub mod pipeline;
pub mod reports;

pub use classifier::Classifier;
pub use config::CoreConfig;
pub use confirm::ConfirmationRecorder;
pub use db::{Database, NewAuditCorrection, DB_KEY_ENV, FALLBACK_CATEGORY};
pub use error::{Error, Result};
pub use mappings::VendorMappingStore;
pub use models::{
    AuditCorrection, BudgetLine, BudgetRecord, Category, CategorySpend, CategorySuggestion,
    ConfirmRequest, CorrectionType, DashboardSummary, MonthlyTrend, NewCategory, TopVendor,
    Transaction, TransactionList, TransactionStatus, TransactionStatusView, VendorMapping,
};
pub use money::{format_cents, parse_cents};
pub use normalize::normalize_vendor;
pub use ocr::{
    HttpOcrBackend, MockOcrBackend, OcrBackend, OcrClient, OcrExtraction, OcrFailure,
    OcrFailureKind, OcrResult,
};
pub use pipeline::ReceiptPipeline;
pub use reports::{month_bounds, SpendReports};
