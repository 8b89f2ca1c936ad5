//! Domain models for spendscan

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Transaction lifecycle status
///
/// `Processing -> Parsed -> Classified -> {Confirmed | Corrected}`, with
/// `Error` reachable from any non-terminal state. `Confirmed` and
/// `Corrected` are terminal; later edits are new correction events, not
/// state regressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Processing,
    Parsed,
    Classified,
    Confirmed,
    Corrected,
    Error,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processing => "processing",
            Self::Parsed => "parsed",
            Self::Classified => "classified",
            Self::Confirmed => "confirmed",
            Self::Corrected => "corrected",
            Self::Error => "error",
        }
    }

    /// Terminal states accept no automatic transition
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Confirmed | Self::Corrected)
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "processing" => Ok(Self::Processing),
            "parsed" => Ok(Self::Parsed),
            "classified" => Ok(Self::Classified),
            "confirmed" => Ok(Self::Confirmed),
            "corrected" => Ok(Self::Corrected),
            "error" => Ok(Self::Error),
            _ => Err(format!("Unknown transaction status: {}", s)),
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A receipt-derived spend record
///
/// Amount and date are set once the status passes `Parsed`; category and
/// confidence once it reaches `Classified`. Confidence is never cleared
/// afterward - corrections overwrite the category but the pre-correction
/// confidence survives in the audit trail, not on the transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: i64,
    /// Opaque authenticated user id
    pub owner_id: String,
    pub category_id: Option<i64>,
    /// Fixed-point cents; > 0 once parsed
    pub amount_cents: Option<i64>,
    pub date: Option<NaiveDate>,
    /// Vendor as extracted/confirmed (free text, not normalized)
    pub vendor: Option<String>,
    /// Raw OCR text
    pub raw_text: Option<String>,
    /// Opaque reference into the image store
    pub image_ref: Option<String>,
    /// Structured parse payload from the OCR adapter, as JSON
    pub parsed_json: Option<String>,
    /// Classifier confidence (0-100), present once classified
    pub confidence: Option<i64>,
    pub status: TransactionStatus,
    /// Failure reason retained for user visibility when status = error
    pub error_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A spending bucket, either global (shared) or user-owned
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    /// None = global category shared by all users
    pub owner_id: Option<String>,
    pub name: String,
    /// Hex color for UI display (e.g. "#10b981")
    pub color: String,
    /// Emoji icon
    pub icon: String,
    /// Default monthly budget, used when no month-specific record exists
    pub monthly_budget_cents: Option<i64>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_global(&self) -> bool {
        self.owner_id.is_none()
    }
}

/// New category for creation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub color: String,
    pub icon: String,
    pub monthly_budget_cents: Option<i64>,
}

/// Learned association between a normalized vendor name and a category,
/// scoped to one user. At most one mapping per (owner, vendor name).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorMapping {
    pub id: i64,
    pub owner_id: String,
    /// Normalized vendor name (see `normalize::normalize_vendor`)
    pub vendor_name: String,
    pub category_id: i64,
    /// 0-100; rises on agreement, resets on category override
    pub confidence: i64,
    pub usage_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Which fields a correction touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CorrectionType {
    Category,
    Vendor,
    Amount,
    /// Two or more fields changed simultaneously
    All,
}

impl CorrectionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "category",
            Self::Vendor => "vendor",
            Self::Amount => "amount",
            Self::All => "all",
        }
    }
}

impl std::str::FromStr for CorrectionType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "vendor" => Ok(Self::Vendor),
            "amount" => Ok(Self::Amount),
            "all" => Ok(Self::All),
            _ => Err(format!("Unknown correction type: {}", s)),
        }
    }
}

impl std::fmt::Display for CorrectionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Immutable record of one user override. Append-only; doubles as the
/// training signal for the vendor mapping store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditCorrection {
    pub id: i64,
    pub transaction_id: i64,
    pub owner_id: String,
    /// None when the first classification had no prior category
    pub old_category_id: Option<i64>,
    pub new_category_id: i64,
    pub old_vendor: Option<String>,
    pub new_vendor: Option<String>,
    pub old_amount_cents: Option<i64>,
    pub new_amount_cents: Option<i64>,
    pub correction_type: CorrectionType,
    pub created_at: DateTime<Utc>,
}

/// Per-category, per-month spending ceiling snapshot. At most one record
/// per (owner, category, month); history for prior months is retained.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetRecord {
    pub id: i64,
    pub owner_id: String,
    pub category_id: i64,
    /// YYYY-MM
    pub month: String,
    pub budget_cents: i64,
    pub created_at: DateTime<Utc>,
}

/// User-submitted confirmation data for a classified transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmRequest {
    pub category_id: i64,
    pub vendor: String,
    pub amount_cents: i64,
    pub date: NaiveDate,
    /// Create/update the vendor mapping from this confirmation
    pub remember_vendor: bool,
}

/// Classifier output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySuggestion {
    pub category_id: i64,
    /// 0-100
    pub confidence: i64,
    /// True when confidence is below the configured threshold; the UI
    /// should flag the suggestion rather than auto-trust it
    pub needs_review: bool,
}

/// Processing status view for polling clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionStatusView {
    pub status: TransactionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_reason: Option<String>,
}

/// Paginated transaction listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionList {
    pub items: Vec<Transaction>,
    pub total: i64,
    pub has_more: bool,
}

/// Spend summed for one category in one month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategorySpend {
    pub category_id: i64,
    pub category_name: String,
    pub spent_cents: i64,
    pub transaction_count: i64,
}

/// One row of the budget-vs-spend table
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetLine {
    pub category_id: i64,
    pub category_name: String,
    pub budget_cents: i64,
    pub spent_cents: i64,
    pub remaining_cents: i64,
    /// None when the budget is 0 or absent (never infinity)
    pub percentage_used: Option<f64>,
}

/// A vendor ranked by monthly spend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TopVendor {
    pub vendor: String,
    pub amount_cents: i64,
    pub transaction_count: i64,
}

/// One month in a trend series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonthlyTrend {
    /// YYYY-MM
    pub month: String,
    pub total_cents: i64,
    /// Absolute change vs the prior month; None for the first month
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_cents: Option<i64>,
    /// Percentage change vs the prior month; None for the first month
    /// or when the prior month's total was 0
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delta_percent: Option<f64>,
}

/// Dashboard summary for one month
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardSummary {
    pub month: String,
    pub total_spent_cents: i64,
    pub transaction_count: i64,
    pub categories: Vec<BudgetLine>,
    pub top_vendors: Vec<TopVendor>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TransactionStatus::Processing,
            TransactionStatus::Parsed,
            TransactionStatus::Classified,
            TransactionStatus::Confirmed,
            TransactionStatus::Corrected,
            TransactionStatus::Error,
        ] {
            assert_eq!(
                TransactionStatus::from_str(status.as_str()).unwrap(),
                status
            );
        }
        assert!(TransactionStatus::from_str("bogus").is_err());
    }

    #[test]
    fn test_terminal_states() {
        assert!(TransactionStatus::Confirmed.is_terminal());
        assert!(TransactionStatus::Corrected.is_terminal());
        assert!(!TransactionStatus::Processing.is_terminal());
        assert!(!TransactionStatus::Classified.is_terminal());
        assert!(!TransactionStatus::Error.is_terminal());
    }

    #[test]
    fn test_correction_type_round_trip() {
        for ct in [
            CorrectionType::Category,
            CorrectionType::Vendor,
            CorrectionType::Amount,
            CorrectionType::All,
        ] {
            assert_eq!(CorrectionType::from_str(ct.as_str()).unwrap(), ct);
        }
    }
}
