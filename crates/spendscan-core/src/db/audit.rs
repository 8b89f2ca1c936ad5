//! Append-only correction audit trail

use rusqlite::{params, Row};

use super::{parse_datetime, Database};
use crate::error::Result;
use crate::models::{AuditCorrection, CorrectionType};

/// Field values for a new audit row (before insertion)
#[derive(Debug, Clone)]
pub struct NewAuditCorrection {
    pub transaction_id: i64,
    pub owner_id: String,
    pub old_category_id: Option<i64>,
    pub new_category_id: i64,
    pub old_vendor: Option<String>,
    pub new_vendor: Option<String>,
    pub old_amount_cents: Option<i64>,
    pub new_amount_cents: Option<i64>,
    pub correction_type: CorrectionType,
}

fn audit_from_row(row: &Row<'_>) -> rusqlite::Result<AuditCorrection> {
    let ct: String = row.get("correction_type")?;
    let created: String = row.get("created_at")?;
    Ok(AuditCorrection {
        id: row.get("id")?,
        transaction_id: row.get("transaction_id")?,
        owner_id: row.get("owner_id")?,
        old_category_id: row.get("old_category_id")?,
        new_category_id: row.get("new_category_id")?,
        old_vendor: row.get("old_vendor")?,
        new_vendor: row.get("new_vendor")?,
        old_amount_cents: row.get("old_amount_cents")?,
        new_amount_cents: row.get("new_amount_cents")?,
        correction_type: ct.parse().unwrap_or(CorrectionType::All),
        created_at: parse_datetime(&created),
    })
}

const AUDIT_COLUMNS: &str = "id, transaction_id, owner_id, old_category_id, new_category_id, \
     old_vendor, new_vendor, old_amount_cents, new_amount_cents, correction_type, created_at";

impl Database {
    /// Append one audit row. Rows are never updated or deleted.
    pub fn insert_audit_correction(&self, new: &NewAuditCorrection) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO audit_corrections
                (transaction_id, owner_id, old_category_id, new_category_id,
                 old_vendor, new_vendor, old_amount_cents, new_amount_cents, correction_type)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
            params![
                new.transaction_id,
                new.owner_id,
                new.old_category_id,
                new.new_category_id,
                new.old_vendor,
                new.new_vendor,
                new.old_amount_cents,
                new.new_amount_cents,
                new.correction_type.as_str(),
            ],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Correction history for one owner, newest first
    pub fn list_audit_corrections(&self, owner_id: &str, limit: i64) -> Result<Vec<AuditCorrection>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM audit_corrections WHERE owner_id = ?
             ORDER BY id DESC LIMIT ?",
            AUDIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner_id, limit], audit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Correction history for one transaction, newest first
    pub fn list_transaction_corrections(
        &self,
        owner_id: &str,
        transaction_id: i64,
    ) -> Result<Vec<AuditCorrection>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM audit_corrections WHERE owner_id = ? AND transaction_id = ?
             ORDER BY id DESC",
            AUDIT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![owner_id, transaction_id], audit_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
