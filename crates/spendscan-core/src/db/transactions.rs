//! Transaction rows and conditional status writes
//!
//! Every status transition goes through an `UPDATE ... WHERE status = ?`
//! conditional write. A write that matches zero rows means the transaction
//! has already left the expected source state (duplicate OCR callback,
//! concurrent confirm, deleted row) and the caller treats it as a no-op
//! or a conflict; this is what keeps stage transitions strictly monotonic.

use chrono::NaiveDate;
use rusqlite::{params, OptionalExtension, Row};

use super::{parse_date, parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Transaction, TransactionStatus};

fn tx_from_row(row: &Row<'_>) -> rusqlite::Result<Transaction> {
    let status_str: String = row.get("status")?;
    let date_str: Option<String> = row.get("date")?;
    let created: String = row.get("created_at")?;
    let updated: String = row.get("updated_at")?;

    Ok(Transaction {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        category_id: row.get("category_id")?,
        amount_cents: row.get("amount_cents")?,
        date: date_str.as_deref().and_then(parse_date),
        vendor: row.get("vendor")?,
        raw_text: row.get("raw_text")?,
        image_ref: row.get("image_ref")?,
        parsed_json: row.get("parsed_json")?,
        confidence: row.get("confidence")?,
        status: status_str.parse().unwrap_or(TransactionStatus::Error),
        error_reason: row.get("error_reason")?,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

const TX_COLUMNS: &str = "id, owner_id, category_id, amount_cents, date, vendor, raw_text, \
     image_ref, parsed_json, confidence, status, error_reason, created_at, updated_at";

impl Database {
    /// Insert a new transaction in `processing` state
    pub fn insert_processing_transaction(&self, owner_id: &str, image_ref: &str) -> Result<i64> {
        let conn = self.conn()?;
        conn.execute(
            "INSERT INTO transactions (owner_id, image_ref, status) VALUES (?, ?, 'processing')",
            params![owner_id, image_ref],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Fetch a transaction owned by `owner_id`
    ///
    /// An existing transaction owned by someone else reports the same
    /// `NotFound` as a missing one.
    pub fn get_transaction(&self, owner_id: &str, id: i64) -> Result<Transaction> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM transactions WHERE id = ? AND owner_id = ?",
            TX_COLUMNS
        );
        conn.query_row(&sql, params![id, owner_id], tx_from_row)
            .optional()?
            .ok_or_else(|| Error::NotFound(format!("transaction {}", id)))
    }

    /// Apply parsed fields: `processing -> parsed`
    ///
    /// Returns false when the row was not in `processing` (late or
    /// duplicate OCR result; discarded).
    pub fn apply_parsed(
        &self,
        owner_id: &str,
        id: i64,
        vendor: &str,
        amount_cents: i64,
        date: NaiveDate,
        raw_text: &str,
        parsed_json: Option<&str>,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            r#"
            UPDATE transactions
            SET status = 'parsed', vendor = ?, amount_cents = ?, date = ?,
                raw_text = ?, parsed_json = ?, error_reason = NULL,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND owner_id = ? AND status = 'processing'
            "#,
            params![
                vendor,
                amount_cents,
                date.to_string(),
                raw_text,
                parsed_json,
                id,
                owner_id
            ],
        )?;
        Ok(n > 0)
    }

    /// Apply the classifier suggestion: `parsed -> classified`
    pub fn apply_classified(
        &self,
        owner_id: &str,
        id: i64,
        category_id: i64,
        confidence: i64,
    ) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            r#"
            UPDATE transactions
            SET status = 'classified', category_id = ?, confidence = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND owner_id = ? AND status = 'parsed'
            "#,
            params![category_id, confidence, id, owner_id],
        )?;
        Ok(n > 0)
    }

    /// Settle in `error` with a retained reason, from any non-terminal state
    pub fn mark_transaction_error(&self, owner_id: &str, id: i64, reason: &str) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            r#"
            UPDATE transactions
            SET status = 'error', error_reason = ?, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND owner_id = ? AND status IN ('processing', 'parsed', 'classified')
            "#,
            params![reason, id, owner_id],
        )?;
        Ok(n > 0)
    }

    /// Re-enter `processing` for an explicit user retry
    ///
    /// Accepts rows in `error`, and rows already in `processing` whose
    /// background task never completed (the host can exit before a
    /// spawned parse finishes). Re-running a live row is harmless: every
    /// downstream write is conditional on the source state.
    pub fn reenter_processing(&self, owner_id: &str, id: i64) -> Result<bool> {
        let conn = self.conn()?;
        let n = conn.execute(
            r#"
            UPDATE transactions
            SET status = 'processing', error_reason = NULL, updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND owner_id = ? AND status IN ('error', 'processing')
            "#,
            params![id, owner_id],
        )?;
        Ok(n > 0)
    }

    /// Finalize a confirmation: `classified -> confirmed | corrected`
    ///
    /// Writes the user-approved field values along with the terminal
    /// status. Returns false when the source state no longer matches.
    pub fn finalize_confirmation(
        &self,
        owner_id: &str,
        id: i64,
        status: TransactionStatus,
        category_id: i64,
        vendor: &str,
        amount_cents: i64,
        date: NaiveDate,
    ) -> Result<bool> {
        debug_assert!(status.is_terminal());
        let conn = self.conn()?;
        let n = conn.execute(
            r#"
            UPDATE transactions
            SET status = ?, category_id = ?, vendor = ?, amount_cents = ?, date = ?,
                updated_at = CURRENT_TIMESTAMP
            WHERE id = ? AND owner_id = ? AND status = 'classified'
            "#,
            params![
                status.as_str(),
                category_id,
                vendor,
                amount_cents,
                date.to_string(),
                id,
                owner_id
            ],
        )?;
        Ok(n > 0)
    }

    /// List transactions for one month with optional category filter and
    /// limit/offset pagination. Returns (items, total matching rows).
    pub fn list_transactions(
        &self,
        owner_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        category_id: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Result<(Vec<Transaction>, i64)> {
        let conn = self.conn()?;

        let category_clause = if category_id.is_some() {
            "AND category_id = ?4"
        } else {
            ""
        };

        let count_sql = format!(
            "SELECT COUNT(*) FROM transactions
             WHERE owner_id = ?1 AND date BETWEEN ?2 AND ?3 {}",
            category_clause
        );
        let list_sql = format!(
            "SELECT {} FROM transactions
             WHERE owner_id = ?1 AND date BETWEEN ?2 AND ?3 {}
             ORDER BY date DESC, id DESC LIMIT ?5 OFFSET ?6",
            TX_COLUMNS, category_clause
        );

        let from_s = from.to_string();
        let to_s = to.to_string();

        let (total, items) = if let Some(cat) = category_id {
            let total: i64 = conn.query_row(
                &count_sql,
                params![owner_id, from_s, to_s, cat],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&list_sql)?;
            let items = stmt
                .query_map(params![owner_id, from_s, to_s, cat, limit, offset], tx_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            (total, items)
        } else {
            // Placeholders stay positional; ?4 is unused without a filter
            let list_sql = list_sql.replace("?5", "?4").replace("?6", "?5");
            let total: i64 = conn.query_row(
                &count_sql,
                params![owner_id, from_s, to_s],
                |row| row.get(0),
            )?;
            let mut stmt = conn.prepare(&list_sql)?;
            let items = stmt
                .query_map(params![owner_id, from_s, to_s, limit, offset], tx_from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            (total, items)
        };

        Ok((items, total))
    }

    /// Delete a transaction (owner-only). Audit rows are retained.
    pub fn delete_transaction(&self, owner_id: &str, id: i64) -> Result<()> {
        let conn = self.conn()?;
        let n = conn.execute(
            "DELETE FROM transactions WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        if n == 0 {
            return Err(Error::NotFound(format!("transaction {}", id)));
        }
        Ok(())
    }
}
