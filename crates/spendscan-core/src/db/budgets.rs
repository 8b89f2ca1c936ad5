//! Per-month budget records
//!
//! Writing a month's budget overwrites that month's row only; prior
//! months keep their snapshots for trend analysis.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::BudgetRecord;

fn budget_from_row(row: &Row<'_>) -> rusqlite::Result<BudgetRecord> {
    let created: String = row.get("created_at")?;
    Ok(BudgetRecord {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        category_id: row.get("category_id")?,
        month: row.get("month")?,
        budget_cents: row.get("budget_cents")?,
        created_at: parse_datetime(&created),
    })
}

impl Database {
    /// Create or overwrite the budget record for (owner, category, month)
    pub fn upsert_budget(
        &self,
        owner_id: &str,
        category_id: i64,
        month: &str,
        budget_cents: i64,
    ) -> Result<BudgetRecord> {
        if budget_cents < 0 {
            return Err(Error::Validation("budget must not be negative".to_string()));
        }
        let conn = self.conn()?;
        conn.execute(
            r#"
            INSERT INTO budgets_history (owner_id, category_id, month, budget_cents)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(owner_id, category_id, month)
            DO UPDATE SET budget_cents = excluded.budget_cents
            "#,
            params![owner_id, category_id, month, budget_cents],
        )?;

        self.get_budget(owner_id, category_id, month)?
            .ok_or_else(|| Error::Invariant("budget record vanished after upsert".to_string()))
    }

    /// Fetch one month's budget record, if any
    pub fn get_budget(
        &self,
        owner_id: &str,
        category_id: i64,
        month: &str,
    ) -> Result<Option<BudgetRecord>> {
        let conn = self.conn()?;
        Ok(conn
            .query_row(
                "SELECT id, owner_id, category_id, month, budget_cents, created_at
                 FROM budgets_history
                 WHERE owner_id = ? AND category_id = ? AND month = ?",
                params![owner_id, category_id, month],
                budget_from_row,
            )
            .optional()?)
    }

    /// All budget records for one month
    pub fn list_budgets_for_month(&self, owner_id: &str, month: &str) -> Result<Vec<BudgetRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, category_id, month, budget_cents, created_at
             FROM budgets_history WHERE owner_id = ? AND month = ?
             ORDER BY category_id",
        )?;
        let rows = stmt
            .query_map(params![owner_id, month], budget_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
