//! Category operations
//!
//! Categories are either global (owner NULL, shared read-only) or
//! user-owned. Name uniqueness is enforced per scope by the schema.

use rusqlite::{params, OptionalExtension, Row};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::{Category, NewCategory};

/// Name of the global fallback bucket used when classification has no signal
pub const FALLBACK_CATEGORY: &str = "Uncategorized";

fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let created: String = row.get("created_at")?;
    Ok(Category {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        name: row.get("name")?,
        color: row.get("color")?,
        icon: row.get("icon")?,
        monthly_budget_cents: row.get("monthly_budget_cents")?,
        created_at: parse_datetime(&created),
    })
}

impl Database {
    /// List categories visible to an owner: globals plus their own
    pub fn list_categories(&self, owner_id: &str) -> Result<Vec<Category>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT id, owner_id, name, color, icon, monthly_budget_cents, created_at
             FROM categories WHERE owner_id IS NULL OR owner_id = ?
             ORDER BY owner_id IS NOT NULL, name",
        )?;
        let categories = stmt
            .query_map(params![owner_id], category_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(categories)
    }

    /// Fetch a category visible to the owner (global or their own)
    pub fn get_category(&self, owner_id: &str, id: i64) -> Result<Category> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id, owner_id, name, color, icon, monthly_budget_cents, created_at
             FROM categories WHERE id = ? AND (owner_id IS NULL OR owner_id = ?)",
            params![id, owner_id],
            category_from_row,
        )
        .optional()?
        .ok_or_else(|| Error::NotFound(format!("category {}", id)))
    }

    /// Id of the global fallback category
    pub fn fallback_category_id(&self) -> Result<i64> {
        let conn = self.conn()?;
        conn.query_row(
            "SELECT id FROM categories WHERE owner_id IS NULL AND name = ?",
            params![FALLBACK_CATEGORY],
            |row| row.get(0),
        )
        .optional()?
        .ok_or_else(|| Error::Invariant("fallback category missing from seed".to_string()))
    }

    /// Create a user-owned category
    pub fn create_category(&self, owner_id: &str, new: &NewCategory) -> Result<i64> {
        if new.name.trim().is_empty() {
            return Err(Error::Validation("category name must not be empty".to_string()));
        }
        let conn = self.conn()?;
        let result = conn.execute(
            "INSERT INTO categories (owner_id, name, color, icon, monthly_budget_cents)
             VALUES (?, ?, ?, ?, ?)",
            params![
                owner_id,
                new.name.trim(),
                new.color,
                new.icon,
                new.monthly_budget_cents
            ],
        );
        match result {
            Ok(_) => Ok(conn.last_insert_rowid()),
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(Error::Conflict(format!(
                    "category name already exists: {}",
                    new.name.trim()
                )))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Update a user-owned category. Global categories are read-only.
    pub fn update_category(&self, owner_id: &str, id: i64, new: &NewCategory) -> Result<()> {
        if new.name.trim().is_empty() {
            return Err(Error::Validation("category name must not be empty".to_string()));
        }
        let conn = self.conn()?;
        let n = conn.execute(
            "UPDATE categories SET name = ?, color = ?, icon = ?, monthly_budget_cents = ?
             WHERE id = ? AND owner_id = ?",
            params![
                new.name.trim(),
                new.color,
                new.icon,
                new.monthly_budget_cents,
                id,
                owner_id
            ],
        )?;
        if n == 0 {
            return Err(Error::NotFound(format!("category {}", id)));
        }
        Ok(())
    }

    /// Delete a user-owned category.
    ///
    /// A category with existing transactions cannot be dropped outright:
    /// the caller must name a reassignment target, and both transactions
    /// and learned vendor mappings move to it before the delete.
    pub fn delete_category(
        &self,
        owner_id: &str,
        id: i64,
        reassign_to: Option<i64>,
    ) -> Result<()> {
        let mut conn = self.conn()?;

        // Only user-owned categories are deletable
        let owned: Option<i64> = conn
            .query_row(
                "SELECT id FROM categories WHERE id = ? AND owner_id = ?",
                params![id, owner_id],
                |row| row.get(0),
            )
            .optional()?;
        if owned.is_none() {
            return Err(Error::NotFound(format!("category {}", id)));
        }

        let tx = conn.transaction()?;

        let in_use: i64 = tx.query_row(
            "SELECT COUNT(*) FROM transactions WHERE owner_id = ? AND category_id = ?",
            params![owner_id, id],
            |row| row.get(0),
        )?;

        if in_use > 0 {
            let target = reassign_to.ok_or_else(|| {
                Error::Conflict(format!(
                    "category {} has {} transactions; specify a reassignment target",
                    id, in_use
                ))
            })?;
            if target == id {
                return Err(Error::Validation(
                    "cannot reassign a category to itself".to_string(),
                ));
            }
            // Target must be visible to this owner
            let visible: Option<i64> = tx
                .query_row(
                    "SELECT id FROM categories WHERE id = ? AND (owner_id IS NULL OR owner_id = ?)",
                    params![target, owner_id],
                    |row| row.get(0),
                )
                .optional()?;
            if visible.is_none() {
                return Err(Error::NotFound(format!("category {}", target)));
            }

            tx.execute(
                "UPDATE transactions SET category_id = ? WHERE owner_id = ? AND category_id = ?",
                params![target, owner_id, id],
            )?;
            tx.execute(
                "UPDATE vendor_mappings SET category_id = ?, updated_at = CURRENT_TIMESTAMP
                 WHERE owner_id = ? AND category_id = ?",
                params![target, owner_id, id],
            )?;
        } else {
            // No transactions, but stale mappings may still point here
            tx.execute(
                "DELETE FROM vendor_mappings WHERE owner_id = ? AND category_id = ?",
                params![owner_id, id],
            )?;
        }

        tx.execute(
            "DELETE FROM categories WHERE id = ? AND owner_id = ?",
            params![id, owner_id],
        )?;
        tx.commit()?;
        Ok(())
    }
}
