//! Vendor mapping rows
//!
//! Raw storage only; the confidence arithmetic lives in
//! `mappings::VendorMappingStore`. All read-modify-write cycles run
//! inside an immediate transaction so concurrent corrections touching
//! the same vendor serialize instead of losing updates.

use rusqlite::{params, OptionalExtension, Row, TransactionBehavior};

use super::{parse_datetime, Database};
use crate::error::{Error, Result};
use crate::models::VendorMapping;

fn mapping_from_row(row: &Row<'_>) -> rusqlite::Result<VendorMapping> {
    let created: String = row.get("created_at")?;
    let updated: String = row.get("updated_at")?;
    Ok(VendorMapping {
        id: row.get("id")?,
        owner_id: row.get("owner_id")?,
        vendor_name: row.get("vendor_name")?,
        category_id: row.get("category_id")?,
        confidence: row.get("confidence")?,
        usage_count: row.get("usage_count")?,
        created_at: parse_datetime(&created),
        updated_at: parse_datetime(&updated),
    })
}

const MAPPING_COLUMNS: &str =
    "id, owner_id, vendor_name, category_id, confidence, usage_count, created_at, updated_at";

impl Database {
    /// Look up the mapping for a normalized vendor name
    pub fn get_vendor_mapping(
        &self,
        owner_id: &str,
        vendor_name: &str,
    ) -> Result<Option<VendorMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM vendor_mappings WHERE owner_id = ? AND vendor_name = ?",
            MAPPING_COLUMNS
        );
        Ok(conn
            .query_row(&sql, params![owner_id, vendor_name], mapping_from_row)
            .optional()?)
    }

    /// List an owner's learned mappings, most-used first
    pub fn list_vendor_mappings(&self, owner_id: &str) -> Result<Vec<VendorMapping>> {
        let conn = self.conn()?;
        let sql = format!(
            "SELECT {} FROM vendor_mappings WHERE owner_id = ?
             ORDER BY usage_count DESC, vendor_name",
            MAPPING_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let mappings = stmt
            .query_map(params![owner_id], mapping_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(mappings)
    }

    /// Atomically create-or-update a mapping.
    ///
    /// `update` receives the current (category_id, confidence, usage_count)
    /// when a row exists and returns the values to store; `seed` provides
    /// (category_id, confidence) for a fresh row. The whole cycle holds an
    /// immediate transaction, serializing concurrent writers on this vendor.
    pub(crate) fn upsert_vendor_mapping<F>(
        &self,
        owner_id: &str,
        vendor_name: &str,
        seed: (i64, i64),
        update: F,
    ) -> Result<VendorMapping>
    where
        F: FnOnce((i64, i64, i64)) -> (i64, i64, i64),
    {
        if vendor_name.is_empty() {
            return Err(Error::Validation("vendor name must not be empty".to_string()));
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let current: Option<(i64, i64, i64)> = tx
            .query_row(
                "SELECT category_id, confidence, usage_count FROM vendor_mappings
                 WHERE owner_id = ? AND vendor_name = ?",
                params![owner_id, vendor_name],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        match current {
            Some(state) => {
                let (category_id, confidence, usage_count) = update(state);
                tx.execute(
                    "UPDATE vendor_mappings
                     SET category_id = ?, confidence = ?, usage_count = ?,
                         updated_at = CURRENT_TIMESTAMP
                     WHERE owner_id = ? AND vendor_name = ?",
                    params![category_id, confidence, usage_count, owner_id, vendor_name],
                )?;
            }
            None => {
                let (category_id, confidence) = seed;
                tx.execute(
                    "INSERT INTO vendor_mappings (owner_id, vendor_name, category_id, confidence, usage_count)
                     VALUES (?, ?, ?, ?, 1)",
                    params![owner_id, vendor_name, category_id, confidence],
                )?;
            }
        }
        tx.commit()?;

        self.get_vendor_mapping(owner_id, vendor_name)?
            .ok_or_else(|| Error::Invariant("vendor mapping vanished after upsert".to_string()))
    }
}
