//! Vendor mapping store
//!
//! The learned (owner, vendor) -> (category, confidence, usage) table
//! behind the classifier, plus its two update rules:
//!
//! - `reinforce`: agreement. usage_count += 1 and
//!   `confidence += (100 - confidence) / k`; diminishing returns, so
//!   confidence converges toward 100 without reaching it from below.
//! - `override_category`: contradiction. The category is replaced and
//!   confidence resets to the seed - the mapping is "unlearned" and
//!   starts accumulating again.
//!
//! Vendor names are normalized on every path in and out; see
//! `normalize::normalize_vendor`.

use tracing::debug;

use crate::config::CoreConfig;
use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::VendorMapping;
use crate::normalize::normalize_vendor;

#[derive(Clone)]
pub struct VendorMappingStore {
    db: Database,
    config: CoreConfig,
}

impl VendorMappingStore {
    pub fn new(db: Database, config: CoreConfig) -> Self {
        Self { db, config }
    }

    /// One reinforcement step toward 100
    fn step(&self, confidence: i64) -> i64 {
        (confidence + (100 - confidence) / self.config.reinforce_divisor).clamp(0, 100)
    }

    /// Look up the mapping for a raw vendor string
    pub fn lookup(&self, owner_id: &str, vendor_raw: &str) -> Result<Option<VendorMapping>> {
        let vendor = normalize_vendor(vendor_raw);
        if vendor.is_empty() {
            return Ok(None);
        }
        self.db.get_vendor_mapping(owner_id, &vendor)
    }

    /// Record agreement with the mapped category.
    ///
    /// Creates the mapping at the seed confidence when the vendor is
    /// novel. Never decreases confidence.
    pub fn reinforce(
        &self,
        owner_id: &str,
        vendor_raw: &str,
        category_id: i64,
    ) -> Result<VendorMapping> {
        let vendor = normalize_vendor(vendor_raw);
        if vendor.is_empty() {
            return Err(Error::Validation("vendor name must not be empty".to_string()));
        }
        let seed = self.config.confidence_seed;
        let mapping = self.db.upsert_vendor_mapping(
            owner_id,
            &vendor,
            (category_id, seed),
            |(_, confidence, usage_count)| (category_id, self.step(confidence), usage_count + 1),
        )?;
        debug!(
            vendor = %vendor,
            confidence = mapping.confidence,
            usage = mapping.usage_count,
            "Reinforced vendor mapping"
        );
        Ok(mapping)
    }

    /// Replace the mapped category and reset confidence to the seed.
    pub fn override_category(
        &self,
        owner_id: &str,
        vendor_raw: &str,
        new_category_id: i64,
    ) -> Result<VendorMapping> {
        let vendor = normalize_vendor(vendor_raw);
        if vendor.is_empty() {
            return Err(Error::Validation("vendor name must not be empty".to_string()));
        }
        let seed = self.config.confidence_seed;
        let mapping = self.db.upsert_vendor_mapping(
            owner_id,
            &vendor,
            (new_category_id, seed),
            |_| (new_category_id, seed, 1),
        )?;
        debug!(vendor = %vendor, category = new_category_id, "Overrode vendor mapping");
        Ok(mapping)
    }

    /// Learn from a confirmation: reinforce on agreement with the stored
    /// category, override on contradiction, create on a novel vendor.
    pub fn remember(
        &self,
        owner_id: &str,
        vendor_raw: &str,
        category_id: i64,
    ) -> Result<VendorMapping> {
        match self.lookup(owner_id, vendor_raw)? {
            Some(existing) if existing.category_id != category_id => {
                self.override_category(owner_id, vendor_raw, category_id)
            }
            _ => self.reinforce(owner_id, vendor_raw, category_id),
        }
    }
}
