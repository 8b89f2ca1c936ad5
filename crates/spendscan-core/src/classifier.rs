//! Vendor -> category classifier
//!
//! A deterministic, explainable rule: normalized-vendor lookup against
//! the mapping store, with a zero-confidence fallback when no mapping
//! exists. Absence of a mapping is a normal case, not an error, so the
//! state machine can always progress to `classified`.

use tracing::debug;

use crate::config::CoreConfig;
use crate::db::Database;
use crate::error::Result;
use crate::mappings::VendorMappingStore;
use crate::models::CategorySuggestion;

#[derive(Clone)]
pub struct Classifier {
    db: Database,
    mappings: VendorMappingStore,
    config: CoreConfig,
}

impl Classifier {
    pub fn new(db: Database, config: CoreConfig) -> Self {
        let mappings = VendorMappingStore::new(db.clone(), config.clone());
        Self {
            db,
            mappings,
            config,
        }
    }

    /// Suggest a category for a vendor string.
    ///
    /// Mapping hit: the mapping's (category, confidence). Miss, or no
    /// detectable vendor text: the global fallback category at the
    /// configured fallback confidence. The `needs_review` flag tells the
    /// UI to flag low-confidence suggestions; the backend never
    /// auto-confirms on the user's behalf.
    pub fn classify(&self, owner_id: &str, vendor_raw: &str) -> Result<CategorySuggestion> {
        let suggestion = match self.mappings.lookup(owner_id, vendor_raw)? {
            Some(mapping) => {
                debug!(
                    vendor = %mapping.vendor_name,
                    category = mapping.category_id,
                    confidence = mapping.confidence,
                    "Classified from vendor mapping"
                );
                CategorySuggestion {
                    category_id: mapping.category_id,
                    confidence: mapping.confidence,
                    needs_review: mapping.confidence < self.config.low_confidence_threshold,
                }
            }
            None => {
                let fallback = self.db.fallback_category_id()?;
                debug!(vendor = %vendor_raw, "No mapping, using fallback category");
                CategorySuggestion {
                    category_id: fallback,
                    confidence: self.config.fallback_confidence,
                    needs_review: true,
                }
            }
        };
        Ok(suggestion)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mappings::VendorMappingStore;

    fn classifier() -> (Classifier, Database) {
        let db = Database::in_memory().unwrap();
        (Classifier::new(db.clone(), CoreConfig::default()), db)
    }

    #[test]
    fn test_unknown_vendor_falls_back() {
        let (classifier, db) = classifier();
        let suggestion = classifier.classify("u1", "NEVER SEEN LLC").unwrap();
        assert_eq!(suggestion.category_id, db.fallback_category_id().unwrap());
        assert_eq!(suggestion.confidence, 0);
        assert!(suggestion.needs_review);
    }

    #[test]
    fn test_empty_vendor_falls_back() {
        let (classifier, db) = classifier();
        let suggestion = classifier.classify("u1", "").unwrap();
        assert_eq!(suggestion.category_id, db.fallback_category_id().unwrap());
        assert_eq!(suggestion.confidence, 0);
    }

    #[test]
    fn test_mapping_hit_carries_confidence() {
        let (classifier, db) = classifier();
        let store = VendorMappingStore::new(db.clone(), CoreConfig::default());
        let cats = db.list_categories("u1").unwrap();
        let food = cats.iter().find(|c| c.name == "Food & Dining").unwrap().id;

        store.remember("u1", "STARBUCKS #4521", food).unwrap();

        let suggestion = classifier.classify("u1", "starbucks  #4521").unwrap();
        assert_eq!(suggestion.category_id, food);
        assert_eq!(suggestion.confidence, 50);
        // Seed 50 is below the default threshold of 70
        assert!(suggestion.needs_review);
    }

    #[test]
    fn test_high_confidence_skips_review_flag() {
        let (classifier, db) = classifier();
        let store = VendorMappingStore::new(db.clone(), CoreConfig::default());
        let food = db.list_categories("u1").unwrap()[0].id;

        // 50 -> 62 -> 71: third reinforcement crosses the threshold
        for _ in 0..3 {
            store.remember("u1", "starbucks", food).unwrap();
        }

        let suggestion = classifier.classify("u1", "starbucks").unwrap();
        assert_eq!(suggestion.confidence, 71);
        assert!(!suggestion.needs_review);
    }
}
