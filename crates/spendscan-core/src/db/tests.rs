//! Database tests

use super::*;
use crate::models::*;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rusqlite::params;

    const OWNER: &str = "user-1";

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_in_memory_db_seeds_global_categories() {
        let db = Database::in_memory().unwrap();
        let categories = db.list_categories(OWNER).unwrap();
        assert_eq!(categories.len(), 8);
        assert!(categories.iter().all(|c| c.owner_id.is_none()));
        assert!(categories.iter().any(|c| c.name == FALLBACK_CATEGORY));
    }

    #[test]
    fn test_seed_runs_once() {
        let db = Database::in_memory().unwrap();
        // Re-running migrations against the same file must not duplicate
        let db2 = Database::new_unencrypted(db.path()).unwrap();
        assert_eq!(db2.list_categories(OWNER).unwrap().len(), 8);
    }

    #[test]
    fn test_transactions_schema() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();

        let result: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM pragma_table_info('transactions') WHERE name IN \
                 ('id', 'owner_id', 'category_id', 'amount_cents', 'date', 'vendor', \
                  'raw_text', 'image_ref', 'parsed_json', 'confidence', 'status', \
                  'error_reason', 'created_at', 'updated_at')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(result, 14, "transactions table should have 14 expected columns");
    }

    #[test]
    fn test_transaction_lifecycle_writes() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();

        let id = db.insert_processing_transaction(OWNER, "img-1.jpg").unwrap();
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert_eq!(tx.image_ref.as_deref(), Some("img-1.jpg"));

        assert!(db
            .apply_parsed(OWNER, id, "STARBUCKS", 575, date("2024-03-10"), "raw", None)
            .unwrap());
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Parsed);
        assert_eq!(tx.amount_cents, Some(575));
        assert_eq!(tx.date, Some(date("2024-03-10")));

        assert!(db.apply_classified(OWNER, id, food, 50).unwrap());
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Classified);
        assert_eq!(tx.confidence, Some(50));
    }

    #[test]
    fn test_conditional_writes_reject_wrong_source_state() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();

        // classify before parse: zero rows
        assert!(!db.apply_classified(OWNER, id, food, 50).unwrap());

        assert!(db
            .apply_parsed(OWNER, id, "X", 100, date("2024-03-10"), "raw", None)
            .unwrap());
        // second parse: already left processing
        assert!(!db
            .apply_parsed(OWNER, id, "Y", 200, date("2024-03-11"), "raw2", None)
            .unwrap());

        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.vendor.as_deref(), Some("X"));
    }

    #[test]
    fn test_error_and_retry_transitions() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();

        assert!(db.mark_transaction_error(OWNER, id, "OCR timed out").unwrap());
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Error);
        assert_eq!(tx.error_reason.as_deref(), Some("OCR timed out"));

        // error is sticky against another error write
        assert!(!db.mark_transaction_error(OWNER, id, "again").unwrap());

        assert!(db.reenter_processing(OWNER, id).unwrap());
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.status, TransactionStatus::Processing);
        assert!(tx.error_reason.is_none());

        // a row stuck in processing may re-enter too (orphaned task)
        assert!(db.reenter_processing(OWNER, id).unwrap());

        // but not once it has moved on
        db.apply_parsed(OWNER, id, "X", 100, date("2024-03-10"), "raw", None)
            .unwrap();
        assert!(!db.reenter_processing(OWNER, id).unwrap());
    }

    #[test]
    fn test_terminal_states_reject_error() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();
        db.apply_parsed(OWNER, id, "X", 100, date("2024-03-10"), "raw", None)
            .unwrap();
        db.apply_classified(OWNER, id, food, 50).unwrap();
        db.finalize_confirmation(
            OWNER,
            id,
            TransactionStatus::Confirmed,
            food,
            "X",
            100,
            date("2024-03-10"),
        )
        .unwrap();

        assert!(!db.mark_transaction_error(OWNER, id, "too late").unwrap());
        assert!(!db.reenter_processing(OWNER, id).unwrap());
    }

    #[test]
    fn test_get_transaction_owner_scoping() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();

        let err = db.get_transaction("someone-else", id).unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn test_delete_transaction() {
        let db = Database::in_memory().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();

        db.delete_transaction(OWNER, id).unwrap();
        assert!(matches!(
            db.get_transaction(OWNER, id).unwrap_err(),
            Error::NotFound(_)
        ));
        assert!(matches!(
            db.delete_transaction(OWNER, id).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_category_crud() {
        let db = Database::in_memory().unwrap();

        let id = db
            .create_category(
                OWNER,
                &NewCategory {
                    name: "Coffee".to_string(),
                    color: "#92400e".to_string(),
                    icon: "\u{2615}".to_string(),
                    monthly_budget_cents: Some(5000),
                },
            )
            .unwrap();
        assert!(id > 0);

        let cat = db.get_category(OWNER, id).unwrap();
        assert_eq!(cat.name, "Coffee");
        assert_eq!(cat.monthly_budget_cents, Some(5000));

        // Owned categories list after the globals
        let categories = db.list_categories(OWNER).unwrap();
        assert_eq!(categories.len(), 9);
        assert_eq!(categories.last().map(|c| c.name.as_str()), Some("Coffee"));

        // Not visible to other owners
        assert!(db.get_category("someone-else", id).is_err());

        db.update_category(
            OWNER,
            id,
            &NewCategory {
                name: "Cafés".to_string(),
                color: "#92400e".to_string(),
                icon: "\u{2615}".to_string(),
                monthly_budget_cents: None,
            },
        )
        .unwrap();
        assert_eq!(db.get_category(OWNER, id).unwrap().name, "Cafés");

        db.delete_category(OWNER, id, None).unwrap();
        assert!(db.get_category(OWNER, id).is_err());
    }

    #[test]
    fn test_duplicate_category_name_conflicts() {
        let db = Database::in_memory().unwrap();
        let new = NewCategory {
            name: "Coffee".to_string(),
            color: "#000".to_string(),
            icon: "c".to_string(),
            monthly_budget_cents: None,
        };
        db.create_category(OWNER, &new).unwrap();
        assert!(matches!(
            db.create_category(OWNER, &new).unwrap_err(),
            Error::Conflict(_)
        ));
        // The owner scope is distinct from the global scope, so an owned
        // category may shadow a global name
        let shadow = NewCategory {
            name: "Groceries".to_string(),
            ..new
        };
        db.create_category(OWNER, &shadow).unwrap();
    }

    #[test]
    fn test_global_categories_are_read_only() {
        let db = Database::in_memory().unwrap();
        let fallback = db.fallback_category_id().unwrap();

        let err = db
            .update_category(
                OWNER,
                fallback,
                &NewCategory {
                    name: "Renamed".to_string(),
                    color: "#000".to_string(),
                    icon: "x".to_string(),
                    monthly_budget_cents: None,
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert!(matches!(
            db.delete_category(OWNER, fallback, None).unwrap_err(),
            Error::NotFound(_)
        ));
    }

    #[test]
    fn test_delete_category_in_use_requires_reassignment() {
        let db = Database::in_memory().unwrap();
        let fallback = db.fallback_category_id().unwrap();
        let coffee = db
            .create_category(
                OWNER,
                &NewCategory {
                    name: "Coffee".to_string(),
                    color: "#000".to_string(),
                    icon: "c".to_string(),
                    monthly_budget_cents: None,
                },
            )
            .unwrap();

        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();
        db.apply_parsed(OWNER, id, "STARBUCKS", 575, date("2024-03-10"), "raw", None)
            .unwrap();
        db.apply_classified(OWNER, id, coffee, 50).unwrap();

        assert!(matches!(
            db.delete_category(OWNER, coffee, None).unwrap_err(),
            Error::Conflict(_)
        ));

        db.delete_category(OWNER, coffee, Some(fallback)).unwrap();
        let tx = db.get_transaction(OWNER, id).unwrap();
        assert_eq!(tx.category_id, Some(fallback));
    }

    #[test]
    fn test_vendor_mapping_unique_per_owner() {
        let db = Database::in_memory().unwrap();
        let conn = db.conn().unwrap();
        let food = db.fallback_category_id().unwrap();

        conn.execute(
            "INSERT INTO vendor_mappings (owner_id, vendor_name, category_id, confidence)
             VALUES (?, ?, ?, ?)",
            params![OWNER, "starbucks", food, 50],
        )
        .unwrap();
        // Same vendor, same owner: constraint violation
        assert!(conn
            .execute(
                "INSERT INTO vendor_mappings (owner_id, vendor_name, category_id, confidence)
                 VALUES (?, ?, ?, ?)",
                params![OWNER, "starbucks", food, 50],
            )
            .is_err());
        // Same vendor, different owner: fine
        conn.execute(
            "INSERT INTO vendor_mappings (owner_id, vendor_name, category_id, confidence)
             VALUES (?, ?, ?, ?)",
            params!["user-2", "starbucks", food, 50],
        )
        .unwrap();
    }

    #[test]
    fn test_audit_rows_survive_transaction_deletion() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();
        let id = db.insert_processing_transaction(OWNER, "img.jpg").unwrap();

        db.insert_audit_correction(&NewAuditCorrection {
            transaction_id: id,
            owner_id: OWNER.to_string(),
            old_category_id: None,
            new_category_id: food,
            old_vendor: None,
            new_vendor: Some("STARBUCKS".to_string()),
            old_amount_cents: None,
            new_amount_cents: Some(575),
            correction_type: CorrectionType::All,
        })
        .unwrap();

        db.delete_transaction(OWNER, id).unwrap();
        let audit = db.list_transaction_corrections(OWNER, id).unwrap();
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].new_amount_cents, Some(575));
    }

    #[test]
    fn test_budget_upsert_overwrites_month_only() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();

        db.upsert_budget(OWNER, food, "2024-02", 5000).unwrap();
        let b = db.upsert_budget(OWNER, food, "2024-03", 6000).unwrap();
        assert_eq!(b.budget_cents, 6000);

        db.upsert_budget(OWNER, food, "2024-03", 7000).unwrap();
        assert_eq!(
            db.get_budget(OWNER, food, "2024-03").unwrap().unwrap().budget_cents,
            7000
        );
        // Prior month snapshot untouched
        assert_eq!(
            db.get_budget(OWNER, food, "2024-02").unwrap().unwrap().budget_cents,
            5000
        );
        assert_eq!(db.list_budgets_for_month(OWNER, "2024-03").unwrap().len(), 1);
    }

    #[test]
    fn test_negative_budget_rejected() {
        let db = Database::in_memory().unwrap();
        let food = db.fallback_category_id().unwrap();
        assert!(matches!(
            db.upsert_budget(OWNER, food, "2024-03", -1).unwrap_err(),
            Error::Validation(_)
        ));
    }
}
