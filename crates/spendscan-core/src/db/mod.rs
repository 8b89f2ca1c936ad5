//! Database access layer with connection pooling and migrations
//!
//! This module is organized by domain:
//! - `transactions` - Transaction rows and conditional status writes
//! - `categories` - Global and user-owned category operations
//! - `vendor_mappings` - Learned vendor->category mapping rows
//! - `audit` - Append-only correction audit trail
//! - `budgets` - Per-month budget records
//!
//! The `Database` is the single owner of entity storage; rows reference
//! each other by id and are keyed by owner id.

use chrono::{DateTime, Utc};
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use tracing::info;

use crate::error::{Error, Result};

mod audit;
mod budgets;
mod categories;
mod transactions;
mod vendor_mappings;

pub use audit::NewAuditCorrection;
pub use categories::FALLBACK_CATEGORY;

#[cfg(test)]
mod tests;

pub type DbPool = Pool<SqliteConnectionManager>;
pub type DbConn = PooledConnection<SqliteConnectionManager>;

/// Environment variable for database encryption key
pub const DB_KEY_ENV: &str = "SPENDSCAN_DB_KEY";

/// Derive an encryption key from a passphrase using Argon2
///
/// Uses a fixed application salt so the same passphrase always produces the same key,
/// regardless of database path. This allows moving/renaming/restoring the database freely.
fn derive_key(passphrase: &str) -> Result<String> {
    use argon2::{password_hash::SaltString, Argon2, PasswordHasher};

    // Fixed application salt - changing this would invalidate all existing encrypted databases
    const APP_SALT: &[u8; 16] = b"spendscan-salt-1";

    let salt = SaltString::encode_b64(APP_SALT)
        .map_err(|e| Error::Encryption(format!("Failed to create salt: {}", e)))?;

    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(passphrase.as_bytes(), &salt)
        .map_err(|e| Error::Encryption(format!("Failed to derive key: {}", e)))?;

    // Extract the hash portion for use as SQLCipher key (hex encoded)
    let hash_str = hash
        .hash
        .ok_or_else(|| Error::Encryption("No hash output".to_string()))?;
    Ok(hex::encode(hash_str.as_bytes()))
}

/// Parse a SQLite datetime string into a DateTime<Utc>
pub(crate) fn parse_datetime(s: &str) -> DateTime<Utc> {
    // SQLite stores as "YYYY-MM-DD HH:MM:SS" format
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|dt| dt.and_utc())
        .unwrap_or_else(|_| Utc::now())
}

/// Parse a stored calendar date ("YYYY-MM-DD")
pub(crate) fn parse_date(s: &str) -> Option<chrono::NaiveDate> {
    chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

/// Database wrapper with connection pooling
#[derive(Clone)]
pub struct Database {
    pool: DbPool,
    /// Path to the database file
    db_path: String,
}

impl Database {
    /// Create a new database connection pool with encryption
    ///
    /// Requires `SPENDSCAN_DB_KEY` environment variable to be set.
    /// The database will be encrypted using SQLCipher with a key derived
    /// from the passphrase via Argon2.
    ///
    /// Returns an error if `SPENDSCAN_DB_KEY` is not set. Use
    /// `new_unencrypted()` for development/testing without encryption.
    pub fn new(path: &str) -> Result<Self> {
        let encryption_key = std::env::var(DB_KEY_ENV).ok();
        match encryption_key {
            Some(key) => Self::new_with_key(path, Some(&key)),
            None => Err(Error::Encryption(format!(
                "Database encryption required. Set {} environment variable with your passphrase, \
                or use --no-encrypt for unencrypted databases (not recommended for production).",
                DB_KEY_ENV
            ))),
        }
    }

    /// Create a new unencrypted database connection pool
    ///
    /// WARNING: This creates an unencrypted database. Only use for development
    /// or testing. For production, use `new()` with `SPENDSCAN_DB_KEY` set.
    pub fn new_unencrypted(path: &str) -> Result<Self> {
        Self::new_with_key(path, None)
    }

    /// Create a new database with an explicit encryption key
    pub fn new_with_key(path: &str, passphrase: Option<&str>) -> Result<Self> {
        let manager = SqliteConnectionManager::file(path);

        let pool = if let Some(pass) = passphrase {
            let key = derive_key(pass)?;
            let key_pragma = format!("PRAGMA key = 'x\"{}\"';", key);

            // Set the key on every new connection
            let manager = manager.with_init(move |conn| {
                conn.execute_batch(&key_pragma)?;
                Ok(())
            });

            Pool::builder().max_size(10).build(manager)?
        } else {
            Pool::builder().max_size(10).build(manager)?
        };

        let db = Self {
            pool,
            db_path: path.to_string(),
        };
        db.run_migrations()?;

        Ok(db)
    }

    /// Get the path to the database file
    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Create an in-memory database (for testing)
    ///
    /// Note: Uses a temporary file rather than `:memory:` because SQLCipher
    /// has issues with in-memory databases in the connection pool.
    pub fn in_memory() -> Result<Self> {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);

        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        let path = format!("/tmp/spendscan_test_{}_{}.db", std::process::id(), id);

        // Remove any existing file
        let _ = std::fs::remove_file(&path);

        Self::new_unencrypted(&path)
    }

    /// Get a connection from the pool
    pub fn conn(&self) -> Result<DbConn> {
        Ok(self.pool.get()?)
    }

    /// Run database migrations
    fn run_migrations(&self) -> Result<()> {
        let conn = self.conn()?;

        conn.execute_batch(
            r#"
            -- Enable foreign keys
            PRAGMA foreign_keys = ON;

            -- WAL mode: better concurrency, readers don't block writers
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;

            -- Categories: owner_id NULL = global, shared by all users
            CREATE TABLE IF NOT EXISTS categories (
                id INTEGER PRIMARY KEY,
                owner_id TEXT,
                name TEXT NOT NULL,
                color TEXT NOT NULL,
                icon TEXT NOT NULL,
                monthly_budget_cents INTEGER,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            -- Name unique per scope; NULL owners share the global namespace,
            -- so a plain UNIQUE(owner_id, name) would not catch duplicates
            CREATE UNIQUE INDEX IF NOT EXISTS idx_categories_scope_name
                ON categories(COALESCE(owner_id, ''), name);

            -- Transactions: one receipt-derived spend record
            CREATE TABLE IF NOT EXISTS transactions (
                id INTEGER PRIMARY KEY,
                owner_id TEXT NOT NULL,
                category_id INTEGER REFERENCES categories(id),
                amount_cents INTEGER,
                date TEXT,
                vendor TEXT,
                raw_text TEXT,
                image_ref TEXT,
                parsed_json TEXT,
                confidence INTEGER,
                status TEXT NOT NULL DEFAULT 'processing',
                error_reason TEXT,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_transactions_owner_date ON transactions(owner_id, date);
            CREATE INDEX IF NOT EXISTS idx_transactions_status ON transactions(status);
            CREATE INDEX IF NOT EXISTS idx_transactions_vendor ON transactions(vendor);

            -- Learned vendor -> category mappings, one per (owner, vendor)
            CREATE TABLE IF NOT EXISTS vendor_mappings (
                id INTEGER PRIMARY KEY,
                owner_id TEXT NOT NULL,
                vendor_name TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                confidence INTEGER NOT NULL,
                usage_count INTEGER NOT NULL DEFAULT 1,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner_id, vendor_name)
            );

            CREATE INDEX IF NOT EXISTS idx_vendor_mappings_owner ON vendor_mappings(owner_id);

            -- Append-only audit trail of user corrections. No FK to
            -- transactions: audit rows outlive user-deleted transactions
            CREATE TABLE IF NOT EXISTS audit_corrections (
                id INTEGER PRIMARY KEY,
                transaction_id INTEGER NOT NULL,
                owner_id TEXT NOT NULL,
                old_category_id INTEGER REFERENCES categories(id),
                new_category_id INTEGER NOT NULL REFERENCES categories(id),
                old_vendor TEXT,
                new_vendor TEXT,
                old_amount_cents INTEGER,
                new_amount_cents INTEGER,
                correction_type TEXT NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP
            );

            CREATE INDEX IF NOT EXISTS idx_audit_transaction ON audit_corrections(transaction_id);
            CREATE INDEX IF NOT EXISTS idx_audit_owner ON audit_corrections(owner_id);

            -- Per-month budget ceilings; one row per (owner, category, month)
            CREATE TABLE IF NOT EXISTS budgets_history (
                id INTEGER PRIMARY KEY,
                owner_id TEXT NOT NULL,
                category_id INTEGER NOT NULL REFERENCES categories(id),
                month TEXT NOT NULL,
                budget_cents INTEGER NOT NULL,
                created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
                UNIQUE(owner_id, category_id, month)
            );

            CREATE INDEX IF NOT EXISTS idx_budgets_owner_month ON budgets_history(owner_id, month);
            "#,
        )?;

        self.seed_global_categories(&conn)?;

        Ok(())
    }

    /// Install the shared global category set on first run
    fn seed_global_categories(&self, conn: &DbConn) -> Result<()> {
        const SEED: &[(&str, &str, &str)] = &[
            ("Food & Dining", "#ef4444", "\u{1F37D}"),
            ("Groceries", "#22c55e", "\u{1F6D2}"),
            ("Shopping", "#3b82f6", "\u{1F6CD}"),
            ("Transport", "#f59e0b", "\u{1F697}"),
            ("Entertainment", "#a855f7", "\u{1F3AC}"),
            ("Bills & Utilities", "#64748b", "\u{1F4A1}"),
            ("Health", "#14b8a6", "\u{2695}"),
            ("Uncategorized", "#9ca3af", "\u{2753}"),
        ];

        let existing: i64 = conn.query_row(
            "SELECT COUNT(*) FROM categories WHERE owner_id IS NULL",
            [],
            |row| row.get(0),
        )?;
        if existing > 0 {
            return Ok(());
        }

        for (name, color, icon) in SEED {
            conn.execute(
                "INSERT OR IGNORE INTO categories (owner_id, name, color, icon) VALUES (NULL, ?, ?, ?)",
                rusqlite::params![name, color, icon],
            )?;
        }
        info!(count = SEED.len(), "Seeded global categories");

        Ok(())
    }
}
