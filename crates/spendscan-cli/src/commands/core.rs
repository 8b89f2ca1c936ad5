//! Core command implementations and shared utilities
//!
//! This module contains:
//! - `open_db` / `build_pipeline` - Shared setup utilities
//! - `cmd_init` - Initialize the database
//! - `cmd_status` - Show database and OCR backend status

use std::path::Path;

use anyhow::{Context, Result};
use spendscan_core::{CoreConfig, Database, OcrBackend, OcrClient, ReceiptPipeline};

/// Open database with encryption by default, or unencrypted if --no-encrypt
pub fn open_db(db_path: &Path, no_encrypt: bool) -> Result<Database> {
    let path_str = db_path.to_string_lossy();
    if no_encrypt {
        Database::new_unencrypted(&path_str).context("Failed to open database (unencrypted)")
    } else {
        Database::new(&path_str).context("Failed to open database")
    }
}

/// Build the receipt pipeline from environment configuration
pub fn build_pipeline(db: &Database) -> Result<ReceiptPipeline> {
    let ocr = OcrClient::from_env().context(
        "No OCR backend configured. Set SPENDSCAN_OCR_HOST to your OCR service URL, \
         or OCR_BACKEND=mock for offline testing",
    )?;
    Ok(ReceiptPipeline::new(db.clone(), ocr, CoreConfig::default()))
}

pub fn cmd_init(db_path: &Path, no_encrypt: bool) -> Result<()> {
    println!("🔧 Initializing database at {}...", db_path.display());

    let db = open_db(db_path, no_encrypt)?;
    let categories = db.list_categories("default")?;
    println!("   Seeded {} default categories", categories.len());

    if no_encrypt {
        println!("   ⚠️  Encryption: DISABLED (--no-encrypt)");
    } else {
        println!("   🔒 Encryption: ENABLED");
    }

    println!("✅ Database initialized successfully!");
    println!();
    println!("Next steps:");
    println!("  1. Upload a receipt: spendscan receipts add receipt.jpg");
    println!("  2. See the month:    spendscan report dashboard");

    Ok(())
}

pub async fn cmd_status(db_path: &Path, no_encrypt: bool) -> Result<()> {
    let db = open_db(db_path, no_encrypt)?;
    let conn = db.conn()?;

    let transactions: i64 =
        conn.query_row("SELECT COUNT(*) FROM transactions", [], |row| row.get(0))?;
    let categories: i64 =
        conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    let mappings: i64 =
        conn.query_row("SELECT COUNT(*) FROM vendor_mappings", [], |row| row.get(0))?;
    let corrections: i64 =
        conn.query_row("SELECT COUNT(*) FROM audit_corrections", [], |row| row.get(0))?;
    drop(conn);

    println!();
    println!("📦 Database Status");
    println!("   Path: {}", db.path());
    println!(
        "   Encryption: {}",
        if no_encrypt { "disabled" } else { "enabled" }
    );
    if let Ok(meta) = std::fs::metadata(db.path()) {
        println!("   Size: {:.1} KB", meta.len() as f64 / 1024.0);
    }
    println!("   Transactions: {}", transactions);
    println!("   Categories: {}", categories);
    println!("   Vendor mappings: {}", mappings);
    println!("   Corrections recorded: {}", corrections);

    match OcrClient::from_env() {
        Ok(ocr) => {
            let healthy = ocr.health_check().await;
            println!();
            println!("🔍 OCR backend: {}", ocr.host());
            println!("   Health: {}", if healthy { "ok" } else { "unreachable" });
        }
        Err(_) => {
            println!();
            println!("🔍 OCR backend: not configured (set SPENDSCAN_OCR_HOST)");
        }
    }

    Ok(())
}
