//! Receipt upload and transaction lifecycle commands

use std::time::Duration;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use spendscan_core::{
    format_cents, parse_cents, ConfirmRequest, CoreConfig, Database, ReceiptPipeline, SpendReports,
    TransactionStatus,
};

use super::{reports::resolve_month, truncate};

/// How long `receipts add` waits for the pipeline before giving up
const WAIT_TIMEOUT: Duration = Duration::from_secs(120);

/// Upload a receipt and (unless --no-wait) follow it to a settled state
pub async fn cmd_receipts_add(
    pipeline: &ReceiptPipeline,
    owner: &str,
    file: &str,
    no_wait: bool,
) -> Result<()> {
    let id = pipeline.upload_receipt(owner, file)?;
    println!("📤 Receipt accepted as transaction #{}", id);

    if no_wait {
        println!("   Check progress with: spendscan receipts status {}", id);
        return Ok(());
    }

    print!("   Processing");
    let deadline = tokio::time::Instant::now() + WAIT_TIMEOUT;
    loop {
        let view = pipeline.get_status(owner, id)?;
        match view.status {
            TransactionStatus::Processing | TransactionStatus::Parsed => {
                if tokio::time::Instant::now() >= deadline {
                    println!();
                    println!("⏳ Still processing after {}s; check back with:", WAIT_TIMEOUT.as_secs());
                    println!("   spendscan receipts status {}", id);
                    return Ok(());
                }
                print!(".");
                use std::io::Write;
                std::io::stdout().flush().ok();
                tokio::time::sleep(Duration::from_millis(200)).await;
            }
            _ => {
                println!();
                break;
            }
        }
    }

    print_transaction(pipeline, owner, id)
}

/// Show one transaction's processing state
pub fn cmd_receipts_status(pipeline: &ReceiptPipeline, owner: &str, id: i64) -> Result<()> {
    print_transaction(pipeline, owner, id)
}

fn print_transaction(pipeline: &ReceiptPipeline, owner: &str, id: i64) -> Result<()> {
    let view = pipeline.get_status(owner, id)?;
    let config = CoreConfig::default();

    match view.status {
        TransactionStatus::Processing | TransactionStatus::Parsed => {
            println!("⏳ Transaction #{}: {}", id, view.status);
        }
        TransactionStatus::Classified => {
            let confidence = view.confidence.unwrap_or(0);
            let flag = if confidence < config.low_confidence_threshold {
                " ⚠️  needs review"
            } else {
                ""
            };
            println!(
                "🏷  Transaction #{}: classified at {}% confidence{}",
                id, confidence, flag
            );
            println!(
                "   Confirm with: spendscan receipts confirm {} --category <id> --vendor <name> --amount <n.nn> --date <YYYY-MM-DD>",
                id
            );
        }
        TransactionStatus::Confirmed | TransactionStatus::Corrected => {
            println!("✅ Transaction #{}: {}", id, view.status);
        }
        TransactionStatus::Error => {
            println!(
                "❌ Transaction #{}: error - {}",
                id,
                view.error_reason.as_deref().unwrap_or("unknown")
            );
            println!("   Retry with: spendscan receipts retry {}", id);
        }
    }
    Ok(())
}

/// Confirm or correct a classified transaction
#[allow(clippy::too_many_arguments)]
pub fn cmd_receipts_confirm(
    pipeline: &ReceiptPipeline,
    owner: &str,
    id: i64,
    category: i64,
    vendor: &str,
    amount: &str,
    date: &str,
    remember: bool,
) -> Result<()> {
    let amount_cents = parse_cents(amount).context("Invalid --amount (use e.g. 12.34)")?;
    let date = NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .context("Invalid --date format (use YYYY-MM-DD)")?;

    let tx = pipeline.confirm(
        owner,
        id,
        &ConfirmRequest {
            category_id: category,
            vendor: vendor.to_string(),
            amount_cents,
            date,
            remember_vendor: remember,
        },
    )?;

    match tx.status {
        TransactionStatus::Confirmed => println!("✅ Transaction #{} confirmed", id),
        _ => println!("✏️  Transaction #{} corrected", id),
    }
    if remember {
        println!("   Vendor mapping updated for '{}'", vendor);
    }
    Ok(())
}

/// Re-run the pipeline for an errored transaction
pub async fn cmd_receipts_retry(pipeline: &ReceiptPipeline, owner: &str, id: i64) -> Result<()> {
    println!("🔄 Retrying transaction #{}...", id);
    pipeline.retry(owner, id).await?;
    print_transaction(pipeline, owner, id)
}

/// Delete a transaction
pub fn cmd_receipts_delete(pipeline: &ReceiptPipeline, owner: &str, id: i64) -> Result<()> {
    pipeline.delete(owner, id)?;
    println!("🗑  Transaction #{} deleted (correction history retained)", id);
    Ok(())
}

/// List a month's transactions
pub fn cmd_receipts_list(
    db: &Database,
    owner: &str,
    month: Option<&str>,
    category: Option<i64>,
    limit: i64,
    offset: i64,
) -> Result<()> {
    let month = resolve_month(month);
    let reports = SpendReports::new(db.clone());
    let page = reports.list_transactions(owner, &month, category, limit, offset)?;

    if page.items.is_empty() {
        println!("No transactions in {}", month);
        return Ok(());
    }

    println!("\n🧾 Transactions for {} ({} total)", month, page.total);
    println!("{}", "─".repeat(70));

    for tx in &page.items {
        let vendor = tx.vendor.as_deref().unwrap_or("(no vendor)");
        let amount = tx
            .amount_cents
            .map(|c| format!("${}", format_cents(c)))
            .unwrap_or_else(|| "-".to_string());
        let date = tx.date.map(|d| d.to_string()).unwrap_or_default();
        println!(
            "  #{:<5} {:10} {:<28} {:>10}  [{}]",
            tx.id,
            date,
            truncate(vendor, 28),
            amount,
            tx.status
        );
        if let Some(reason) = &tx.error_reason {
            println!("         ❌ {}", reason);
        }
    }

    if page.has_more {
        println!();
        println!(
            "  ... more rows; use --offset {} to continue",
            offset + page.items.len() as i64
        );
    }
    println!();
    Ok(())
}

/// Show the correction history for one transaction
pub fn cmd_receipts_history(db: &Database, owner: &str, id: i64) -> Result<()> {
    let corrections = db.list_transaction_corrections(owner, id)?;
    if corrections.is_empty() {
        println!("No corrections recorded for transaction #{}", id);
        return Ok(());
    }

    println!("\n📜 Corrections for transaction #{}", id);
    println!("{}", "─".repeat(70));
    for c in &corrections {
        println!(
            "  {} [{}]",
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.correction_type
        );
        if c.old_category_id != Some(c.new_category_id) {
            println!(
                "     category: {} -> {}",
                c.old_category_id
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "none".to_string()),
                c.new_category_id
            );
        }
        if c.old_vendor != c.new_vendor {
            println!(
                "     vendor:   {} -> {}",
                c.old_vendor.as_deref().unwrap_or("none"),
                c.new_vendor.as_deref().unwrap_or("none")
            );
        }
        if c.old_amount_cents != c.new_amount_cents {
            println!(
                "     amount:   {} -> {}",
                c.old_amount_cents.map(format_cents).unwrap_or_else(|| "none".to_string()),
                c.new_amount_cents.map(format_cents).unwrap_or_else(|| "none".to_string())
            );
        }
    }
    println!();
    Ok(())
}
