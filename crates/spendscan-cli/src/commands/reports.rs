//! Report command implementations

use anyhow::Result;
use chrono::{Datelike, Utc};
use spendscan_core::{format_cents, Database, SpendReports};

use super::truncate;

/// Resolve an optional month argument, defaulting to the current month
pub fn resolve_month(month: Option<&str>) -> String {
    match month {
        Some(m) => m.to_string(),
        None => {
            let today = Utc::now().date_naive();
            format!("{:04}-{:02}", today.year(), today.month())
        }
    }
}

/// Render a simple usage bar like `[██████----]`
fn usage_bar(percentage: f64) -> String {
    let filled = ((percentage / 10.0).round() as usize).min(10);
    format!("[{}{}]", "█".repeat(filled), "-".repeat(10 - filled))
}

pub fn cmd_report_spending(db: &Database, owner: &str, month: Option<&str>) -> Result<()> {
    let month = resolve_month(month);
    let reports = SpendReports::new(db.clone());
    let lines = reports.budget_vs_spend(owner, &month)?;

    println!();
    println!("📊 Budget vs Spend - {}", month);
    println!("{}", "─".repeat(70));

    if lines.is_empty() {
        println!("  No budgets and no settled spending this month.");
        println!();
        return Ok(());
    }

    for line in &lines {
        match line.percentage_used {
            Some(pct) => {
                let over = if line.remaining_cents < 0 { " ⚠️  OVER" } else { "" };
                println!(
                    "  {:<22} ${:>9} of ${:>9}  {} {:>5.1}%{}",
                    truncate(&line.category_name, 22),
                    format_cents(line.spent_cents),
                    format_cents(line.budget_cents),
                    usage_bar(pct),
                    pct,
                    over
                );
            }
            None => {
                println!(
                    "  {:<22} ${:>9}  (no budget set)",
                    truncate(&line.category_name, 22),
                    format_cents(line.spent_cents)
                );
            }
        }
    }
    println!();
    Ok(())
}

pub fn cmd_report_vendors(
    db: &Database,
    owner: &str,
    month: Option<&str>,
    limit: i64,
) -> Result<()> {
    let month = resolve_month(month);
    let reports = SpendReports::new(db.clone());
    let vendors = reports.top_vendors(owner, &month, limit)?;

    println!();
    println!("🏪 Top Vendors - {}", month);
    println!("{}", "─".repeat(60));

    if vendors.is_empty() {
        println!("  No settled spending this month.");
    }
    for (rank, v) in vendors.iter().enumerate() {
        println!(
            "  {:>2}. {:<30} ${:>9}  ({} transactions)",
            rank + 1,
            truncate(&v.vendor, 30),
            format_cents(v.amount_cents),
            v.transaction_count
        );
    }
    println!();
    Ok(())
}

pub fn cmd_report_trends(
    db: &Database,
    owner: &str,
    month: Option<&str>,
    months: u32,
) -> Result<()> {
    let month = resolve_month(month);
    let reports = SpendReports::new(db.clone());
    let trends = reports.monthly_trends(owner, &month, months)?;

    println!();
    println!("📈 Spending Trend (last {} months)", months);
    println!("{}", "─".repeat(60));

    for t in &trends {
        let delta = match (t.delta_cents, t.delta_percent) {
            (Some(d), Some(pct)) => {
                let arrow = if d > 0 { "▲" } else if d < 0 { "▼" } else { "=" };
                format!("  {} ${} ({:+.1}%)", arrow, format_cents(d.abs()), pct)
            }
            (Some(d), None) => format!("  ▲ ${}", format_cents(d.abs())),
            _ => String::new(),
        };
        println!("  {}  ${:>10}{}", t.month, format_cents(t.total_cents), delta);
    }
    println!();
    Ok(())
}

pub fn cmd_report_dashboard(db: &Database, owner: &str, month: Option<&str>) -> Result<()> {
    let month = resolve_month(month);
    let reports = SpendReports::new(db.clone());
    let summary = reports.dashboard_summary(owner, &month)?;

    println!();
    println!("🗓  {} at a glance", summary.month);
    println!("{}", "─".repeat(60));
    println!(
        "  Total spent: ${}  across {} transactions",
        format_cents(summary.total_spent_cents),
        summary.transaction_count
    );

    if !summary.categories.is_empty() {
        println!();
        println!("  By category:");
        for line in &summary.categories {
            let pct = line
                .percentage_used
                .map(|p| format!("  ({:.0}% of budget)", p))
                .unwrap_or_default();
            println!(
                "    {:<22} ${:>9}{}",
                truncate(&line.category_name, 22),
                format_cents(line.spent_cents),
                pct
            );
        }
    }

    if !summary.top_vendors.is_empty() {
        println!();
        println!("  Top vendors:");
        for v in &summary.top_vendors {
            println!(
                "    {:<30} ${:>9}",
                truncate(&v.vendor, 30),
                format_cents(v.amount_cents)
            );
        }
    }
    println!();
    Ok(())
}

pub fn cmd_report_corrections(db: &Database, owner: &str, limit: i64) -> Result<()> {
    let corrections = db.list_audit_corrections(owner, limit)?;
    if corrections.is_empty() {
        println!("No corrections recorded yet.");
        return Ok(());
    }

    println!();
    println!("📜 Recent corrections ({})", corrections.len());
    println!("{}", "─".repeat(70));
    for c in &corrections {
        println!(
            "  #{:<5} tx #{:<5} {} [{}]",
            c.id,
            c.transaction_id,
            c.created_at.format("%Y-%m-%d %H:%M"),
            c.correction_type
        );
    }
    println!();
    Ok(())
}
