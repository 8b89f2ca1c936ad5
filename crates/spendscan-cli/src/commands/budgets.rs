//! Monthly budget commands

use anyhow::{Context, Result};
use spendscan_core::{format_cents, month_bounds, parse_cents, Database};

use super::reports::resolve_month;

pub fn cmd_budget_set(
    db: &Database,
    owner: &str,
    category: i64,
    month: Option<&str>,
    amount: &str,
) -> Result<()> {
    let month = resolve_month(month);
    month_bounds(&month)?;
    let budget_cents = parse_cents(amount).context("Invalid --amount (use e.g. 400.00)")?;

    let cat = db.get_category(owner, category)?;
    let record = db.upsert_budget(owner, category, &month, budget_cents)?;

    println!(
        "✅ Budget for {} in {}: ${}",
        cat.name,
        record.month,
        format_cents(record.budget_cents)
    );
    Ok(())
}
