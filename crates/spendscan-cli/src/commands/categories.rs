//! Category management commands

use anyhow::{Context, Result};
use spendscan_core::{format_cents, parse_cents, Database, NewCategory};

pub fn cmd_categories_list(db: &Database, owner: &str) -> Result<()> {
    let categories = db.list_categories(owner)?;

    println!("\n🏷  Categories");
    println!("{}", "─".repeat(60));
    for cat in &categories {
        let scope = if cat.owner_id.is_none() { "global" } else { "yours" };
        let budget = cat
            .monthly_budget_cents
            .map(|c| format!("  default budget ${}", format_cents(c)))
            .unwrap_or_default();
        println!("  #{:<4} {} {:<24} [{}]{}", cat.id, cat.icon, cat.name, scope, budget);
    }
    println!();
    Ok(())
}

pub fn cmd_categories_add(
    db: &Database,
    owner: &str,
    name: &str,
    color: &str,
    icon: &str,
    budget: Option<&str>,
) -> Result<()> {
    let monthly_budget_cents = budget
        .map(parse_cents)
        .transpose()
        .context("Invalid --budget (use e.g. 250.00)")?;

    let id = db.create_category(
        owner,
        &NewCategory {
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            monthly_budget_cents,
        },
    )?;
    println!("✅ Created category '{}' (#{})", name, id);
    Ok(())
}

pub fn cmd_categories_update(
    db: &Database,
    owner: &str,
    id: i64,
    name: &str,
    color: &str,
    icon: &str,
    budget: Option<&str>,
) -> Result<()> {
    let monthly_budget_cents = budget
        .map(parse_cents)
        .transpose()
        .context("Invalid --budget (use e.g. 250.00)")?;

    db.update_category(
        owner,
        id,
        &NewCategory {
            name: name.to_string(),
            color: color.to_string(),
            icon: icon.to_string(),
            monthly_budget_cents,
        },
    )?;
    println!("✅ Updated category #{}", id);
    Ok(())
}

pub fn cmd_categories_delete(
    db: &Database,
    owner: &str,
    id: i64,
    reassign_to: Option<i64>,
) -> Result<()> {
    db.delete_category(owner, id, reassign_to)?;
    match reassign_to {
        Some(target) => println!(
            "🗑  Deleted category #{}; its transactions moved to #{}",
            id, target
        ),
        None => println!("🗑  Deleted category #{}", id),
    }
    Ok(())
}
