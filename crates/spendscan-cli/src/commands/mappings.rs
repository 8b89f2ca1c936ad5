//! Learned vendor mapping commands

use anyhow::Result;
use spendscan_core::{CoreConfig, Database};

use super::truncate;

pub fn cmd_mappings_list(db: &Database, owner: &str) -> Result<()> {
    let mappings = db.list_vendor_mappings(owner)?;
    if mappings.is_empty() {
        println!("No learned vendor mappings yet.");
        println!("Confirm transactions with remembering enabled to build them up.");
        return Ok(());
    }

    let threshold = CoreConfig::default().low_confidence_threshold;
    let categories = db.list_categories(owner)?;
    let name_of = |id: i64| {
        categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.clone())
            .unwrap_or_else(|| format!("#{}", id))
    };

    println!("\n🧠 Learned vendor mappings ({})", mappings.len());
    println!("{}", "─".repeat(70));
    for m in &mappings {
        let flag = if m.confidence < threshold { " ⚠️" } else { "" };
        println!(
            "  {:<28} -> {:<20} {:>3}% ({} uses){}",
            truncate(&m.vendor_name, 28),
            truncate(&name_of(m.category_id), 20),
            m.confidence,
            m.usage_count,
            flag
        );
    }
    println!();
    Ok(())
}
