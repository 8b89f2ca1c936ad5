//! CLI command implementations
//!
//! Commands are organized by domain:
//! - `budgets` - Monthly budget commands
//! - `categories` - Category management commands
//! - `core` - Core commands (init, status) and shared utilities (open_db)
//! - `mappings` - Learned vendor mapping commands
//! - `receipts` - Receipt upload and transaction lifecycle commands
//! - `reports` - Report generation commands

pub mod budgets;
pub mod categories;
pub mod core;
pub mod mappings;
pub mod receipts;
pub mod reports;

// Re-export command functions for main.rs
pub use budgets::*;
pub use categories::*;
pub use core::*;
pub use mappings::*;
pub use receipts::*;
pub use reports::*;

/// Truncate a string to a maximum character count, adding "..." if truncated
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let keep = max.saturating_sub(3);
        let cut = s
            .char_indices()
            .nth(keep)
            .map_or(s.len(), |(byte_idx, _)| byte_idx);
        format!("{}...", &s[..cut])
    }
}
