//! CLI argument definitions using clap
//!
//! This module contains all the clap structs and enums for parsing CLI
//! arguments. The actual command implementations are in the `commands`
//! module.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Spendscan - OCR-driven receipt and budget tracker
#[derive(Parser)]
#[command(name = "spendscan")]
#[command(about = "Photograph a receipt, get a categorized transaction", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Database path
    #[arg(long, default_value = "spendscan.db", global = true)]
    pub db: PathBuf,

    /// Owner id to operate as (all data is scoped per owner)
    #[arg(long, default_value = "default", global = true)]
    pub owner: String,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable database encryption (not recommended for production)
    ///
    /// By default, the database is encrypted using SQLCipher.
    /// Set SPENDSCAN_DB_KEY environment variable with your passphrase.
    /// Use --no-encrypt only for development or testing.
    #[arg(long, global = true)]
    pub no_encrypt: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize the database
    Init,

    /// Show database status (encryption, size, row counts)
    Status,

    /// Manage receipts and their transactions
    Receipts {
        #[command(subcommand)]
        action: ReceiptsAction,
    },

    /// Manage spending categories
    Categories {
        #[command(subcommand)]
        action: Option<CategoriesAction>,
    },

    /// List learned vendor-to-category mappings
    Mappings,

    /// Manage monthly budgets
    Budget {
        #[command(subcommand)]
        action: BudgetAction,
    },

    /// Generate spending reports
    Report {
        #[command(subcommand)]
        report_type: ReportType,
    },
}

#[derive(Subcommand)]
pub enum ReceiptsAction {
    /// Upload a receipt image and run it through the pipeline
    Add {
        /// Receipt image (local path or reference the OCR service can fetch)
        file: String,

        /// Return immediately instead of waiting for processing
        #[arg(long)]
        no_wait: bool,
    },

    /// List transactions for a month
    List {
        /// Month to list (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Only show transactions in this category id
        #[arg(long)]
        category: Option<i64>,

        /// Maximum rows to show
        #[arg(long, default_value = "20")]
        limit: i64,

        /// Rows to skip (for pagination)
        #[arg(long, default_value = "0")]
        offset: i64,
    },

    /// Show processing status for one transaction
    Status { id: i64 },

    /// Confirm or correct a classified transaction
    Confirm {
        id: i64,

        /// Final category id
        #[arg(long)]
        category: i64,

        /// Final vendor name
        #[arg(long)]
        vendor: String,

        /// Final amount (e.g. 12.34)
        #[arg(long)]
        amount: String,

        /// Final purchase date (YYYY-MM-DD)
        #[arg(long)]
        date: String,

        /// Do not update the learned vendor mapping from this confirmation
        #[arg(long)]
        no_remember: bool,
    },

    /// Re-run the pipeline for an errored transaction
    Retry { id: i64 },

    /// Delete a transaction (its correction history is retained)
    Delete { id: i64 },

    /// Show the correction history for one transaction
    History { id: i64 },
}

#[derive(Subcommand)]
pub enum CategoriesAction {
    /// List categories visible to this owner
    List,

    /// Create a category
    Add {
        name: String,

        /// Display color (hex)
        #[arg(long, default_value = "#64748b")]
        color: String,

        /// Display icon
        #[arg(long, default_value = "🏷")]
        icon: String,

        /// Default monthly budget (e.g. 250.00)
        #[arg(long)]
        budget: Option<String>,
    },

    /// Update a category you own
    Update {
        id: i64,

        #[arg(long)]
        name: String,

        #[arg(long, default_value = "#64748b")]
        color: String,

        #[arg(long, default_value = "🏷")]
        icon: String,

        /// Default monthly budget (e.g. 250.00); omit to clear
        #[arg(long)]
        budget: Option<String>,
    },

    /// Delete a category you own
    Delete {
        id: i64,

        /// Move this category's transactions and mappings here first
        #[arg(long)]
        reassign_to: Option<i64>,
    },
}

#[derive(Subcommand)]
pub enum BudgetAction {
    /// Set the budget for a category and month
    Set {
        /// Category id
        #[arg(long)]
        category: i64,

        /// Month (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Budget amount (e.g. 400.00)
        #[arg(long)]
        amount: String,
    },
}

#[derive(Subcommand)]
pub enum ReportType {
    /// Budget-vs-spend by category for one month
    Spending {
        /// Month (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,
    },

    /// Top vendors by spend for one month
    Vendors {
        #[arg(long)]
        month: Option<String>,

        #[arg(long, default_value = "10")]
        limit: i64,
    },

    /// Month-over-month spend trend
    Trends {
        /// Last month of the window (YYYY-MM, defaults to the current month)
        #[arg(long)]
        month: Option<String>,

        /// Number of months in the window
        #[arg(long, default_value = "6")]
        months: u32,
    },

    /// One-screen month overview
    Dashboard {
        #[arg(long)]
        month: Option<String>,
    },

    /// Recent corrections across all transactions
    Corrections {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}
