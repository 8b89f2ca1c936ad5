//! Spendscan CLI - Receipt-driven spending tracker
//!
//! Usage:
//!   spendscan init                      Initialize database
//!   spendscan receipts add receipt.jpg  Upload and process a receipt
//!   spendscan receipts confirm 1 ...    Confirm or correct a transaction
//!   spendscan report dashboard          Month overview

mod cli;
mod commands;


use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::*;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).compact())
        .init();

    match cli.command {
        Commands::Init => commands::cmd_init(&cli.db, cli.no_encrypt),
        Commands::Status => commands::cmd_status(&cli.db, cli.no_encrypt).await,
        Commands::Receipts { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                ReceiptsAction::Add { file, no_wait } => {
                    let pipeline = commands::build_pipeline(&db)?;
                    commands::cmd_receipts_add(&pipeline, &cli.owner, &file, no_wait).await
                }
                ReceiptsAction::List {
                    month,
                    category,
                    limit,
                    offset,
                } => commands::cmd_receipts_list(
                    &db,
                    &cli.owner,
                    month.as_deref(),
                    category,
                    limit,
                    offset,
                ),
                ReceiptsAction::Status { id } => {
                    let pipeline = commands::build_pipeline(&db)?;
                    commands::cmd_receipts_status(&pipeline, &cli.owner, id)
                }
                ReceiptsAction::Confirm {
                    id,
                    category,
                    vendor,
                    amount,
                    date,
                    no_remember,
                } => {
                    let pipeline = commands::build_pipeline(&db)?;
                    commands::cmd_receipts_confirm(
                        &pipeline,
                        &cli.owner,
                        id,
                        category,
                        &vendor,
                        &amount,
                        &date,
                        !no_remember,
                    )
                }
                ReceiptsAction::Retry { id } => {
                    let pipeline = commands::build_pipeline(&db)?;
                    commands::cmd_receipts_retry(&pipeline, &cli.owner, id).await
                }
                ReceiptsAction::Delete { id } => {
                    let pipeline = commands::build_pipeline(&db)?;
                    commands::cmd_receipts_delete(&pipeline, &cli.owner, id)
                }
                ReceiptsAction::History { id } => {
                    commands::cmd_receipts_history(&db, &cli.owner, id)
                }
            }
        }
        Commands::Categories { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                None | Some(CategoriesAction::List) => {
                    commands::cmd_categories_list(&db, &cli.owner)
                }
                Some(CategoriesAction::Add {
                    name,
                    color,
                    icon,
                    budget,
                }) => commands::cmd_categories_add(
                    &db,
                    &cli.owner,
                    &name,
                    &color,
                    &icon,
                    budget.as_deref(),
                ),
                Some(CategoriesAction::Update {
                    id,
                    name,
                    color,
                    icon,
                    budget,
                }) => commands::cmd_categories_update(
                    &db,
                    &cli.owner,
                    id,
                    &name,
                    &color,
                    &icon,
                    budget.as_deref(),
                ),
                Some(CategoriesAction::Delete { id, reassign_to }) => {
                    commands::cmd_categories_delete(&db, &cli.owner, id, reassign_to)
                }
            }
        }
        Commands::Mappings => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            commands::cmd_mappings_list(&db, &cli.owner)
        }
        Commands::Budget { action } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match action {
                BudgetAction::Set {
                    category,
                    month,
                    amount,
                } => commands::cmd_budget_set(&db, &cli.owner, category, month.as_deref(), &amount),
            }
        }
        Commands::Report { report_type } => {
            let db = commands::open_db(&cli.db, cli.no_encrypt)?;
            match report_type {
                ReportType::Spending { month } => {
                    commands::cmd_report_spending(&db, &cli.owner, month.as_deref())
                }
                ReportType::Vendors { month, limit } => {
                    commands::cmd_report_vendors(&db, &cli.owner, month.as_deref(), limit)
                }
                ReportType::Trends { month, months } => {
                    commands::cmd_report_trends(&db, &cli.owner, month.as_deref(), months)
                }
                ReportType::Dashboard { month } => {
                    commands::cmd_report_dashboard(&db, &cli.owner, month.as_deref())
                }
                ReportType::Corrections { limit } => {
                    commands::cmd_report_corrections(&db, &cli.owner, limit)
                }
            }
        }
    }
}
