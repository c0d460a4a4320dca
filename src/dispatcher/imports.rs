use anyhow::Result;
use colored::Colorize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use super::AppContext;
use crate::cli::formatters::{format_json, format_overview_table};
use crate::db::{self, LedgerStore, MemoryLedger};
use crate::importers;
use crate::ledger::Ledger;
use crate::reports::{PriceMap, ReportService};
use crate::utils::{format_amount, format_quantity};

const PREVIEW_ROWS: usize = 10;

pub fn dispatch_import(ctx: &AppContext, file: &Path, dry_run: bool) -> Result<()> {
    info!("Importing transactions from: {:?}", file);

    let transactions = importers::import_file(file, &ctx.rates())?;

    if !ctx.json {
        println!(
            "\n{} Found {} transactions\n",
            "✓".green().bold(),
            transactions.len()
        );
        print_preview(&transactions);
    }

    if dry_run {
        // prices come from an existing ledger only; a dry run never creates one
        let location = ctx.db_location()?;
        let prices = if location.exists() {
            db::open_ledger(Some(location))?.current_prices()?
        } else {
            PriceMap::new()
        };

        let ledger = MemoryLedger::new(transactions).with_prices(prices);
        let overview = ReportService::new(&ledger, ctx.rates(), ctx.policy()).overview()?;

        if ctx.json {
            println!("{}", format_json(&overview));
        } else {
            println!(
                "\n{} Dry run: {} transactions replayed, nothing saved",
                "ℹ".blue().bold(),
                ledger.len()
            );
            print!("{}", format_overview_table(&overview));
        }
        return Ok(());
    }

    let mut store = ctx.open_store()?;
    let imported = Ledger::new(&mut store, ctx.rates()).import_transactions(&transactions)?;

    if ctx.json {
        println!("{}", serde_json::json!({ "imported": imported }));
    } else {
        println!("\n{} Imported {} transactions", "✓".green().bold(), imported);
    }
    Ok(())
}

fn print_preview(transactions: &[crate::db::Transaction]) {
    #[derive(Tabled)]
    struct TransactionPreview {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Kind")]
        kind: String,
        #[tabled(rename = "Quantity")]
        quantity: String,
        #[tabled(rename = "Total")]
        total: String,
    }

    if transactions.is_empty() {
        return;
    }

    let preview: Vec<TransactionPreview> = transactions
        .iter()
        .take(PREVIEW_ROWS)
        .map(|tx| TransactionPreview {
            date: tx.timestamp.format("%Y-%m-%d").to_string(),
            ticker: tx.ticker.clone(),
            kind: tx.kind.to_string(),
            quantity: format_quantity(tx.quantity),
            total: format_amount(tx.total_value),
        })
        .collect();

    let table = Table::new(preview).with(Style::rounded()).to_string();
    println!("{}", table);

    if transactions.len() > PREVIEW_ROWS {
        println!("... and {} more\n", transactions.len() - PREVIEW_ROWS);
    }
}
