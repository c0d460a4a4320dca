use anyhow::Result;
use colored::Colorize;
use rust_decimal::Decimal;

use super::{resolve_timestamp, AppContext};
use crate::cli::formatters::{format_json, format_transaction_saved, format_transactions_table};
use crate::cli::TransactionCommands;
use crate::db::{AssetType, LedgerStore, Transaction, TransactionFilter};
use crate::ledger::{Ledger, TransactionAmendment};

fn print_saved(ctx: &AppContext, action: &str, tx: &Transaction) {
    if ctx.json {
        println!("{}", format_json(tx));
    } else {
        println!("{}", format_transaction_saved(action, tx));
    }
}

pub fn dispatch_trade(
    ctx: &AppContext,
    ticker: &str,
    quantity: Decimal,
    price: Decimal,
    asset_type: AssetType,
    at: Option<&str>,
) -> Result<()> {
    let at = resolve_timestamp(at)?;
    let mut store = ctx.open_store()?;
    let tx = Ledger::new(&mut store, ctx.rates()).execute_trade(ticker, asset_type, quantity, price, at)?;
    print_saved(ctx, "Recorded", &tx);
    Ok(())
}

pub fn dispatch_cash(
    ctx: &AppContext,
    amount: Decimal,
    asset_type: AssetType,
    reason: Option<&str>,
    at: Option<&str>,
) -> Result<()> {
    let at = resolve_timestamp(at)?;
    let mut store = ctx.open_store()?;
    let tx = Ledger::new(&mut store, ctx.rates()).adjust_cash(amount, asset_type, reason, at)?;
    print_saved(ctx, "Recorded", &tx);
    Ok(())
}

pub fn dispatch_dividend(
    ctx: &AppContext,
    ticker: &str,
    amount: Decimal,
    asset_type: AssetType,
    at: Option<&str>,
) -> Result<()> {
    let at = resolve_timestamp(at)?;
    let mut store = ctx.open_store()?;
    let tx = Ledger::new(&mut store, ctx.rates()).record_cash_dividend(ticker, asset_type, amount, at)?;
    print_saved(ctx, "Recorded", &tx);
    Ok(())
}

pub fn dispatch_stock_dividend(
    ctx: &AppContext,
    ticker: &str,
    units: Decimal,
    asset_type: AssetType,
    at: Option<&str>,
) -> Result<()> {
    let at = resolve_timestamp(at)?;
    let mut store = ctx.open_store()?;
    let tx = Ledger::new(&mut store, ctx.rates()).record_stock_dividend(ticker, asset_type, units, at)?;
    print_saved(ctx, "Recorded", &tx);
    Ok(())
}

pub fn dispatch_transactions(ctx: &AppContext, action: TransactionCommands) -> Result<()> {
    match action {
        TransactionCommands::List {
            asset_type,
            ticker,
            from,
            to,
        } => {
            let filter = TransactionFilter {
                asset_type,
                ticker: ticker.as_deref().map(crate::db::normalize_ticker),
                from,
                to,
            };
            let store = ctx.open_store()?;
            let transactions = store.transactions(&filter)?;

            if ctx.json {
                println!("{}", format_json(&transactions));
            } else {
                print!("{}", format_transactions_table(&transactions));
            }
            Ok(())
        }
        TransactionCommands::Edit {
            id,
            ticker,
            asset_type,
            kind,
            quantity,
            price,
            total,
            at,
            note,
        } => {
            let changes = TransactionAmendment {
                ticker,
                asset_type,
                kind,
                quantity,
                price,
                total_value: total,
                timestamp: at.as_deref().map(|raw| resolve_timestamp(Some(raw))).transpose()?,
                note,
            };
            let mut store = ctx.open_store()?;
            let tx = Ledger::new(&mut store, ctx.rates()).amend_transaction(id, changes)?;
            print_saved(ctx, "Updated", &tx);
            Ok(())
        }
        TransactionCommands::Delete { id } => {
            let mut store = ctx.open_store()?;
            let tx = Ledger::new(&mut store, ctx.rates()).remove_transaction(id)?;
            if ctx.json {
                println!("{}", format_json(&tx));
            } else {
                println!("{} Deleted transaction #{}", "✓".green().bold(), id);
            }
            Ok(())
        }
    }
}
