use anyhow::Result;
use chrono::Utc;
use colored::Colorize;
use serde::Serialize;

use super::AppContext;
use crate::cli::formatters::{format_json, format_prices_table};
use crate::cli::PriceCommands;
use crate::db::{self, normalize_ticker};
use crate::ledger::Ledger;
use crate::utils::format_amount;

pub fn dispatch_prices(ctx: &AppContext, action: PriceCommands) -> Result<()> {
    match action {
        PriceCommands::Set { ticker, price } => {
            let mut store = ctx.open_store()?;
            Ledger::new(&mut store, ctx.rates()).set_price(&ticker, price, Utc::now())?;

            let ticker = normalize_ticker(&ticker);
            if ctx.json {
                println!("{}", serde_json::json!({ "ticker": ticker, "price": price }));
            } else {
                println!(
                    "{} {} price set to {}",
                    "✓".green().bold(),
                    ticker.cyan().bold(),
                    format_amount(price)
                );
            }
            Ok(())
        }
        PriceCommands::List => {
            let store = ctx.open_store()?;
            let prices = db::list_prices(store.conn())?;

            if ctx.json {
                #[derive(Serialize)]
                struct PriceEntry<'a> {
                    ticker: &'a str,
                    price: rust_decimal::Decimal,
                    updated_at: chrono::DateTime<Utc>,
                }
                let entries: Vec<PriceEntry> = prices
                    .iter()
                    .map(|(ticker, price, updated_at)| PriceEntry {
                        ticker,
                        price: *price,
                        updated_at: *updated_at,
                    })
                    .collect();
                println!("{}", format_json(&entries));
            } else {
                print!("{}", format_prices_table(&prices));
            }
            Ok(())
        }
    }
}
