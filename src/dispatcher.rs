//! Command dispatcher that routes parsed clap commands to their handlers.
//!
//! Handlers open the ledger through [`AppContext`], so the database path and
//! configuration are resolved in one place.

mod imports;
mod prices;
mod reports;
mod transactions;

use anyhow::Result;
use chrono::{DateTime, Utc};
use colored::Colorize;
use std::path::PathBuf;
use tracing::info;

use crate::cli::{Cli, Commands};
use crate::config::Config;
use crate::db::{self, SqliteStore};
use crate::importers::csv_feed::parse_timestamp;
use crate::reports::{RankingPolicy, Rates};

/// Resolved global options shared by every handler
pub struct AppContext {
    db_override: Option<PathBuf>,
    pub config: Config,
    pub json: bool,
}

impl AppContext {
    pub fn new(db_override: Option<PathBuf>, config: Config, json: bool) -> Self {
        Self {
            db_override,
            config,
            json,
        }
    }

    /// `--db` wins over the config file; `None` means the default location
    pub fn db_path(&self) -> Option<PathBuf> {
        self.db_override
            .clone()
            .or_else(|| self.config.database.clone())
    }

    /// Database path without creating any directory
    pub fn db_location(&self) -> Result<PathBuf> {
        match self.db_path() {
            Some(path) => Ok(path),
            None => db::default_db_location(),
        }
    }

    pub fn open_store(&self) -> Result<SqliteStore> {
        SqliteStore::open(self.db_path())
    }

    pub fn rates(&self) -> Rates {
        self.config.rates
    }

    pub fn policy(&self) -> RankingPolicy {
        self.config.report
    }
}

/// Route a parsed command to its handler
pub fn dispatch_command(cli: Cli, config: Config) -> Result<()> {
    let ctx = AppContext::new(cli.db, config, cli.json);

    match cli.command {
        Commands::Init => dispatch_init(&ctx),
        Commands::Trade {
            ticker,
            quantity,
            price,
            asset_type,
            at,
        } => transactions::dispatch_trade(&ctx, &ticker, quantity, price, asset_type, at.as_deref()),
        Commands::Cash {
            amount,
            asset_type,
            reason,
            at,
        } => transactions::dispatch_cash(&ctx, amount, asset_type, reason.as_deref(), at.as_deref()),
        Commands::Dividend {
            ticker,
            amount,
            asset_type,
            at,
        } => transactions::dispatch_dividend(&ctx, &ticker, amount, asset_type, at.as_deref()),
        Commands::StockDividend {
            ticker,
            units,
            asset_type,
            at,
        } => transactions::dispatch_stock_dividend(&ctx, &ticker, units, asset_type, at.as_deref()),
        Commands::Transactions { action } => transactions::dispatch_transactions(&ctx, action),
        Commands::Price { action } => prices::dispatch_prices(&ctx, action),
        Commands::Report { action } => reports::dispatch_report(&ctx, action),
        Commands::Import { file, dry_run } => imports::dispatch_import(&ctx, &file, dry_run),
    }
}

fn dispatch_init(ctx: &AppContext) -> Result<()> {
    let path = match ctx.db_path() {
        Some(path) => path,
        None => db::get_default_db_path()?,
    };
    db::init_database(Some(path.clone()))?;
    info!(?path, "ledger ready");

    if ctx.json {
        println!("{}", serde_json::json!({ "database": path }));
    } else {
        println!("{} Ledger ready at {}", "✓".green().bold(), path.display());
    }
    Ok(())
}

/// `--at` value or now
pub(crate) fn resolve_timestamp(at: Option<&str>) -> Result<DateTime<Utc>> {
    match at {
        Some(raw) => parse_timestamp(raw),
        None => Ok(Utc::now()),
    }
}
