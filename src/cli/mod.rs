use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;

use crate::db::{AssetType, TransactionKind};
use crate::reports::Period;

pub mod formatters;

#[derive(Parser)]
#[command(name = "tally")]
#[command(
    version,
    about = "Portfolio ledger with weighted-average cost accounting and P&L reports"
)]
#[command(
    long_about = "Record deposits, withdrawals, trades and dividends across stocks, crypto and other assets, then report net worth, allocation, realized/unrealized P&L and top movers."
)]
pub struct Cli {
    /// Ledger database (default: ~/.tally/ledger.db or the config file setting)
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create the ledger database
    Init,

    /// Buy (positive quantity) or sell (negative quantity) an asset
    Trade {
        /// Ticker symbol (e.g., AAPL, BTC)
        ticker: String,

        /// Signed quantity: > 0 buys, < 0 sells
        #[arg(allow_negative_numbers = true)]
        quantity: Decimal,

        /// Native unit price
        price: Decimal,

        /// Asset category (STOCK, CRYPTO, OTHER)
        #[arg(short = 't', long = "type", default_value = "STOCK", value_parser = parse_asset_type)]
        asset_type: AssetType,

        /// When it happened (RFC 3339 or YYYY-MM-DD, default now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Deposit (positive) or withdraw (negative) cash
    Cash {
        #[arg(allow_negative_numbers = true)]
        amount: Decimal,

        /// Category whose cash moves
        #[arg(short = 't', long = "type", default_value = "OTHER", value_parser = parse_asset_type)]
        asset_type: AssetType,

        /// Reason tag stored with the movement
        #[arg(short, long)]
        reason: Option<String>,

        #[arg(long)]
        at: Option<String>,
    },

    /// Record a cash dividend
    Dividend {
        ticker: String,

        /// Native cash amount received
        amount: Decimal,

        #[arg(short = 't', long = "type", default_value = "STOCK", value_parser = parse_asset_type)]
        asset_type: AssetType,

        #[arg(long)]
        at: Option<String>,
    },

    /// Record a stock dividend (extra units at no cost)
    StockDividend {
        ticker: String,

        units: Decimal,

        #[arg(short = 't', long = "type", default_value = "STOCK", value_parser = parse_asset_type)]
        asset_type: AssetType,

        #[arg(long)]
        at: Option<String>,
    },

    /// Inspect and correct ledger entries
    Transactions {
        #[command(subcommand)]
        action: TransactionCommands,
    },

    /// Manage current prices
    Price {
        #[command(subcommand)]
        action: PriceCommands,
    },

    /// Overview, category and ticker reports
    Report {
        #[command(subcommand)]
        action: ReportCommands,
    },

    /// Import a CSV transaction feed
    Import {
        /// Path to the CSV file
        file: PathBuf,

        /// Preview only, don't save to database
        #[arg(short, long)]
        dry_run: bool,
    },
}

#[derive(Subcommand)]
pub enum TransactionCommands {
    /// List transactions in ledger order
    List {
        #[arg(short = 't', long = "type", value_parser = parse_asset_type)]
        asset_type: Option<AssetType>,

        #[arg(long)]
        ticker: Option<String>,

        /// First day included (YYYY-MM-DD)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last day included (YYYY-MM-DD)
        #[arg(long)]
        to: Option<NaiveDate>,
    },

    /// Change fields of a stored transaction
    Edit {
        id: i64,

        #[arg(long)]
        ticker: Option<String>,

        #[arg(short = 't', long = "type", value_parser = parse_asset_type)]
        asset_type: Option<AssetType>,

        #[arg(long, value_parser = parse_kind)]
        kind: Option<TransactionKind>,

        #[arg(long)]
        quantity: Option<Decimal>,

        #[arg(long)]
        price: Option<Decimal>,

        /// Reporting-currency total (recomputed from quantity and price when omitted)
        #[arg(long)]
        total: Option<Decimal>,

        #[arg(long)]
        at: Option<String>,

        #[arg(long)]
        note: Option<String>,
    },

    /// Delete a transaction
    Delete { id: i64 },
}

#[derive(Subcommand)]
pub enum PriceCommands {
    /// Set the latest native price for a ticker
    Set { ticker: String, price: Decimal },

    /// Show stored prices
    List,
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Net worth, allocation, P&L and top movers
    Overview,

    /// One category over a period
    Category {
        #[arg(value_parser = parse_asset_type)]
        asset_type: AssetType,

        /// MTD, QTD, YTD, 1Y, ALL or YYYY-MM-DD:YYYY-MM-DD
        #[arg(short, long, default_value = "ALL")]
        period: Period,
    },

    /// Drill into a single ticker
    Ticker { ticker: String },
}

fn parse_asset_type(raw: &str) -> Result<AssetType, String> {
    AssetType::from_str(raw)
        .map_err(|_| format!("unknown asset type '{}' (use STOCK, CRYPTO or OTHER)", raw))
}

fn parse_kind(raw: &str) -> Result<TransactionKind, String> {
    TransactionKind::from_str(raw).map_err(|_| {
        format!(
            "unknown kind '{}' (use DEPOSIT, WITHDRAW, BUY, SELL, CASH_DIVIDEND or STOCK_DIVIDEND)",
            raw
        )
    })
}
