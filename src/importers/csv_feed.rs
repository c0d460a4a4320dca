use anyhow::{anyhow, bail, Context, Result};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use csv::{ReaderBuilder, StringRecord, Trim};
use rust_decimal::Decimal;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::accounting::validate;
use crate::db::{normalize_ticker, AssetType, Transaction, TransactionKind, CASH_TICKER};
use crate::error::PortfolioError;
use crate::reports::Rates;

/// Parse a comma-separated feed with header
/// `timestamp,ticker,asset_type,kind,quantity,price[,total_value][,note]`.
///
/// Any bad row rejects the whole file.
pub fn parse_feed_csv<P: AsRef<Path>>(file_path: P, rates: &Rates) -> Result<Vec<Transaction>> {
    let path = file_path.as_ref();
    info!("Parsing transaction feed CSV: {:?}", path);

    let file = std::fs::File::open(path).context("Failed to open CSV file")?;
    parse_feed(file, rates)
}

/// Parse a feed from any reader (used for files and in tests)
pub fn parse_feed<R: Read>(source: R, rates: &Rates) -> Result<Vec<Transaction>> {
    let mut reader = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .context("Failed to read CSV headers")?
        .clone();
    let columns = find_columns(&headers)?;
    debug!("Column mapping: {:?}", columns);

    let mut transactions = Vec::new();
    for (idx, result) in reader.records().enumerate() {
        // header is line 1
        let line = idx + 2;
        let record = result.with_context(|| format!("Failed to read CSV row {}", line))?;
        if record.iter().all(str::is_empty) {
            continue;
        }

        let tx = parse_row(&record, &columns, rates)
            .map_err(|e| PortfolioError::ParseError(format!("row {}: {}", line, e)))?;
        transactions.push(tx);
    }

    transactions.sort_by_key(|tx| tx.timestamp);

    info!("Parsed {} transactions from CSV", transactions.len());
    Ok(transactions)
}

#[derive(Debug)]
struct FeedColumns {
    timestamp: usize,
    ticker: usize,
    asset_type: usize,
    kind: usize,
    quantity: usize,
    price: usize,
    total_value: Option<usize>,
    note: Option<usize>,
}

fn find_columns(headers: &StringRecord) -> Result<FeedColumns> {
    let position = |name: &str| {
        headers
            .iter()
            .position(|header| header.eq_ignore_ascii_case(name))
    };
    let required = |name: &str| {
        position(name).ok_or_else(|| anyhow!("Missing required column '{}'", name))
    };

    Ok(FeedColumns {
        timestamp: required("timestamp")?,
        ticker: required("ticker")?,
        asset_type: required("asset_type")?,
        kind: required("kind")?,
        quantity: required("quantity")?,
        price: required("price")?,
        total_value: position("total_value"),
        note: position("note"),
    })
}

fn parse_row(record: &StringRecord, columns: &FeedColumns, rates: &Rates) -> Result<Transaction> {
    let field = |idx: usize| record.get(idx).unwrap_or("");
    let optional = |idx: Option<usize>| idx.map(field).filter(|value| !value.is_empty());

    let timestamp = parse_timestamp(field(columns.timestamp))?;
    let asset_type = AssetType::from_str(field(columns.asset_type))
        .map_err(|_| anyhow!("unknown asset type '{}'", field(columns.asset_type)))?;
    let kind = TransactionKind::from_str(field(columns.kind))
        .map_err(|_| anyhow!("unknown kind '{}'", field(columns.kind)))?;
    let quantity = parse_decimal(field(columns.quantity), "quantity")?;
    let price = parse_decimal(field(columns.price), "price")?;

    let ticker = match field(columns.ticker) {
        "" if kind.is_cash_flow() => CASH_TICKER.to_string(),
        "" => bail!("ticker is empty"),
        ticker => normalize_ticker(ticker),
    };

    let total_value = match optional(columns.total_value) {
        Some(raw) => parse_decimal(raw, "total_value")?,
        None => rates
            .convert(asset_type, quantity, price)
            .ok_or_else(|| anyhow!("{} x {} exceeds the decimal range", quantity, price))?,
    };

    let mut tx = Transaction::new(&ticker, asset_type, kind, quantity, price, total_value, timestamp);
    tx.note = optional(columns.note).map(str::to_string);

    validate(&tx)?;
    Ok(tx)
}

/// RFC 3339 instant or a bare `YYYY-MM-DD` (midnight UTC)
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| anyhow!("invalid timestamp '{}' (expected RFC 3339 or YYYY-MM-DD)", raw))?;
    Ok(date.and_time(NaiveTime::MIN).and_utc())
}

fn parse_decimal(raw: &str, column: &str) -> Result<Decimal> {
    Decimal::from_str(raw).map_err(|_| anyhow!("invalid {} '{}'", column, raw))
}
