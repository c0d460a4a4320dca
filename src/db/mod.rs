// Database module - SQLite ledger storage and the store abstraction reports read from

pub mod models;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use rust_decimal::Decimal;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::AccountingError;
use crate::reports::PriceMap;
pub use models::{
    normalize_ticker, AssetType, DateWindow, Transaction, TransactionFilter, TransactionKind,
    CASH_TICKER,
};

/// Read side of the ledger, handed to reports explicitly.
///
/// Implementations must return transactions sorted ascending by timestamp
/// (ties by id) and should answer each call with a single fetch.
pub trait LedgerStore {
    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>>;
    fn current_prices(&self) -> Result<PriceMap>;
}

impl LedgerStore for Connection {
    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        list_transactions(self, filter)
    }

    fn current_prices(&self) -> Result<PriceMap> {
        get_price_map(self)
    }
}

/// SQLite-backed ledger
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (and if needed create) the ledger at `db_path` or the default path
    pub fn open(db_path: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            conn: open_ledger(db_path)?,
        })
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        apply_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn conn_mut(&mut self) -> &mut Connection {
        &mut self.conn
    }
}

impl LedgerStore for SqliteStore {
    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        list_transactions(&self.conn, filter)
    }

    fn current_prices(&self) -> Result<PriceMap> {
        get_price_map(&self.conn)
    }
}

/// In-memory ledger used for dry runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    transactions: Vec<Transaction>,
    prices: PriceMap,
}

impl MemoryLedger {
    /// The feed is stably sorted by timestamp on the way in.
    pub fn new(mut transactions: Vec<Transaction>) -> Self {
        transactions.sort_by_key(|tx| tx.timestamp);
        Self {
            transactions,
            prices: PriceMap::new(),
        }
    }

    pub fn with_prices(mut self, prices: PriceMap) -> Self {
        self.prices = prices
            .into_iter()
            .map(|(ticker, price)| (normalize_ticker(&ticker), price))
            .collect();
        self
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl LedgerStore for MemoryLedger {
    fn transactions(&self, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|tx| filter.matches(tx))
            .cloned()
            .collect())
    }

    fn current_prices(&self) -> Result<PriceMap> {
        Ok(self.prices.clone())
    }
}

/// Where the default database lives (~/.tally/ledger.db), without touching disk
pub fn default_db_location() -> Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME environment variable not set")?;
    Ok(PathBuf::from(home).join(".tally").join("ledger.db"))
}

/// Get the default database path, creating ~/.tally if needed
pub fn get_default_db_path() -> Result<PathBuf> {
    let path = default_db_location()?;
    if let Some(tally_dir) = path.parent() {
        std::fs::create_dir_all(tally_dir).context("Failed to create .tally directory")?;
    }
    Ok(path)
}

/// Open database connection
pub fn open_db(db_path: Option<PathBuf>) -> Result<Connection> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };
    let conn = Connection::open(&path).context(format!("Failed to open database at {:?}", path))?;
    Ok(conn)
}

/// Create tables and indexes if they are missing
pub fn apply_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(include_str!("schema.sql"))
        .context("Failed to execute schema")?;
    Ok(())
}

/// Initialize the database file with the ledger schema
pub fn init_database(db_path: Option<PathBuf>) -> Result<()> {
    let path = match db_path {
        Some(path) => path,
        None => get_default_db_path()?,
    };

    info!("Initializing database at: {:?}", path);
    let conn = open_db(Some(path))?;
    apply_schema(&conn)?;
    info!("Database initialized successfully");
    Ok(())
}

/// Open the ledger, creating the schema on first use
pub fn open_ledger(db_path: Option<PathBuf>) -> Result<Connection> {
    let conn = open_db(db_path)?;
    apply_schema(&conn)?;
    Ok(conn)
}

/// Insert transaction, returns its id
pub fn insert_transaction(conn: &Connection, tx: &Transaction) -> Result<i64> {
    conn.execute(
        "INSERT INTO transactions (
            ticker, asset_type, kind, quantity, price, total_value, occurred_at, note
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            tx.ticker,
            tx.asset_type.as_str(),
            tx.kind.as_str(),
            tx.quantity.to_string(),
            tx.price.to_string(),
            tx.total_value.to_string(),
            tx.timestamp,
            tx.note,
        ],
    )?;

    Ok(conn.last_insert_rowid())
}

/// Overwrite every field of an existing transaction
pub fn update_transaction(conn: &Connection, id: i64, tx: &Transaction) -> Result<()> {
    let changed = conn.execute(
        "UPDATE transactions
         SET ticker = ?1, asset_type = ?2, kind = ?3, quantity = ?4, price = ?5,
             total_value = ?6, occurred_at = ?7, note = ?8
         WHERE id = ?9",
        params![
            tx.ticker,
            tx.asset_type.as_str(),
            tx.kind.as_str(),
            tx.quantity.to_string(),
            tx.price.to_string(),
            tx.total_value.to_string(),
            tx.timestamp,
            tx.note,
            id,
        ],
    )?;

    if changed == 0 {
        anyhow::bail!("Transaction #{} not found", id);
    }
    Ok(())
}

pub fn delete_transaction(conn: &Connection, id: i64) -> Result<()> {
    let changed = conn.execute("DELETE FROM transactions WHERE id = ?1", [id])?;
    if changed == 0 {
        anyhow::bail!("Transaction #{} not found", id);
    }
    Ok(())
}

pub fn get_transaction(conn: &Connection, id: i64) -> Result<Option<Transaction>> {
    let row = conn
        .query_row(
            "SELECT id, ticker, asset_type, kind, quantity, price, total_value, occurred_at, note
             FROM transactions WHERE id = ?1",
            [id],
            TransactionRow::from_row,
        )
        .optional()?;

    match row {
        Some(row) => Ok(Some(row.into_transaction()?)),
        None => Ok(None),
    }
}

/// Fetch the feed matching `filter`, ascending by time then id
pub fn list_transactions(conn: &Connection, filter: &TransactionFilter) -> Result<Vec<Transaction>> {
    let mut sql = String::from(
        "SELECT id, ticker, asset_type, kind, quantity, price, total_value, occurred_at, note
         FROM transactions
         WHERE 1=1",
    );

    let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

    if let Some(asset_type) = filter.asset_type {
        sql.push_str(" AND asset_type = ?");
        params.push(Box::new(asset_type.as_str()));
    }
    if let Some(ticker) = &filter.ticker {
        sql.push_str(" AND ticker = ?");
        params.push(Box::new(normalize_ticker(ticker)));
    }
    if let Some(from) = filter.from_instant() {
        sql.push_str(" AND occurred_at >= ?");
        params.push(Box::new(from));
    }
    if let Some(to) = filter.to_exclusive() {
        sql.push_str(" AND occurred_at < ?");
        params.push(Box::new(to));
    }

    sql.push_str(" ORDER BY occurred_at ASC, id ASC");

    let mut stmt = conn.prepare(&sql)?;
    let param_refs: Vec<&dyn rusqlite::ToSql> = params.iter().map(|p| p.as_ref()).collect();

    let rows = stmt
        .query_map(param_refs.as_slice(), TransactionRow::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    let transactions = rows
        .into_iter()
        .map(TransactionRow::into_transaction)
        .collect::<Result<Vec<_>, AccountingError>>()?;

    debug!(count = transactions.len(), ?filter, "loaded transaction feed");
    Ok(transactions)
}

/// Record the latest native price for a ticker
pub fn upsert_price(
    conn: &Connection,
    ticker: &str,
    price: Decimal,
    updated_at: DateTime<Utc>,
) -> Result<()> {
    conn.execute(
        "INSERT INTO prices (ticker, price, updated_at) VALUES (?1, ?2, ?3)
         ON CONFLICT(ticker) DO UPDATE SET price = excluded.price, updated_at = excluded.updated_at",
        params![normalize_ticker(ticker), price.to_string(), updated_at],
    )?;
    Ok(())
}

/// All latest prices in one query
pub fn get_price_map(conn: &Connection) -> Result<PriceMap> {
    let mut stmt = conn.prepare("SELECT ticker, price FROM prices")?;
    let prices = stmt
        .query_map([], |row| Ok((row.get::<_, String>(0)?, get_decimal_value(row, 1)?)))?
        .collect::<Result<PriceMap, _>>()?;
    Ok(prices)
}

/// Prices with their update time, ordered by ticker
pub fn list_prices(conn: &Connection) -> Result<Vec<(String, Decimal, DateTime<Utc>)>> {
    let mut stmt = conn.prepare("SELECT ticker, price, updated_at FROM prices ORDER BY ticker")?;
    let prices = stmt
        .query_map([], |row| {
            Ok((row.get(0)?, get_decimal_value(row, 1)?, row.get(2)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(prices)
}

/// Raw row; kind and category text are validated after the query.
struct TransactionRow {
    id: i64,
    ticker: String,
    asset_type: String,
    kind: String,
    quantity: Decimal,
    price: Decimal,
    total_value: Decimal,
    occurred_at: DateTime<Utc>,
    note: Option<String>,
}

impl TransactionRow {
    fn from_row(row: &rusqlite::Row) -> Result<Self, rusqlite::Error> {
        Ok(Self {
            id: row.get(0)?,
            ticker: row.get(1)?,
            asset_type: row.get(2)?,
            kind: row.get(3)?,
            quantity: get_decimal_value(row, 4)?,
            price: get_decimal_value(row, 5)?,
            total_value: get_decimal_value(row, 6)?,
            occurred_at: row.get(7)?,
            note: row.get(8)?,
        })
    }

    fn into_transaction(self) -> Result<Transaction, AccountingError> {
        let kind = TransactionKind::from_str(&self.kind).map_err(|_| {
            AccountingError::malformed(Some(self.id), format!("unknown kind '{}'", self.kind))
        })?;
        let asset_type = AssetType::from_str(&self.asset_type).map_err(|_| {
            AccountingError::malformed(
                Some(self.id),
                format!("unknown asset type '{}'", self.asset_type),
            )
        })?;

        Ok(Transaction {
            id: Some(self.id),
            ticker: self.ticker,
            asset_type,
            kind,
            quantity: self.quantity,
            price: self.price,
            total_value: self.total_value,
            timestamp: self.occurred_at,
            note: self.note,
        })
    }
}

/// Helper to read Decimal from SQLite (handles both INTEGER, REAL and TEXT)
pub fn get_decimal_value(row: &rusqlite::Row, idx: usize) -> Result<Decimal, rusqlite::Error> {
    use rusqlite::types::ValueRef;

    match row.get_ref(idx)? {
        ValueRef::Text(bytes) => {
            let s = std::str::from_utf8(bytes)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            Decimal::from_str(s).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        ValueRef::Integer(i) => Ok(Decimal::from(i)),
        ValueRef::Real(f) => {
            Decimal::try_from(f).map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))
        }
        _ => Err(rusqlite::Error::InvalidColumnType(
            idx,
            "decimal".to_string(),
            rusqlite::types::Type::Null,
        )),
    }
}
