use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Reserved ticker for deposits and withdrawals
pub const CASH_TICKER: &str = "CASH";

/// Asset categories tracked by the ledger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetType {
    Stock,
    Crypto,
    Other,
}

impl AssetType {
    pub const ALL: [AssetType; 3] = [AssetType::Stock, AssetType::Crypto, AssetType::Other];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Stock => "STOCK",
            AssetType::Crypto => "CRYPTO",
            AssetType::Other => "OTHER",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetType {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STOCK" | "STOCKS" | "EQUITY" => Ok(AssetType::Stock),
            "CRYPTO" => Ok(AssetType::Crypto),
            "OTHER" => Ok(AssetType::Other),
            _ => Err(()),
        }
    }
}

/// Ledger event kind
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionKind {
    Deposit,
    Withdraw,
    Buy,
    Sell,
    CashDividend,
    StockDividend,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "DEPOSIT",
            TransactionKind::Withdraw => "WITHDRAW",
            TransactionKind::Buy => "BUY",
            TransactionKind::Sell => "SELL",
            TransactionKind::CashDividend => "CASH_DIVIDEND",
            TransactionKind::StockDividend => "STOCK_DIVIDEND",
        }
    }

    /// Deposits and withdrawals move cash only and use the `CASH` ticker.
    pub fn is_cash_flow(&self) -> bool {
        matches!(self, TransactionKind::Deposit | TransactionKind::Withdraw)
    }
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionKind {
    type Err = ();

    /// `IN`/`OUT` are legacy spellings of deposit/withdraw and are folded
    /// into the canonical kinds here, at ingestion.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "DEPOSIT" | "IN" => Ok(TransactionKind::Deposit),
            "WITHDRAW" | "OUT" => Ok(TransactionKind::Withdraw),
            "BUY" => Ok(TransactionKind::Buy),
            "SELL" => Ok(TransactionKind::Sell),
            "CASH_DIVIDEND" => Ok(TransactionKind::CashDividend),
            "STOCK_DIVIDEND" => Ok(TransactionKind::StockDividend),
            _ => Err(()),
        }
    }
}

/// A committed ledger event.
///
/// `total_value` is in the reporting currency; `price` is the native unit
/// price the operator entered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Transaction {
    pub id: Option<i64>,
    pub ticker: String,
    pub asset_type: AssetType,
    pub kind: TransactionKind,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub timestamp: DateTime<Utc>,
    pub note: Option<String>,
}

impl Transaction {
    /// Build an unsaved transaction; the ticker is upper-cased.
    pub fn new(
        ticker: &str,
        asset_type: AssetType,
        kind: TransactionKind,
        quantity: Decimal,
        price: Decimal,
        total_value: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            id: None,
            ticker: normalize_ticker(ticker),
            asset_type,
            kind,
            quantity,
            price,
            total_value,
            timestamp,
            note: None,
        }
    }

    /// Cash movement (deposit or withdrawal) of `amount` for a category.
    pub fn cash(
        kind: TransactionKind,
        asset_type: AssetType,
        amount: Decimal,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self::new(
            CASH_TICKER,
            asset_type,
            kind,
            amount,
            Decimal::ONE,
            amount,
            timestamp,
        )
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }
}

pub fn normalize_ticker(ticker: &str) -> String {
    ticker.trim().to_uppercase()
}

/// Inclusive calendar-day window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// First instant after the window (the end day is included in full).
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        self.end
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end)
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    pub fn contains(&self, timestamp: &DateTime<Utc>) -> bool {
        *timestamp >= self.start_instant() && *timestamp < self.end_exclusive()
    }

    pub fn label(&self) -> String {
        format!("{} to {}", self.start, self.end)
    }
}

/// Selection applied when fetching the transaction feed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransactionFilter {
    pub asset_type: Option<AssetType>,
    pub ticker: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl TransactionFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(asset_type: AssetType) -> Self {
        Self {
            asset_type: Some(asset_type),
            ..Self::default()
        }
    }

    pub fn ticker(ticker: &str) -> Self {
        Self {
            ticker: Some(normalize_ticker(ticker)),
            ..Self::default()
        }
    }

    pub fn until(mut self, to: NaiveDate) -> Self {
        self.to = Some(to);
        self
    }

    pub fn from_instant(&self) -> Option<DateTime<Utc>> {
        self.from.map(|d| d.and_time(NaiveTime::MIN).and_utc())
    }

    pub fn to_exclusive(&self) -> Option<DateTime<Utc>> {
        self.to.map(|d| {
            d.checked_add_days(Days::new(1))
                .unwrap_or(d)
                .and_time(NaiveTime::MIN)
                .and_utc()
        })
    }

    pub fn matches(&self, tx: &Transaction) -> bool {
        if let Some(asset_type) = self.asset_type {
            if tx.asset_type != asset_type {
                return false;
            }
        }
        if let Some(ticker) = &self.ticker {
            if &tx.ticker != ticker {
                return false;
            }
        }
        if let Some(from) = self.from_instant() {
            if tx.timestamp < from {
                return false;
            }
        }
        if let Some(to) = self.to_exclusive() {
            if tx.timestamp >= to {
                return false;
            }
        }
        true
    }
}
