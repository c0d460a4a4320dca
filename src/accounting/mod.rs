//! Position accumulator
//!
//! Replays an ordered transaction feed into per-ticker positions using
//! weighted-average cost, together with the portfolio cash scalars. The
//! replay is a pure fold: it performs no I/O and returns a fresh
//! [`LedgerState`] or the first [`AccountingError`] it meets.

pub mod position;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::debug;

use crate::db::{AssetType, Transaction, TransactionKind, CASH_TICKER};
use crate::error::AccountingError;

pub use position::Position;

/// Source of a P&L contribution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PnlKind {
    Realized,
    Dividend,
}

/// P&L produced by a single SELL or CASH_DIVIDEND event
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PnlEvent {
    pub transaction_id: Option<i64>,
    pub ticker: String,
    pub asset_type: AssetType,
    pub timestamp: DateTime<Utc>,
    pub kind: PnlKind,
    pub amount: Decimal,
}

/// Result of a replay
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LedgerState {
    pub positions: BTreeMap<String, Position>,
    pub cash_available: Decimal,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub total_buy: Decimal,
    pub total_sell: Decimal,
    pub pnl_events: Vec<PnlEvent>,
    #[serde(skip)]
    last_timestamp: Option<DateTime<Utc>>,
    #[serde(skip)]
    transaction_count: usize,
    #[serde(skip)]
    enforce_cash: bool,
}

impl LedgerState {
    pub fn position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(&crate::db::models::normalize_ticker(ticker))
    }

    pub fn net_invested(&self) -> Decimal {
        self.total_in - self.total_out
    }

    pub fn realized_pnl(&self) -> Decimal {
        self.positions.values().map(|p| p.realized_pnl).sum()
    }

    pub fn dividend_income(&self) -> Decimal {
        self.positions.values().map(|p| p.dividend_income).sum()
    }

    pub fn transaction_count(&self) -> usize {
        self.transaction_count
    }

    /// Apply one event, consuming the previous state.
    fn apply(mut self, tx: &Transaction) -> Result<Self, AccountingError> {
        if let Some(previous) = self.last_timestamp {
            if tx.timestamp < previous {
                return Err(AccountingError::OrderingViolation {
                    id: tx.id,
                    timestamp: tx.timestamp,
                    previous,
                });
            }
        }
        validate(tx)?;

        let add = |total: Decimal| {
            total
                .checked_add(tx.total_value)
                .ok_or_else(|| out_of_range(tx.id, "running total"))
        };
        let sub = |total: Decimal| {
            total
                .checked_sub(tx.total_value)
                .ok_or_else(|| out_of_range(tx.id, "running total"))
        };

        match tx.kind {
            TransactionKind::Deposit => {
                self.total_in = add(self.total_in)?;
                self.cash_available = add(self.cash_available)?;
            }
            TransactionKind::Withdraw => {
                if self.enforce_cash && tx.total_value > self.cash_available {
                    return Err(AccountingError::InsufficientHoldings {
                        id: tx.id,
                        ticker: CASH_TICKER.to_string(),
                        requested: tx.total_value,
                        available: self.cash_available,
                        shortfall: tx.total_value - self.cash_available,
                    });
                }
                self.total_out = add(self.total_out)?;
                self.cash_available = sub(self.cash_available)?;
            }
            TransactionKind::Buy => {
                self.position_mut(tx).add_purchase(tx)?;
                self.cash_available = sub(self.cash_available)?;
                self.total_buy = add(self.total_buy)?;
            }
            TransactionKind::Sell => {
                let realized = self.position_mut(tx).match_sale(tx)?;
                self.cash_available = add(self.cash_available)?;
                self.total_sell = add(self.total_sell)?;
                self.record_pnl(tx, PnlKind::Realized, realized);
            }
            TransactionKind::CashDividend => {
                self.position_mut(tx).apply_cash_dividend(tx)?;
                self.cash_available = add(self.cash_available)?;
                self.record_pnl(tx, PnlKind::Dividend, tx.total_value);
            }
            TransactionKind::StockDividend => {
                self.position_mut(tx).apply_stock_dividend(tx)?;
            }
        }

        self.last_timestamp = Some(tx.timestamp);
        self.transaction_count += 1;
        Ok(self)
    }

    fn position_mut(&mut self, tx: &Transaction) -> &mut Position {
        self.positions
            .entry(tx.ticker.clone())
            .or_insert_with(|| Position::new(&tx.ticker, tx.asset_type))
    }

    fn record_pnl(&mut self, tx: &Transaction, kind: PnlKind, amount: Decimal) {
        self.pnl_events.push(PnlEvent {
            transaction_id: tx.id,
            ticker: tx.ticker.clone(),
            asset_type: tx.asset_type,
            timestamp: tx.timestamp,
            kind,
            amount,
        });
    }
}

/// Replay an ascending feed into a fresh ledger state.
///
/// The feed is not re-sorted; a timestamp that goes backwards is an
/// [`AccountingError::OrderingViolation`].
pub fn replay<'a, I>(transactions: I) -> Result<LedgerState, AccountingError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let initial = LedgerState {
        enforce_cash: true,
        ..LedgerState::default()
    };
    fold(transactions, initial)
}

/// Replay a slice of the ledger, such as one category, whose cash balance
/// is not meaningful on its own.
///
/// Holdings, ordering and validation are checked as in [`replay`]; a
/// WITHDRAW is not checked against the slice's cash, since cash is a
/// portfolio-wide balance.
pub fn replay_positions<'a, I>(transactions: I) -> Result<LedgerState, AccountingError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    fold(transactions, LedgerState::default())
}

fn fold<'a, I>(transactions: I, initial: LedgerState) -> Result<LedgerState, AccountingError>
where
    I: IntoIterator<Item = &'a Transaction>,
{
    let state = transactions
        .into_iter()
        .try_fold(initial, LedgerState::apply)?;

    debug!(
        transactions = state.transaction_count,
        positions = state.positions.len(),
        "ledger replay complete"
    );
    Ok(state)
}

pub(crate) fn out_of_range(id: Option<i64>, what: &str) -> AccountingError {
    AccountingError::malformed(id, format!("{} exceeds the decimal range", what))
}

/// Reject records the fold cannot account for safely.
pub fn validate(tx: &Transaction) -> Result<(), AccountingError> {
    let malformed = |reason: String| Err(AccountingError::malformed(tx.id, reason));

    if tx.ticker.trim().is_empty() {
        return malformed("ticker is empty".to_string());
    }
    if tx.price < Decimal::ZERO {
        return malformed(format!("negative price {}", tx.price));
    }
    if tx.total_value < Decimal::ZERO {
        return malformed(format!("negative total value {}", tx.total_value));
    }

    match tx.kind {
        TransactionKind::Deposit | TransactionKind::Withdraw | TransactionKind::CashDividend => {
            if tx.total_value <= Decimal::ZERO {
                return malformed(format!("{} amount must be positive", tx.kind));
            }
        }
        TransactionKind::Buy | TransactionKind::Sell | TransactionKind::StockDividend => {
            if tx.quantity <= Decimal::ZERO {
                return malformed(format!(
                    "{} quantity must be positive, got {}",
                    tx.kind, tx.quantity
                ));
            }
        }
    }

    if !tx.kind.is_cash_flow() && tx.ticker == CASH_TICKER {
        return malformed(format!("{} cannot use the reserved {} ticker", tx.kind, CASH_TICKER));
    }

    Ok(())
}
