//! Ledger mutations
//!
//! Every write runs inside a single SQLite transaction. Before commit the
//! complete feed and the holdings of each category feed are replayed again;
//! an accounting error rolls the write back and is returned to the caller.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tracing::{info, warn};

use crate::accounting::{replay, replay_positions};
use crate::db::{
    self, normalize_ticker, AssetType, LedgerStore, SqliteStore, Transaction, TransactionFilter,
    TransactionKind, CASH_TICKER,
};
use crate::error::PortfolioError;
use crate::reports::Rates;

/// Field changes for an existing transaction; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct TransactionAmendment {
    pub ticker: Option<String>,
    pub asset_type: Option<AssetType>,
    pub kind: Option<TransactionKind>,
    pub quantity: Option<Decimal>,
    pub price: Option<Decimal>,
    pub total_value: Option<Decimal>,
    pub timestamp: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl TransactionAmendment {
    pub fn is_empty(&self) -> bool {
        self.ticker.is_none()
            && self.asset_type.is_none()
            && self.kind.is_none()
            && self.quantity.is_none()
            && self.price.is_none()
            && self.total_value.is_none()
            && self.timestamp.is_none()
            && self.note.is_none()
    }
}

/// Write access to the ledger. Amounts entered here are native to the
/// category and converted with `rates` before they are stored.
pub struct Ledger<'a> {
    store: &'a mut SqliteStore,
    rates: Rates,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a mut SqliteStore, rates: Rates) -> Self {
        Self { store, rates }
    }

    /// Positive `quantity` buys, negative sells.
    pub fn execute_trade(
        &mut self,
        ticker: &str,
        asset_type: AssetType,
        quantity: Decimal,
        price: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if quantity.is_zero() {
            return Err(invalid("trade quantity cannot be zero"));
        }
        if price < Decimal::ZERO {
            return Err(invalid("price cannot be negative"));
        }
        if normalize_ticker(ticker) == CASH_TICKER {
            return Err(invalid("CASH is reserved for cash movements"));
        }

        let kind = if quantity > Decimal::ZERO {
            TransactionKind::Buy
        } else {
            TransactionKind::Sell
        };
        let units = quantity.abs();
        let total_value = converted(&self.rates, asset_type, units, price)?;
        let tx = Transaction::new(ticker, asset_type, kind, units, price, total_value, at);

        self.insert("trade", tx)
    }

    /// Positive `amount` deposits, negative withdraws.
    pub fn adjust_cash(
        &mut self,
        amount: Decimal,
        asset_type: AssetType,
        reason: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if amount.is_zero() {
            return Err(invalid("cash adjustment cannot be zero"));
        }

        let kind = if amount > Decimal::ZERO {
            TransactionKind::Deposit
        } else {
            TransactionKind::Withdraw
        };
        let native = amount.abs();
        let mut tx = Transaction::cash(kind, asset_type, native, at);
        tx.total_value = converted(&self.rates, asset_type, native, Decimal::ONE)?;
        tx.note = reason.map(str::to_string);

        self.insert("cash adjustment", tx)
    }

    pub fn record_cash_dividend(
        &mut self,
        ticker: &str,
        asset_type: AssetType,
        amount: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if amount <= Decimal::ZERO {
            return Err(invalid("dividend amount must be positive"));
        }
        let total_value = converted(&self.rates, asset_type, amount, Decimal::ONE)?;
        let tx = Transaction::new(
            ticker,
            asset_type,
            TransactionKind::CashDividend,
            amount,
            Decimal::ONE,
            total_value,
            at,
        );

        self.insert("cash dividend", tx)
    }

    pub fn record_stock_dividend(
        &mut self,
        ticker: &str,
        asset_type: AssetType,
        units: Decimal,
        at: DateTime<Utc>,
    ) -> Result<Transaction> {
        if units <= Decimal::ZERO {
            return Err(invalid("stock dividend units must be positive"));
        }
        let tx = Transaction::new(
            ticker,
            asset_type,
            TransactionKind::StockDividend,
            units,
            Decimal::ZERO,
            Decimal::ZERO,
            at,
        );

        self.insert("stock dividend", tx)
    }

    /// Rewrite a stored transaction. When quantity, price or category change
    /// without an explicit total, the total is recomputed from them.
    pub fn amend_transaction(&mut self, id: i64, changes: TransactionAmendment) -> Result<Transaction> {
        if changes.is_empty() {
            return Err(invalid("nothing to change"));
        }
        let rates = self.rates;

        self.commit("amend", |conn| {
            let current = db::get_transaction(conn, id)?
                .ok_or_else(|| invalid(&format!("transaction #{} not found", id)))?;

            let recompute = changes.total_value.is_none()
                && (changes.quantity.is_some()
                    || changes.price.is_some()
                    || changes.asset_type.is_some_and(|asset| asset != current.asset_type));

            let mut amended = Transaction {
                id: Some(id),
                ticker: changes
                    .ticker
                    .as_deref()
                    .map(normalize_ticker)
                    .unwrap_or(current.ticker),
                asset_type: changes.asset_type.unwrap_or(current.asset_type),
                kind: changes.kind.unwrap_or(current.kind),
                quantity: changes.quantity.unwrap_or(current.quantity),
                price: changes.price.unwrap_or(current.price),
                total_value: changes.total_value.unwrap_or(current.total_value),
                timestamp: changes.timestamp.unwrap_or(current.timestamp),
                note: changes.note.clone().or(current.note),
            };
            if recompute {
                amended.total_value =
                    converted(&rates, amended.asset_type, amended.quantity, amended.price)?;
            }

            db::update_transaction(conn, id, &amended)?;
            Ok(amended)
        })
    }

    pub fn remove_transaction(&mut self, id: i64) -> Result<Transaction> {
        self.commit("remove", |conn| {
            let current = db::get_transaction(conn, id)?
                .ok_or_else(|| invalid(&format!("transaction #{} not found", id)))?;
            db::delete_transaction(conn, id)?;
            Ok(current)
        })
    }

    /// Store an already-converted batch atomically; returns the count written.
    pub fn import_transactions(&mut self, transactions: &[Transaction]) -> Result<usize> {
        self.commit("import", |conn| {
            for tx in transactions {
                db::insert_transaction(conn, tx)?;
            }
            Ok(transactions.len())
        })
    }

    pub fn set_price(&mut self, ticker: &str, price: Decimal, at: DateTime<Utc>) -> Result<()> {
        if price < Decimal::ZERO {
            return Err(invalid("price cannot be negative"));
        }
        db::upsert_price(self.store.conn(), ticker, price, at)?;
        info!(ticker = %normalize_ticker(ticker), %price, "price updated");
        Ok(())
    }

    fn insert(&mut self, operation: &str, tx: Transaction) -> Result<Transaction> {
        self.commit(operation, |conn| {
            let id = db::insert_transaction(conn, &tx)?;
            Ok(tx.with_id(id))
        })
    }

    /// Apply `write` and re-validate the ledger inside one transaction.
    fn commit<T, F>(&mut self, operation: &str, write: F) -> Result<T>
    where
        F: FnOnce(&rusqlite::Connection) -> Result<T>,
    {
        let db_tx = self
            .store
            .conn_mut()
            .transaction()
            .context("Failed to begin ledger transaction")?;

        let outcome = write(&*db_tx).and_then(|value| {
            verify_ledger(&*db_tx)?;
            Ok(value)
        });

        match outcome {
            Ok(value) => {
                db_tx.commit().context("Failed to commit ledger transaction")?;
                info!(operation, "ledger mutation committed");
                Ok(value)
            }
            Err(err) => {
                warn!(operation, error = %err, "ledger mutation rejected");
                // dropping db_tx rolls back
                Err(err)
            }
        }
    }
}

/// Replay the whole feed, then the holdings of each category feed; the
/// first accounting error found is returned. Cash is checked only on the
/// whole feed.
pub fn verify_ledger<S: LedgerStore + ?Sized>(store: &S) -> Result<()> {
    let transactions = store.transactions(&TransactionFilter::all())?;
    replay(&transactions)?;

    for asset_type in AssetType::ALL {
        replay_positions(transactions.iter().filter(|tx| tx.asset_type == asset_type))
            .with_context(|| format!("{} ledger is inconsistent", asset_type))?;
    }
    Ok(())
}

fn converted(rates: &Rates, asset_type: AssetType, quantity: Decimal, price: Decimal) -> Result<Decimal> {
    rates.convert(asset_type, quantity, price).ok_or_else(|| {
        invalid(&format!(
            "{} x {} exceeds the supported decimal range",
            quantity, price
        ))
    })
}

fn invalid(message: &str) -> anyhow::Error {
    PortfolioError::ValidationError(message.to_string()).into()
}
