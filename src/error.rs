//! Error handling for the tally ledger
//!
//! Accounting failures are typed (`AccountingError`) so callers can tell an
//! out-of-order feed from an oversell. Everything above the core uses anyhow
//! for context chaining.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

/// Failures that abort a ledger replay. No partial state is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AccountingError {
    #[error(
        "ordering violation: transaction {} at {timestamp} precedes the previous event at {previous}",
        tx_label(.id)
    )]
    OrderingViolation {
        id: Option<i64>,
        timestamp: DateTime<Utc>,
        previous: DateTime<Utc>,
    },

    #[error(
        "insufficient holdings of {ticker} for transaction {}: requested {requested}, available {available} (short by {shortfall})",
        tx_label(.id)
    )]
    InsufficientHoldings {
        id: Option<i64>,
        ticker: String,
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("malformed transaction {}: {reason}", tx_label(.id))]
    MalformedTransaction { id: Option<i64>, reason: String },
}

impl AccountingError {
    pub fn malformed(id: Option<i64>, reason: impl Into<String>) -> Self {
        AccountingError::MalformedTransaction {
            id,
            reason: reason.into(),
        }
    }

    /// Id of the offending ledger record, when it has been persisted.
    pub fn transaction_id(&self) -> Option<i64> {
        match self {
            AccountingError::OrderingViolation { id, .. }
            | AccountingError::InsufficientHoldings { id, .. }
            | AccountingError::MalformedTransaction { id, .. } => *id,
        }
    }
}

fn tx_label(id: &Option<i64>) -> String {
    match id {
        Some(id) => format!("#{}", id),
        None => "(unsaved)".to_string(),
    }
}

/// Errors raised by the storage, import and configuration layers
#[derive(Error, Debug)]
pub enum PortfolioError {
    #[error("parse error: {0}")]
    ParseError(String),

    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("config error: {0}")]
    ConfigError(String),

    #[error(transparent)]
    Accounting(#[from] AccountingError),
}

/// Result type alias for application-level operations
pub type Result<T> = anyhow::Result<T>;
