//! Tally - personal portfolio ledger
//!
//! Replays an ordered transaction feed with weighted-average cost to derive
//! positions, realized and unrealized P&L, and builds overview, category and
//! ticker reports on top of that replay.

pub mod accounting;
pub mod cli;
pub mod config;
pub mod db;
pub mod dispatcher;
pub mod error;
pub mod importers;
pub mod ledger;
pub mod reports;
pub mod utils;

pub use accounting::{replay, replay_positions, LedgerState, Position};
pub use error::{AccountingError, PortfolioError};
