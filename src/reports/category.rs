use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::BTreeMap;

use super::{rank_by, value_position, PriceMap, Rates};
use crate::accounting::{replay_positions, PnlKind};
use crate::db::{AssetType, DateWindow, Transaction, TransactionKind};
use crate::error::AccountingError;

/// A ticker's share of the category result for the period
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerContribution {
    pub ticker: String,
    pub realized_in_period: Decimal,
    pub unrealized_pnl: Decimal,
    pub contribution: Decimal,
}

/// Category report, optionally restricted to a date window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub category: AssetType,
    pub period_label: String,
    pub window: Option<DateWindow>,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net_cash_flow: Decimal,
    pub total_buy: Decimal,
    pub total_sell: Decimal,
    /// SELL profit plus CASH_DIVIDEND income booked inside the window
    pub realized_pnl_in_period: Decimal,
    pub dividends_in_period: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub top_contributors: Vec<TickerContribution>,
    pub top_detractors: Vec<TickerContribution>,
}

/// Build the report for `category` from an ascending feed.
///
/// The feed is replayed up to the end of the window so cost basis carried
/// in from earlier periods is honoured; only flows and P&L events inside
/// the window are attributed to the period.
pub fn build_category_report(
    transactions: &[Transaction],
    category: AssetType,
    window: Option<DateWindow>,
    prices: &PriceMap,
    rates: &Rates,
    top_n: usize,
) -> Result<CategoryReport, AccountingError> {
    let end = window.map(|w| w.end_exclusive());
    let history = transactions
        .iter()
        .filter(|tx| tx.asset_type == category)
        .filter(|tx| end.map_or(true, |end| tx.timestamp < end));

    let state = replay_positions(history)?;

    let in_period = |timestamp: &DateTime<Utc>| window.map_or(true, |w| w.contains(timestamp));

    let mut report = CategoryReport {
        category,
        period_label: window
            .map(|w| w.label())
            .unwrap_or_else(|| "All time".to_string()),
        window,
        total_in: Decimal::ZERO,
        total_out: Decimal::ZERO,
        net_cash_flow: Decimal::ZERO,
        total_buy: Decimal::ZERO,
        total_sell: Decimal::ZERO,
        realized_pnl_in_period: Decimal::ZERO,
        dividends_in_period: Decimal::ZERO,
        market_value: Decimal::ZERO,
        unrealized_pnl: Decimal::ZERO,
        top_contributors: Vec::new(),
        top_detractors: Vec::new(),
    };

    for tx in transactions
        .iter()
        .filter(|tx| tx.asset_type == category && in_period(&tx.timestamp))
    {
        match tx.kind {
            TransactionKind::Deposit => report.total_in += tx.total_value,
            TransactionKind::Withdraw => report.total_out += tx.total_value,
            TransactionKind::Buy => report.total_buy += tx.total_value,
            TransactionKind::Sell => report.total_sell += tx.total_value,
            TransactionKind::CashDividend | TransactionKind::StockDividend => {}
        }
    }
    report.net_cash_flow = report.total_in - report.total_out;

    let mut realized_by_ticker: BTreeMap<&str, Decimal> = BTreeMap::new();
    for event in state.pnl_events.iter().filter(|e| in_period(&e.timestamp)) {
        *realized_by_ticker.entry(event.ticker.as_str()).or_default() += event.amount;
        report.realized_pnl_in_period += event.amount;
        if event.kind == PnlKind::Dividend {
            report.dividends_in_period += event.amount;
        }
    }

    let contributions: Vec<TickerContribution> = state
        .positions
        .values()
        .map(|position| {
            let valuation = value_position(position, prices, rates);
            report.market_value += valuation.market_value;
            report.unrealized_pnl += valuation.unrealized_pnl;

            let realized_in_period = realized_by_ticker
                .get(position.ticker.as_str())
                .copied()
                .unwrap_or_default();
            TickerContribution {
                ticker: position.ticker.clone(),
                realized_in_period,
                unrealized_pnl: valuation.unrealized_pnl,
                contribution: realized_in_period + valuation.unrealized_pnl,
            }
        })
        .collect();

    let (top_contributors, top_detractors) =
        rank_by(&contributions, top_n, |c| c.contribution, |c| c.ticker.as_str());
    report.top_contributors = top_contributors;
    report.top_detractors = top_detractors;

    Ok(report)
}
