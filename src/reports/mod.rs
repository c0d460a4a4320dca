// Reports module - overview, category and ticker drill-down built on a replay

pub mod category;
pub mod overview;
pub mod period;
pub mod service;
pub mod ticker;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::accounting::Position;
use crate::db::AssetType;

pub use category::{build_category_report, CategoryReport, TickerContribution};
pub use overview::{build_overview, CategoryBreakdown, Overview};
pub use period::Period;
pub use service::ReportService;
pub use ticker::{build_ticker_detail, TickerDetail};

/// Latest native unit price per upper-cased ticker
pub type PriceMap = HashMap<String, Decimal>;

/// Overview winners/losers shown per side
pub const OVERVIEW_TOP_N: usize = 2;
/// Category contributors/detractors shown per side
pub const CATEGORY_TOP_N: usize = 3;

/// Manually configured conversion from each category's native currency
/// into the reporting currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Rates {
    pub stock: Decimal,
    pub crypto: Decimal,
    pub other: Decimal,
}

impl Default for Rates {
    fn default() -> Self {
        Self {
            stock: Decimal::ONE,
            crypto: Decimal::ONE,
            other: Decimal::ONE,
        }
    }
}

impl Rates {
    pub fn for_asset(&self, asset_type: AssetType) -> Decimal {
        match asset_type {
            AssetType::Stock => self.stock,
            AssetType::Crypto => self.crypto,
            AssetType::Other => self.other,
        }
    }

    /// `quantity × price` in the reporting currency, or `None` when the
    /// product leaves the decimal range.
    pub fn convert(&self, asset_type: AssetType, quantity: Decimal, price: Decimal) -> Option<Decimal> {
        quantity
            .checked_mul(price)?
            .checked_mul(self.for_asset(asset_type))
    }
}

/// Presentation cut-offs for ranked lists
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingPolicy {
    pub overview_top_n: usize,
    pub category_top_n: usize,
}

impl Default for RankingPolicy {
    fn default() -> Self {
        Self {
            overview_top_n: OVERVIEW_TOP_N,
            category_top_n: CATEGORY_TOP_N,
        }
    }
}

/// A position marked to market in the reporting currency
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Valuation {
    pub ticker: String,
    pub asset_type: AssetType,
    pub quantity_held: Decimal,
    pub average_cost: Decimal,
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pct: Decimal,
    pub realized_pnl: Decimal,
    pub dividend_income: Decimal,
    pub total_pnl: Decimal,
}

/// Mark a position to market. A missing price falls back to the average
/// cost, which leaves unrealized P&L at zero.
pub fn value_position(position: &Position, prices: &PriceMap, rates: &Rates) -> Valuation {
    let current_price = prices
        .get(&position.ticker)
        .map(|native| native * rates.for_asset(position.asset_type))
        .unwrap_or(position.average_cost);

    let unrealized_pnl = (current_price - position.average_cost) * position.quantity_held;
    let invested = position.quantity_held * position.average_cost;
    let unrealized_pct = percent_of(unrealized_pnl, invested);

    Valuation {
        ticker: position.ticker.clone(),
        asset_type: position.asset_type,
        quantity_held: position.quantity_held,
        average_cost: position.average_cost,
        current_price,
        market_value: current_price * position.quantity_held,
        unrealized_pnl,
        unrealized_pct,
        realized_pnl: position.realized_pnl,
        dividend_income: position.dividend_income,
        total_pnl: position.realized_pnl + unrealized_pnl + position.dividend_income,
    }
}

/// `part / whole * 100`, or zero when `whole` is not positive.
pub fn percent_of(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Split entries into the `n` best gainers and `n` worst losers by `key`.
/// Zero-P&L entries appear on neither side; ties keep ticker order.
pub(crate) fn rank_by<T, F, G>(items: &[T], n: usize, key: F, ticker: G) -> (Vec<T>, Vec<T>)
where
    T: Clone,
    F: Fn(&T) -> Decimal,
    G: Fn(&T) -> &str,
{
    let by_ticker = |a: &T, b: &T| ticker(a).cmp(ticker(b));

    let mut winners: Vec<T> = items
        .iter()
        .filter(|item| key(item) > Decimal::ZERO)
        .cloned()
        .collect();
    winners.sort_by(|a, b| match key(b).cmp(&key(a)) {
        Ordering::Equal => by_ticker(a, b),
        other => other,
    });
    winners.truncate(n);

    let mut losers: Vec<T> = items
        .iter()
        .filter(|item| key(item) < Decimal::ZERO)
        .cloned()
        .collect();
    losers.sort_by(|a, b| match key(a).cmp(&key(b)) {
        Ordering::Equal => by_ticker(a, b),
        other => other,
    });
    losers.truncate(n);

    (winners, losers)
}
