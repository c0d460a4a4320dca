use rust_decimal::Decimal;
use serde::Serialize;

use super::{percent_of, rank_by, value_position, PriceMap, Rates, Valuation};
use crate::accounting::LedgerState;
use crate::db::AssetType;

/// Per-category slice of the overview
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryBreakdown {
    pub asset_type: AssetType,
    pub market_value: Decimal,
    pub allocation_pct: Decimal,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub dividend_income: Decimal,
    pub total_pnl: Decimal,
}

/// Whole-portfolio report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Overview {
    pub net_worth: Decimal,
    pub cash_available: Decimal,
    pub total_market_value: Decimal,
    pub category_breakdown: Vec<CategoryBreakdown>,
    pub realized_pnl: Decimal,
    pub unrealized_pnl: Decimal,
    pub dividend_income: Decimal,
    pub total_pnl: Decimal,
    pub roi: Decimal,
    pub top_winners: Vec<Valuation>,
    pub top_losers: Vec<Valuation>,
    pub total_in: Decimal,
    pub total_out: Decimal,
    pub net_invested: Decimal,
    pub total_buy: Decimal,
    pub total_sell: Decimal,
    pub holdings: Vec<Valuation>,
}

pub fn build_overview(
    state: &LedgerState,
    prices: &PriceMap,
    rates: &Rates,
    top_n: usize,
) -> Overview {
    let valuations: Vec<Valuation> = state
        .positions
        .values()
        .map(|position| value_position(position, prices, rates))
        .collect();

    let total_market_value: Decimal = valuations.iter().map(|v| v.market_value).sum();
    let realized_pnl: Decimal = valuations.iter().map(|v| v.realized_pnl).sum();
    let unrealized_pnl: Decimal = valuations.iter().map(|v| v.unrealized_pnl).sum();
    let dividend_income: Decimal = valuations.iter().map(|v| v.dividend_income).sum();
    let total_pnl = realized_pnl + unrealized_pnl + dividend_income;

    let net_worth = state.cash_available + total_market_value;
    let net_invested = state.net_invested();

    // Allocation divides by net worth floored at one unit, so an empty or
    // negative portfolio still renders with 0 % slices.
    let allocation_base = net_worth.max(Decimal::ONE);

    let category_breakdown = AssetType::ALL
        .iter()
        .map(|asset_type| {
            let slice = valuations.iter().filter(|v| v.asset_type == *asset_type);
            let mut breakdown = CategoryBreakdown {
                asset_type: *asset_type,
                market_value: Decimal::ZERO,
                allocation_pct: Decimal::ZERO,
                realized_pnl: Decimal::ZERO,
                unrealized_pnl: Decimal::ZERO,
                dividend_income: Decimal::ZERO,
                total_pnl: Decimal::ZERO,
            };
            for v in slice {
                breakdown.market_value += v.market_value;
                breakdown.realized_pnl += v.realized_pnl;
                breakdown.unrealized_pnl += v.unrealized_pnl;
                breakdown.dividend_income += v.dividend_income;
                breakdown.total_pnl += v.total_pnl;
            }
            breakdown.allocation_pct =
                breakdown.market_value / allocation_base * Decimal::ONE_HUNDRED;
            breakdown
        })
        .collect();

    let (top_winners, top_losers) =
        rank_by(&valuations, top_n, |v| v.total_pnl, |v| v.ticker.as_str());

    let holdings = valuations
        .iter()
        .filter(|v| v.quantity_held > Decimal::ZERO)
        .cloned()
        .collect();

    Overview {
        net_worth,
        cash_available: state.cash_available,
        total_market_value,
        category_breakdown,
        realized_pnl,
        unrealized_pnl,
        dividend_income,
        total_pnl,
        roi: percent_of(total_pnl, net_invested),
        top_winners,
        top_losers,
        total_in: state.total_in,
        total_out: state.total_out,
        net_invested,
        total_buy: state.total_buy,
        total_sell: state.total_sell,
        holdings,
    }
}
