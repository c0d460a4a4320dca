use rust_decimal::Decimal;
use serde::Serialize;

use super::{value_position, PriceMap, Rates};
use crate::accounting::LedgerState;
use crate::db::AssetType;

/// Single-ticker drill-down
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TickerDetail {
    pub ticker: String,
    pub asset_type: AssetType,
    pub quantity_held: Decimal,
    pub average_cost: Decimal,
    /// Reporting-currency price (native price times the category rate)
    pub current_price: Decimal,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pct: Decimal,
    pub lifetime_buy_volume: Decimal,
    pub lifetime_sell_volume: Decimal,
    pub realized_pnl: Decimal,
    pub dividend_income: Decimal,
    /// Realized + unrealized + dividends
    pub total_pnl: Decimal,
}

/// Drill into `ticker`; `None` when the ledger never saw it.
pub fn build_ticker_detail(
    state: &LedgerState,
    ticker: &str,
    prices: &PriceMap,
    rates: &Rates,
) -> Option<TickerDetail> {
    let position = state.position(ticker)?;
    let valuation = value_position(position, prices, rates);

    Some(TickerDetail {
        ticker: position.ticker.clone(),
        asset_type: position.asset_type,
        quantity_held: position.quantity_held,
        average_cost: position.average_cost,
        current_price: valuation.current_price,
        market_value: valuation.market_value,
        unrealized_pnl: valuation.unrealized_pnl,
        unrealized_pct: valuation.unrealized_pct,
        lifetime_buy_volume: position.total_buy_volume,
        lifetime_sell_volume: position.total_sell_volume,
        realized_pnl: position.realized_pnl,
        dividend_income: position.dividend_income,
        total_pnl: valuation.total_pnl,
    })
}
