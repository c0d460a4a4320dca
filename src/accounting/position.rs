use rust_decimal::Decimal;
use serde::Serialize;

use crate::db::{AssetType, Transaction};
use crate::error::AccountingError;

use super::out_of_range;

/// Per-ticker state derived from replaying the ledger
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Position {
    pub ticker: String,
    pub asset_type: AssetType,
    pub quantity_held: Decimal,
    pub average_cost: Decimal,
    /// Total cost of the units currently held
    pub cost_basis: Decimal,
    pub realized_pnl: Decimal,
    pub dividend_income: Decimal,
    pub total_buy_volume: Decimal,
    pub total_sell_volume: Decimal,
}

impl Position {
    pub fn new(ticker: &str, asset_type: AssetType) -> Self {
        Self {
            ticker: ticker.to_string(),
            asset_type,
            quantity_held: Decimal::ZERO,
            average_cost: Decimal::ZERO,
            cost_basis: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            dividend_income: Decimal::ZERO,
            total_buy_volume: Decimal::ZERO,
            total_sell_volume: Decimal::ZERO,
        }
    }

    /// Add a purchase; the average cost is re-weighted with the new lot.
    pub fn add_purchase(&mut self, tx: &Transaction) -> Result<(), AccountingError> {
        let overflow = || out_of_range(tx.id, "purchase");
        let quantity_held = self.quantity_held.checked_add(tx.quantity).ok_or_else(overflow)?;
        let cost_basis = self.cost_basis.checked_add(tx.total_value).ok_or_else(overflow)?;
        let total_buy_volume = self
            .total_buy_volume
            .checked_add(tx.quantity)
            .ok_or_else(overflow)?;
        if quantity_held > Decimal::ZERO {
            self.average_cost = cost_basis.checked_div(quantity_held).ok_or_else(overflow)?;
        }

        self.quantity_held = quantity_held;
        self.cost_basis = cost_basis;
        self.total_buy_volume = total_buy_volume;
        Ok(())
    }

    /// Close `tx.quantity` units at the current average cost and return the
    /// realized profit of this sale. The average cost itself is unchanged.
    pub fn match_sale(&mut self, tx: &Transaction) -> Result<Decimal, AccountingError> {
        if tx.quantity > self.quantity_held {
            return Err(AccountingError::InsufficientHoldings {
                id: tx.id,
                ticker: self.ticker.clone(),
                requested: tx.quantity,
                available: self.quantity_held,
                shortfall: tx.quantity - self.quantity_held,
            });
        }

        let overflow = || out_of_range(tx.id, "sale");
        let sold_cost = tx.quantity.checked_mul(self.average_cost).ok_or_else(overflow)?;
        let realized = tx.total_value.checked_sub(sold_cost).ok_or_else(overflow)?;
        let realized_pnl = self.realized_pnl.checked_add(realized).ok_or_else(overflow)?;
        let total_sell_volume = self
            .total_sell_volume
            .checked_add(tx.quantity)
            .ok_or_else(overflow)?;

        self.quantity_held -= tx.quantity;
        self.cost_basis -= sold_cost;
        self.realized_pnl = realized_pnl;
        self.total_sell_volume = total_sell_volume;

        if self.quantity_held.is_zero() {
            self.average_cost = Decimal::ZERO;
            self.cost_basis = Decimal::ZERO;
        }

        Ok(realized)
    }

    /// Bonus units: quantity grows, total cost stays, so the per-unit
    /// average is diluted.
    pub fn apply_stock_dividend(&mut self, tx: &Transaction) -> Result<(), AccountingError> {
        let overflow = || out_of_range(tx.id, "stock dividend");
        let quantity_held = self.quantity_held.checked_add(tx.quantity).ok_or_else(overflow)?;
        if quantity_held > Decimal::ZERO {
            self.average_cost = self.cost_basis.checked_div(quantity_held).ok_or_else(overflow)?;
        }
        self.quantity_held = quantity_held;
        Ok(())
    }

    pub fn apply_cash_dividend(&mut self, tx: &Transaction) -> Result<(), AccountingError> {
        self.dividend_income = self
            .dividend_income
            .checked_add(tx.total_value)
            .ok_or_else(|| out_of_range(tx.id, "dividend income"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::TransactionKind;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn trade(kind: TransactionKind, qty: Decimal, price: Decimal) -> Transaction {
        Transaction::new(
            "AAPL",
            AssetType::Stock,
            kind,
            qty,
            price,
            qty * price,
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_avg_cost_multiple_buys() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        position.add_purchase(&trade(TransactionKind::Buy, dec!(100), dec!(10))).unwrap();
        position.add_purchase(&trade(TransactionKind::Buy, dec!(100), dec!(20))).unwrap();

        assert_eq!(position.quantity_held, dec!(200));
        assert_eq!(position.average_cost, dec!(15));
        assert_eq!(position.total_buy_volume, dec!(200));
    }

    #[test]
    fn test_sale_keeps_average_cost() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        position.add_purchase(&trade(TransactionKind::Buy, dec!(200), dec!(15))).unwrap();

        let realized = position
            .match_sale(&trade(TransactionKind::Sell, dec!(50), dec!(25)))
            .unwrap();

        assert_eq!(realized, dec!(500));
        assert_eq!(position.quantity_held, dec!(150));
        assert_eq!(position.average_cost, dec!(15));
        assert_eq!(position.cost_basis, dec!(2250));
    }

    #[test]
    fn test_full_liquidation_resets_cost() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        position.add_purchase(&trade(TransactionKind::Buy, dec!(10), dec!(30))).unwrap();
        position
            .match_sale(&trade(TransactionKind::Sell, dec!(10), dec!(40)))
            .unwrap();

        assert!(position.quantity_held.is_zero());
        assert_eq!(position.average_cost, Decimal::ZERO);
        assert_eq!(position.cost_basis, Decimal::ZERO);

        position.add_purchase(&trade(TransactionKind::Buy, dec!(4), dec!(7))).unwrap();
        assert_eq!(position.average_cost, dec!(7));
        assert_eq!(position.realized_pnl, dec!(100));
    }

    #[test]
    fn test_oversell_leaves_position_untouched() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        position.add_purchase(&trade(TransactionKind::Buy, dec!(10), dec!(10))).unwrap();
        let before = position.clone();

        let err = position
            .match_sale(&trade(TransactionKind::Sell, dec!(25), dec!(12)))
            .unwrap_err();

        assert_eq!(position, before);
        match err {
            AccountingError::InsufficientHoldings {
                ticker, shortfall, ..
            } => {
                assert_eq!(ticker, "AAPL");
                assert_eq!(shortfall, dec!(15));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stock_dividend_dilutes_average() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        position.add_purchase(&trade(TransactionKind::Buy, dec!(100), dec!(10))).unwrap();
        position
            .apply_stock_dividend(&trade(TransactionKind::StockDividend, dec!(10), dec!(0)))
            .unwrap();

        assert_eq!(position.quantity_held, dec!(110));
        assert_eq!(position.cost_basis, dec!(1000));
        assert!((position.average_cost - dec!(9.0909090909)).abs() < dec!(0.000001));
    }

    #[test]
    fn test_cost_basis_overflow_is_malformed() {
        let mut position = Position::new("AAPL", AssetType::Stock);
        let mut lot = trade(TransactionKind::Buy, dec!(1), dec!(1));
        lot.total_value = Decimal::MAX;
        position.add_purchase(&lot).unwrap();
        let before = position.clone();

        let err = position.add_purchase(&lot).unwrap_err();

        assert!(matches!(err, AccountingError::MalformedTransaction { .. }));
        assert!(err.to_string().contains("decimal range"));
        assert_eq!(position, before);
    }
}
