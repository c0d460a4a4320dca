use anyhow::{anyhow, Result};
use chrono::NaiveDate;
use tracing::info;

use super::{
    build_category_report, build_overview, build_ticker_detail, CategoryReport, Overview, Period,
    RankingPolicy, Rates, TickerDetail,
};
use crate::accounting::replay;
use crate::db::{normalize_ticker, AssetType, DateWindow, LedgerStore, TransactionFilter};

/// Answers report requests against an explicitly supplied store.
///
/// Every request fetches its transaction feed once and the price table
/// once, then derives everything from a fresh replay.
pub struct ReportService<'a, S: LedgerStore + ?Sized> {
    store: &'a S,
    rates: Rates,
    policy: RankingPolicy,
}

impl<'a, S: LedgerStore + ?Sized> ReportService<'a, S> {
    pub fn new(store: &'a S, rates: Rates, policy: RankingPolicy) -> Self {
        Self {
            store,
            rates,
            policy,
        }
    }

    pub fn overview(&self) -> Result<Overview> {
        let transactions = self.store.transactions(&TransactionFilter::all())?;
        let prices = self.store.current_prices()?;
        let state = replay(&transactions)?;

        info!(
            transactions = transactions.len(),
            positions = state.positions.len(),
            "built overview"
        );
        Ok(build_overview(
            &state,
            &prices,
            &self.rates,
            self.policy.overview_top_n,
        ))
    }

    /// Category report over an explicit window (`None` means all time)
    pub fn category(&self, category: AssetType, window: Option<DateWindow>) -> Result<CategoryReport> {
        let mut filter = TransactionFilter::category(category);
        if let Some(window) = window {
            filter = filter.until(window.end);
        }
        let transactions = self.store.transactions(&filter)?;
        let prices = self.store.current_prices()?;

        let report = build_category_report(
            &transactions,
            category,
            window,
            &prices,
            &self.rates,
            self.policy.category_top_n,
        )?;

        info!(
            %category,
            period = %report.period_label,
            transactions = transactions.len(),
            "built category report"
        );
        Ok(report)
    }

    /// Category report for a named period resolved against `today`
    pub fn category_for_period(
        &self,
        category: AssetType,
        period: Period,
        today: NaiveDate,
    ) -> Result<CategoryReport> {
        let window = period.window(today)?;
        self.category(category, window)
    }

    /// Drill into one ticker; unknown tickers are an error.
    pub fn ticker(&self, ticker: &str) -> Result<TickerDetail> {
        let ticker = normalize_ticker(ticker);
        let transactions = self.store.transactions(&TransactionFilter::ticker(&ticker))?;
        let prices = self.store.current_prices()?;
        let state = replay(&transactions)?;

        let detail = build_ticker_detail(&state, &ticker, &prices, &self.rates)
            .ok_or_else(|| anyhow!("Ticker {} not found in ledger", ticker))?;

        info!(%ticker, transactions = transactions.len(), "built ticker detail");
        Ok(detail)
    }
}
