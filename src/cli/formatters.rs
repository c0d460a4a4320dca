//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use chrono::{DateTime, Utc};
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::db::Transaction;
use crate::reports::{CategoryReport, Overview, TickerContribution, TickerDetail, Valuation};
use crate::utils::{format_amount, format_pct, format_quantity, format_signed};

/// Pretty JSON for any report
pub fn format_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!(r#"{{"error": "JSON serialization failed: {}"}}"#, e))
}

fn colored_pnl(value: Decimal) -> String {
    let text = format_signed(value);
    if value > Decimal::ZERO {
        text.green().to_string()
    } else if value < Decimal::ZERO {
        text.red().to_string()
    } else {
        text
    }
}

fn colored_pct(value: Decimal) -> String {
    let text = format_pct(value);
    if value > Decimal::ZERO {
        text.green().to_string()
    } else if value < Decimal::ZERO {
        text.red().to_string()
    } else {
        text
    }
}

fn summary_line(output: &mut String, label: &str, value: String) {
    output.push_str(&format!("\n{:<20} {}", format!("{}:", label).bold(), value));
}

#[derive(Tabled)]
struct HoldingRow {
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Type")]
    asset_type: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Avg Cost")]
    avg_cost: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Unrealized")]
    unrealized: String,
    #[tabled(rename = "Total P&L")]
    total_pnl: String,
}

impl From<&Valuation> for HoldingRow {
    fn from(v: &Valuation) -> Self {
        HoldingRow {
            ticker: v.ticker.clone(),
            asset_type: v.asset_type.to_string(),
            quantity: format_quantity(v.quantity_held),
            avg_cost: format_amount(v.average_cost),
            price: format_amount(v.current_price),
            value: format_amount(v.market_value),
            unrealized: colored_pnl(v.unrealized_pnl),
            total_pnl: colored_pnl(v.total_pnl),
        }
    }
}

fn movers_table(title: &str, movers: &[Valuation]) -> String {
    #[derive(Tabled)]
    struct MoverRow {
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Total P&L")]
        total_pnl: String,
        #[tabled(rename = "Unrealized %")]
        unrealized_pct: String,
    }

    if movers.is_empty() {
        return format!("\n{} none\n", title.bold());
    }

    let rows: Vec<MoverRow> = movers
        .iter()
        .map(|v| MoverRow {
            ticker: v.ticker.clone(),
            total_pnl: colored_pnl(v.total_pnl),
            unrealized_pct: colored_pct(v.unrealized_pct),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{}\n{}\n", title.bold(), table)
}

/// Overview for terminal table output
pub fn format_overview_table(overview: &Overview) -> String {
    let mut output = format!("\n{} Portfolio Overview\n", "📊".cyan().bold());

    summary_line(&mut output, "Net Worth", format_amount(overview.net_worth).bold().to_string());
    summary_line(&mut output, "Cash Available", format_amount(overview.cash_available));
    summary_line(&mut output, "Market Value", format_amount(overview.total_market_value));
    summary_line(&mut output, "Net Invested", format_amount(overview.net_invested));
    summary_line(&mut output, "Realized P&L", colored_pnl(overview.realized_pnl));
    summary_line(&mut output, "Unrealized P&L", colored_pnl(overview.unrealized_pnl));
    summary_line(&mut output, "Dividends", format_amount(overview.dividend_income));
    summary_line(&mut output, "Total P&L", colored_pnl(overview.total_pnl));
    summary_line(&mut output, "ROI", colored_pct(overview.roi));
    output.push('\n');

    #[derive(Tabled)]
    struct AllocationRow {
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Allocation")]
        allocation: String,
        #[tabled(rename = "Realized")]
        realized: String,
        #[tabled(rename = "Unrealized")]
        unrealized: String,
        #[tabled(rename = "Dividends")]
        dividends: String,
    }

    let rows: Vec<AllocationRow> = overview
        .category_breakdown
        .iter()
        .map(|c| AllocationRow {
            category: c.asset_type.to_string(),
            value: format_amount(c.market_value),
            allocation: format_pct(c.allocation_pct),
            realized: colored_pnl(c.realized_pnl),
            unrealized: colored_pnl(c.unrealized_pnl),
            dividends: format_amount(c.dividend_income),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(1..), Alignment::right());
    output.push_str(&format!("\n{}\n", table));

    if overview.holdings.is_empty() {
        output.push_str(&format!("\n{} No open positions\n", "ℹ".blue().bold()));
    } else {
        let rows: Vec<HoldingRow> = overview.holdings.iter().map(HoldingRow::from).collect();
        let mut table = Table::new(&rows);
        table.with(Style::modern());
        table.modify(Columns::new(2..), Alignment::right());
        output.push_str(&format!("\n{}\n", table));
    }

    output.push_str(&movers_table("Top Winners", &overview.top_winners));
    output.push_str(&movers_table("Top Losers", &overview.top_losers));
    output
}

fn contributions_table(title: &str, entries: &[TickerContribution]) -> String {
    #[derive(Tabled)]
    struct ContributionRow {
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Realized")]
        realized: String,
        #[tabled(rename = "Unrealized")]
        unrealized: String,
        #[tabled(rename = "Contribution")]
        contribution: String,
    }

    if entries.is_empty() {
        return format!("\n{} none\n", title.bold());
    }

    let rows: Vec<ContributionRow> = entries
        .iter()
        .map(|c| ContributionRow {
            ticker: c.ticker.clone(),
            realized: colored_pnl(c.realized_in_period),
            unrealized: colored_pnl(c.unrealized_pnl),
            contribution: colored_pnl(c.contribution),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::rounded());
    table.modify(Columns::new(1..), Alignment::right());
    format!("\n{}\n{}\n", title.bold(), table)
}

/// Category report for terminal output
pub fn format_category_table(report: &CategoryReport) -> String {
    let mut output = format!(
        "\n{} {} ({})\n",
        "📈".cyan().bold(),
        report.category,
        report.period_label
    );

    summary_line(&mut output, "Deposits", format_amount(report.total_in));
    summary_line(&mut output, "Withdrawals", format_amount(report.total_out));
    summary_line(&mut output, "Net Cash Flow", format_signed(report.net_cash_flow));
    summary_line(&mut output, "Bought", format_amount(report.total_buy));
    summary_line(&mut output, "Sold", format_amount(report.total_sell));
    summary_line(&mut output, "Realized P&L", colored_pnl(report.realized_pnl_in_period));
    summary_line(&mut output, "  of which dividends", format_amount(report.dividends_in_period));
    summary_line(&mut output, "Market Value", format_amount(report.market_value));
    summary_line(&mut output, "Unrealized P&L", colored_pnl(report.unrealized_pnl));
    output.push('\n');

    output.push_str(&contributions_table("Top Contributors", &report.top_contributors));
    output.push_str(&contributions_table("Top Detractors", &report.top_detractors));
    output
}

/// Ticker drill-down for terminal output
pub fn format_ticker_table(detail: &TickerDetail) -> String {
    let mut output = format!(
        "\n{} {} ({})\n",
        "🔎".cyan().bold(),
        detail.ticker.bold(),
        detail.asset_type
    );

    summary_line(&mut output, "Quantity", format_quantity(detail.quantity_held));
    summary_line(&mut output, "Average Cost", format_amount(detail.average_cost));
    summary_line(&mut output, "Current Price", format_amount(detail.current_price));
    summary_line(&mut output, "Market Value", format_amount(detail.market_value));
    summary_line(
        &mut output,
        "Unrealized P&L",
        format!("{} ({})", colored_pnl(detail.unrealized_pnl), colored_pct(detail.unrealized_pct)),
    );
    summary_line(&mut output, "Units Bought", format_quantity(detail.lifetime_buy_volume));
    summary_line(&mut output, "Units Sold", format_quantity(detail.lifetime_sell_volume));
    summary_line(&mut output, "Realized P&L", colored_pnl(detail.realized_pnl));
    summary_line(&mut output, "Dividends", format_amount(detail.dividend_income));
    summary_line(&mut output, "Total P&L", colored_pnl(detail.total_pnl));
    output.push('\n');
    output
}

#[derive(Tabled)]
struct TransactionRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "When")]
    timestamp: String,
    #[tabled(rename = "Ticker")]
    ticker: String,
    #[tabled(rename = "Type")]
    asset_type: String,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Quantity")]
    quantity: String,
    #[tabled(rename = "Price")]
    price: String,
    #[tabled(rename = "Total")]
    total_value: String,
    #[tabled(rename = "Note")]
    note: String,
}

impl From<&Transaction> for TransactionRow {
    fn from(tx: &Transaction) -> Self {
        TransactionRow {
            id: tx.id.map(|id| id.to_string()).unwrap_or_else(|| "-".to_string()),
            timestamp: tx.timestamp.format("%Y-%m-%d %H:%M").to_string(),
            ticker: tx.ticker.clone(),
            asset_type: tx.asset_type.to_string(),
            kind: tx.kind.to_string(),
            quantity: format_quantity(tx.quantity),
            price: format_amount(tx.price),
            total_value: format_amount(tx.total_value),
            note: tx.note.clone().unwrap_or_default(),
        }
    }
}

pub fn format_transactions_table(transactions: &[Transaction]) -> String {
    if transactions.is_empty() {
        return format_empty_ledger();
    }

    let rows: Vec<TransactionRow> = transactions.iter().map(TransactionRow::from).collect();
    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::new(5..8), Alignment::right());
    format!("\n{}\n{} transaction(s)\n", table, transactions.len())
}

/// One-line confirmation after a mutation
pub fn format_transaction_saved(action: &str, tx: &Transaction) -> String {
    format!(
        "{} {} #{}: {} {} {} @ {} = {}",
        "✓".green().bold(),
        action,
        tx.id.unwrap_or_default(),
        tx.kind,
        format_quantity(tx.quantity),
        tx.ticker.cyan().bold(),
        format_amount(tx.price),
        format_amount(tx.total_value)
    )
}

pub fn format_prices_table(prices: &[(String, Decimal, DateTime<Utc>)]) -> String {
    #[derive(Tabled)]
    struct PriceRow {
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Updated")]
        updated_at: String,
    }

    if prices.is_empty() {
        return format!("{} No prices stored\n", "ℹ".blue().bold());
    }

    let rows: Vec<PriceRow> = prices
        .iter()
        .map(|(ticker, price, updated_at)| PriceRow {
            ticker: ticker.clone(),
            price: format_amount(*price),
            updated_at: updated_at.format("%Y-%m-%d %H:%M").to_string(),
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    table.modify(Columns::one(1), Alignment::right());
    format!("\n{}\n", table)
}

/// Format empty ledger message
pub fn format_empty_ledger() -> String {
    format!(
        "{} No transactions found\nRecord one with: {} cash <AMOUNT> or {} import <file>\n",
        "ℹ".blue().bold(),
        "tally".bold(),
        "tally".bold()
    )
}
