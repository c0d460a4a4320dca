use anyhow::Result;
use chrono::Utc;

use super::AppContext;
use crate::cli::formatters::{
    format_category_table, format_json, format_overview_table, format_ticker_table,
};
use crate::cli::ReportCommands;
use crate::reports::ReportService;

pub fn dispatch_report(ctx: &AppContext, action: ReportCommands) -> Result<()> {
    let store = ctx.open_store()?;
    let service = ReportService::new(&store, ctx.rates(), ctx.policy());

    match action {
        ReportCommands::Overview => {
            let overview = service.overview()?;
            if ctx.json {
                println!("{}", format_json(&overview));
            } else {
                print!("{}", format_overview_table(&overview));
            }
        }
        ReportCommands::Category { asset_type, period } => {
            let today = Utc::now().date_naive();
            let report = service.category_for_period(asset_type, period, today)?;
            if ctx.json {
                println!("{}", format_json(&report));
            } else {
                print!("{}", format_category_table(&report));
            }
        }
        ReportCommands::Ticker { ticker } => {
            let detail = service.ticker(&ticker)?;
            if ctx.json {
                println!("{}", format_json(&detail));
            } else {
                print!("{}", format_ticker_table(&detail));
            }
        }
    }
    Ok(())
}
