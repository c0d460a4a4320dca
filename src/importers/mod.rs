// Import module - transaction feed parsers

pub mod csv_feed;

use anyhow::{anyhow, Result};
use std::path::Path;
use tracing::info;

use crate::db::Transaction;
use crate::reports::Rates;

/// Parse a transaction feed file, picking the parser from the extension.
///
/// The returned transactions are sorted (stably) by timestamp and carry
/// reporting-currency totals.
pub fn import_file<P: AsRef<Path>>(file_path: P, rates: &Rates) -> Result<Vec<Transaction>> {
    let path = file_path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| anyhow!("File has no extension"))?
        .to_lowercase();

    info!("Importing transaction feed: {:?} (type: {})", path, extension);

    match extension.as_str() {
        "csv" | "txt" => csv_feed::parse_feed_csv(path, rates),
        _ => Err(anyhow!(
            "Unsupported file format: {}. Supported formats: .csv",
            extension
        )),
    }
}
