//! Ledger mutations, reports and import against a real SQLite file

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::io::Write;
use tempfile::TempDir;

use tally::db::{self, AssetType, LedgerStore, SqliteStore, TransactionFilter, TransactionKind};
use tally::importers;
use tally::ledger::{Ledger, TransactionAmendment};
use tally::reports::{RankingPolicy, Rates, ReportService};
use tally::AccountingError;

/// Create a temporary ledger database for testing
fn create_test_db() -> (TempDir, SqliteStore) {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("ledger.db");
    db::init_database(Some(db_path.clone())).unwrap();
    let store = SqliteStore::open(Some(db_path)).unwrap();
    (temp_dir, store)
}

fn day(m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, m, d, 14, 30, 0).unwrap()
}

#[test]
fn mutations_flow_into_reports() {
    let (_dir, mut store) = create_test_db();
    {
        let mut ledger = Ledger::new(&mut store, Rates::default());
        ledger
            .adjust_cash(dec!(10000), AssetType::Stock, Some("initial funding"), day(1, 2))
            .unwrap();
        ledger
            .execute_trade("NVDA", AssetType::Stock, dec!(10), dec!(500), day(1, 3))
            .unwrap();
        ledger
            .execute_trade("NVDA", AssetType::Stock, dec!(-4), dec!(600), day(2, 3))
            .unwrap();
        ledger
            .record_cash_dividend("NVDA", AssetType::Stock, dec!(12), day(3, 1))
            .unwrap();
        ledger.set_price("nvda", dec!(550), day(3, 2)).unwrap();
    }

    let service = ReportService::new(&store, Rates::default(), RankingPolicy::default());
    let overview = service.overview().unwrap();

    assert_eq!(overview.cash_available, dec!(7412));
    assert_eq!(overview.total_market_value, dec!(3300));
    assert_eq!(overview.net_worth, dec!(10712));
    assert_eq!(overview.realized_pnl, dec!(400));
    assert_eq!(overview.unrealized_pnl, dec!(300));
    assert_eq!(overview.dividend_income, dec!(12));
    assert_eq!(overview.total_pnl, dec!(712));
    assert_eq!(overview.roi, dec!(7.12));
    assert_eq!(overview.top_winners[0].ticker, "NVDA");

    let detail = service.ticker("NVDA").unwrap();
    assert_eq!(detail.quantity_held, dec!(6));
    assert_eq!(detail.lifetime_buy_volume, dec!(10));

    let window = tally::db::DateWindow::new(
        NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
        NaiveDate::from_ymd_opt(2025, 3, 31).unwrap(),
    );
    let category = service.category(AssetType::Stock, window).unwrap();
    assert_eq!(category.total_buy, Decimal::ZERO);
    assert_eq!(category.total_sell, dec!(2400));
    assert_eq!(category.realized_pnl_in_period, dec!(412));
    assert_eq!(category.dividends_in_period, dec!(12));
}

#[test]
fn rejected_mutation_leaves_database_untouched() {
    let (_dir, mut store) = create_test_db();
    {
        let mut ledger = Ledger::new(&mut store, Rates::default());
        ledger
            .execute_trade("SOL", AssetType::Crypto, dec!(3), dec!(100), day(1, 1))
            .unwrap();

        let err = ledger
            .execute_trade("SOL", AssetType::Crypto, dec!(-5), dec!(120), day(1, 2))
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<AccountingError>(),
            Some(AccountingError::InsufficientHoldings { .. })
        ));
    }

    let feed = store.transactions(&TransactionFilter::all()).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].kind, TransactionKind::Buy);
}

#[test]
fn backdated_sale_before_purchase_is_rejected() {
    let (_dir, mut store) = create_test_db();
    let mut ledger = Ledger::new(&mut store, Rates::default());
    ledger
        .execute_trade("AMD", AssetType::Stock, dec!(5), dec!(100), day(3, 1))
        .unwrap();

    assert!(ledger
        .execute_trade("AMD", AssetType::Stock, dec!(-5), dec!(110), day(2, 1))
        .is_err());
}

#[test]
fn edit_moving_a_buy_after_its_sale_is_rolled_back() {
    let (_dir, mut store) = create_test_db();
    let buy = {
        let mut ledger = Ledger::new(&mut store, Rates::default());
        let buy = ledger
            .execute_trade("ETH", AssetType::Crypto, dec!(1), dec!(2000), day(1, 1))
            .unwrap();
        ledger
            .execute_trade("ETH", AssetType::Crypto, dec!(-1), dec!(2500), day(1, 10))
            .unwrap();

        let moved = TransactionAmendment {
            timestamp: Some(day(1, 20)),
            ..Default::default()
        };
        assert!(ledger.amend_transaction(buy.id.unwrap(), moved).is_err());
        buy
    };

    let stored = db::get_transaction(store.conn(), buy.id.unwrap())
        .unwrap()
        .unwrap();
    assert_eq!(stored.timestamp, day(1, 1));
}

#[test]
fn configured_rates_convert_at_entry_and_valuation() {
    let (_dir, mut store) = create_test_db();
    let rates = Rates {
        crypto: dec!(5),
        ..Rates::default()
    };
    {
        let mut ledger = Ledger::new(&mut store, rates);
        ledger
            .execute_trade("BTC", AssetType::Crypto, dec!(1), dec!(1000), day(1, 1))
            .unwrap();
        ledger.set_price("BTC", dec!(1100), day(1, 2)).unwrap();
    }

    let detail = ReportService::new(&store, rates, RankingPolicy::default())
        .ticker("BTC")
        .unwrap();
    assert_eq!(detail.average_cost, dec!(5000));
    assert_eq!(detail.current_price, dec!(5500));
    assert_eq!(detail.unrealized_pnl, dec!(500));
}

#[test]
fn csv_import_is_atomic() {
    let (dir, mut store) = create_test_db();

    let good = dir.path().join("good.csv");
    let mut file = std::fs::File::create(&good).unwrap();
    writeln!(file, "timestamp,ticker,asset_type,kind,quantity,price,total_value,note").unwrap();
    writeln!(file, "2025-01-05,ADA,CRYPTO,BUY,100,0.5,,").unwrap();
    writeln!(file, "2025-01-01,,CRYPTO,DEPOSIT,100,1,,seed").unwrap();
    drop(file);

    let oversell = dir.path().join("oversell.csv");
    let mut file = std::fs::File::create(&oversell).unwrap();
    writeln!(file, "timestamp,ticker,asset_type,kind,quantity,price").unwrap();
    writeln!(file, "2025-02-01,ADA,CRYPTO,SELL,500,0.6").unwrap();
    drop(file);

    let mut ledger = Ledger::new(&mut store, Rates::default());

    let rows = importers::import_file(&good, &Rates::default()).unwrap();
    assert_eq!(rows[0].kind, TransactionKind::Deposit);
    assert_eq!(ledger.import_transactions(&rows).unwrap(), 2);

    let rows = importers::import_file(&oversell, &Rates::default()).unwrap();
    assert!(ledger.import_transactions(&rows).is_err());
    drop(ledger);

    let feed = store.transactions(&TransactionFilter::all()).unwrap();
    assert_eq!(feed.len(), 2);
    assert_eq!(feed[1].ticker, "ADA");
}

#[test]
fn unknown_extension_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("feed.xlsx");
    std::fs::write(&path, b"not a spreadsheet").unwrap();
    assert!(importers::import_file(&path, &Rates::default()).is_err());
}
