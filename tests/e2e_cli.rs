use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
use rust_decimal_macros::dec;
use std::process::Command;
use tempfile::TempDir;

mod cli_helpers;
use cli_helpers::*;

fn setup_temp_home() -> TempDir {
    TempDir::new().expect("failed to create temp home")
}

#[test]
fn overview_on_empty_ledger_renders_zeroes_without_color() {
    let home = setup_temp_home();

    base_cmd(&home)
        .args(["report", "overview"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Portfolio Overview"))
        .stdout(predicate::str::contains("No open positions"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn init_creates_default_database() {
    let home = setup_temp_home();

    base_cmd(&home)
        .arg("init")
        .assert()
        .success()
        .stdout(predicate::str::contains("Ledger ready"));

    assert!(db_path(&home).exists());
}

#[test]
fn explicit_db_flag_is_honoured() {
    let home = setup_temp_home();
    let custom = home.path().join("elsewhere.db");

    let mut cmd = Command::new(cargo::cargo_bin!("tally"));
    cmd.env("HOME", home.path())
        .env("XDG_CONFIG_HOME", config_home(&home))
        .args(["--no-color", "--db"])
        .arg(&custom)
        .args(["cash", "250", "--type", "other"]);
    cmd.assert().success();

    assert!(custom.exists());
    assert!(!db_path(&home).exists());
}

#[test]
fn trade_flow_reports_positions_and_pnl() {
    let home = setup_temp_home();

    run_cmd(&home, &["cash", "5000", "--type", "stock", "--at", "2025-01-01"]).unwrap();
    run_cmd(&home, &["trade", "aapl", "20", "150", "--at", "2025-01-02"]).unwrap();
    run_cmd(&home, &["trade", "AAPL", "-5", "170", "--at", "2025-02-01"]).unwrap();
    run_cmd(&home, &["dividend", "AAPL", "7.5", "--at", "2025-02-15"]).unwrap();
    run_cmd(&home, &["price", "set", "AAPL", "160"]).unwrap();

    let overview = overview_json(&home).unwrap();
    assert_eq!(decimal(&overview["cash_available"]), dec!(2857.5));
    assert_eq!(decimal(&overview["total_market_value"]), dec!(2400));
    assert_eq!(decimal(&overview["realized_pnl"]), dec!(100));
    assert_eq!(decimal(&overview["unrealized_pnl"]), dec!(150));
    assert_eq!(decimal(&overview["total_pnl"]), dec!(257.5));
    assert_eq!(overview["top_winners"][0]["ticker"], "AAPL");
    assert_eq!(overview["category_breakdown"][0]["asset_type"], "STOCK");

    let detail = run_cmd_json(&home, &["report", "ticker", "aapl"]).unwrap();
    assert_eq!(decimal(&detail["quantity_held"]), dec!(15));
    assert_eq!(decimal(&detail["dividend_income"]), dec!(7.5));

    base_cmd(&home)
        .args(["report", "ticker", "AAPL"])
        .assert()
        .success()
        .stdout(predicate::str::contains("AAPL"))
        .stdout(predicate::str::contains("+150.00"));
}

#[test]
fn overselling_fails_and_reports_shortfall() {
    let home = setup_temp_home();
    run_cmd(&home, &["trade", "BTC", "0.5", "40000", "--type", "crypto"]).unwrap();

    base_cmd(&home)
        .args(["trade", "BTC", "-1", "45000", "--type", "crypto"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("insufficient holdings of BTC"))
        .stderr(predicate::str::contains("short by 0.5"));

    let listed = run_cmd_json(&home, &["transactions", "list"]).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(1));
}

#[test]
fn withdrawing_more_than_cash_fails() {
    let home = setup_temp_home();
    run_cmd(&home, &["cash", "100"]).unwrap();

    base_cmd(&home)
        .args(["cash", "-150"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("CASH"));
}

#[test]
fn withdrawal_can_spend_gains_from_another_category() {
    let home = setup_temp_home();
    run_cmd(&home, &["cash", "1000", "--at", "2025-01-01"]).unwrap();
    run_cmd(&home, &["trade", "BTC", "1", "1000", "--type", "crypto", "--at", "2025-01-02"]).unwrap();
    run_cmd(&home, &["trade", "BTC", "-1", "1500", "--type", "crypto", "--at", "2025-01-03"]).unwrap();

    run_cmd(&home, &["cash", "-1200", "--reason", "rent", "--at", "2025-01-04"]).unwrap();

    let overview = overview_json(&home).unwrap();
    assert_eq!(decimal(&overview["cash_available"]), dec!(300));
    assert_eq!(decimal(&overview["net_invested"]), dec!(-200));
}

#[test]
fn edit_and_delete_transactions() {
    let home = setup_temp_home();
    let saved = run_cmd_json(&home, &["trade", "ETH", "2", "2000", "--type", "crypto"]).unwrap();
    let id = saved["id"].as_i64().unwrap().to_string();

    let edited = run_cmd_json(&home, &["transactions", "edit", &id, "--price", "2100"]).unwrap();
    assert_eq!(decimal(&edited["total_value"]), dec!(4200));

    run_cmd(&home, &["transactions", "delete", &id]).unwrap();
    base_cmd(&home)
        .args(["transactions", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No transactions found"));
}

#[test]
fn category_report_for_custom_period() {
    let home = setup_temp_home();
    run_cmd(&home, &["trade", "SOL", "10", "20", "--type", "crypto", "--at", "2025-01-10"]).unwrap();
    run_cmd(&home, &["trade", "SOL", "-4", "50", "--type", "crypto", "--at", "2025-05-02"]).unwrap();

    let report = run_cmd_json(
        &home,
        &["report", "category", "crypto", "--period", "2025-04-01:2025-06-30"],
    )
    .unwrap();
    assert_eq!(report["period_label"], "2025-04-01 to 2025-06-30");
    assert_eq!(decimal(&report["realized_pnl_in_period"]), dec!(120));
    assert_eq!(decimal(&report["total_buy"]), dec!(0));
    assert_eq!(report["top_contributors"][0]["ticker"], "SOL");
}

#[test]
fn unknown_ticker_drill_down_fails() {
    let home = setup_temp_home();
    base_cmd(&home)
        .args(["report", "ticker", "NOPE"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not found"));
}

#[test]
fn import_dry_run_does_not_create_db() {
    let home = setup_temp_home();
    let feed = write_feed(
        &home,
        "feed.csv",
        &[
            "2025-01-01,,OTHER,IN,1000,1,,",
            "2025-01-02,GOLD,OTHER,BUY,2,300,,",
        ],
    )
    .unwrap();

    base_cmd(&home)
        .arg("import")
        .arg(&feed)
        .arg("--dry-run")
        .assert()
        .success()
        .stdout(predicate::str::contains("Found 2 transactions"))
        .stdout(predicate::str::contains("Dry run"))
        .stdout(predicate::str::contains("400.00"));

    assert!(!db_path(&home).exists(), "dry-run should not create db");
}

#[test]
fn import_then_overview_shows_position() {
    let home = setup_temp_home();
    let feed = write_feed(
        &home,
        "feed.csv",
        &[
            "2025-01-01,,STOCK,DEPOSIT,1000,1,,",
            "2025-01-02T09:30:00Z,KO,STOCK,BUY,10,60,,",
        ],
    )
    .unwrap();

    let imported = run_cmd_json(&home, &["import", feed.to_str().unwrap()]).unwrap();
    assert_eq!(imported["imported"], 2);

    let overview = overview_json(&home).unwrap();
    assert_eq!(decimal(&overview["net_worth"]), dec!(1000));
    assert_eq!(overview["holdings"][0]["ticker"], "KO");
}

#[test]
fn malformed_feed_is_rejected_whole() {
    let home = setup_temp_home();
    let feed = write_feed(
        &home,
        "bad.csv",
        &["2025-01-01,KO,STOCK,BUY,10,60,,", "2025-01-02,KO,STOCK,SWAP,1,1,,"],
    )
    .unwrap();

    base_cmd(&home)
        .arg("import")
        .arg(&feed)
        .assert()
        .failure()
        .stderr(predicate::str::contains("row 3"));

    let listed = run_cmd_json(&home, &["transactions", "list"]).unwrap();
    assert_eq!(listed.as_array().map(Vec::len), Some(0));
}

#[test]
fn config_rates_apply_to_trades() {
    let home = setup_temp_home();
    write_config(&home, "[rates]\ncrypto = 2\n").unwrap();

    let saved = run_cmd_json(&home, &["trade", "BTC", "1", "100", "--type", "crypto"]).unwrap();
    assert_eq!(decimal(&saved["total_value"]), dec!(200));
    assert_eq!(decimal(&saved["price"]), dec!(100));
}

#[test]
fn invalid_config_is_reported() {
    let home = setup_temp_home();
    write_config(&home, "[rates]\nstock = 0\n").unwrap();

    base_cmd(&home)
        .args(["report", "overview"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("rate for STOCK must be positive"));
}
