#![allow(dead_code)]

use anyhow::{bail, Result};
use assert_cmd::cargo;
use serde_json::Value;
use std::path::PathBuf;
use std::process::{Command, Output};
use tempfile::TempDir;

pub fn config_home(home: &TempDir) -> PathBuf {
    home.path().join(".config")
}

pub fn db_path(home: &TempDir) -> PathBuf {
    home.path().join(".tally").join("ledger.db")
}

pub fn base_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("tally"));
    cmd.env("HOME", home.path());
    cmd.env("XDG_CONFIG_HOME", config_home(home));
    cmd.env_remove("TALLY_CONFIG");
    cmd.env_remove("RUST_LOG");
    cmd.arg("--no-color");
    cmd
}

pub fn run_cmd(home: &TempDir, args: &[&str]) -> Result<Output> {
    let mut cmd = base_cmd(home);
    cmd.args(args);
    let output = cmd.output()?;
    if !output.status.success() {
        bail!(
            "command failed: {:?}\nstdout: {}\nstderr: {}",
            args,
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
    }
    Ok(output)
}

pub fn run_cmd_json(home: &TempDir, args: &[&str]) -> Result<Value> {
    let mut full = vec!["--json"];
    full.extend_from_slice(args);
    let output = run_cmd(home, &full)?;
    let stdout = String::from_utf8(output.stdout)?;
    Ok(serde_json::from_str(&stdout)?)
}

pub fn write_config(home: &TempDir, contents: &str) -> Result<PathBuf> {
    let dir = config_home(home).join("tally");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("config.toml");
    std::fs::write(&path, contents)?;
    Ok(path)
}

pub fn write_feed(home: &TempDir, name: &str, rows: &[&str]) -> Result<PathBuf> {
    let path = home.path().join(name);
    let mut body = String::from("timestamp,ticker,asset_type,kind,quantity,price,total_value,note\n");
    for row in rows {
        body.push_str(row);
        body.push('\n');
    }
    std::fs::write(&path, body)?;
    Ok(path)
}

pub fn overview_json(home: &TempDir) -> Result<Value> {
    run_cmd_json(home, &["report", "overview"])
}

/// JSON decimals are strings; compare them numerically
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .and_then(|s| s.parse().ok())
        .unwrap_or_else(|| panic!("not a decimal string: {}", value))
}
