use assert_cmd::{cargo, prelude::*};
use predicates::prelude::*;
use std::process::Command;
use tempfile::TempDir;

fn shadow_cmd() -> Command {
    let mut cmd = Command::new(cargo::cargo_bin!("shadow"));
    cmd.env("RUST_LOG", "warn")
        .arg("--no-color")
        .arg("--config")
        .arg("tests/data/shadow.toml");
    cmd
}

#[test]
fn update_writes_snapshot_from_offline_prices() {
    let out_dir = TempDir::new().expect("failed to create temp dir");
    let output = out_dir.path().join("site").join("portfolio.json");
    let cached = out_dir.path().join("prices.csv");

    let mut cmd = shadow_cmd();
    cmd.arg("update")
        .arg("--trades")
        .arg("tests/data/trades.csv")
        .arg("--prices")
        .arg("tests/data/prices.csv")
        .arg("--output")
        .arg(&output)
        .arg("--save-prices")
        .arg(&cached);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Snapshot written"))
        .stdout(predicate::str::contains("¥10,186,100"))
        .stdout(predicate::str::contains("\u{001b}[").not());

    let text = std::fs::read_to_string(&output).expect("snapshot should be written");
    let json: serde_json::Value = serde_json::from_str(&text).expect("valid JSON");
    assert_eq!(json["summary"]["portfolio_value"], 10186100.0);
    assert_eq!(json["summary"]["positions_count"], 3);
    assert_eq!(json["holdings"][0]["ticker"], "AAPL");
    assert_eq!(json["holdings"][1]["company_name"], "Toyota Motor");
    assert_eq!(json["holdings"][1]["display_current"], "¥2,610");

    // chart keys keep insertion order in the written file
    let chart = &text[text.find("\"chart\"").expect("chart block")..];
    let positions: Vec<usize> = ["\"dates\"", "\"portfolio\"", "\"Nikkei 225\"", "\"S&P 500\""]
        .iter()
        .map(|key| chart.find(key).expect("chart key present"))
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{:?}", positions);

    let cached_text = std::fs::read_to_string(&cached).expect("price cache should be written");
    assert!(cached_text.starts_with("date,"));
    assert!(cached_text.contains("2024-01-09"));
}

#[test]
fn show_prints_holdings_table_without_color() {
    let mut cmd = shadow_cmd();
    cmd.arg("show")
        .arg("--trades")
        .arg("tests/data/trades.csv")
        .arg("--prices")
        .arg("tests/data/prices.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Toyota Motor"))
        .stdout(predicate::str::contains("MSFT"))
        .stdout(predicate::str::contains("Total Return:"))
        .stdout(predicate::str::contains("+1.86%"))
        .stdout(predicate::str::contains("\u{001b}[").not());
}

#[test]
fn show_json_emits_only_the_snapshot() {
    let mut cmd = shadow_cmd();
    cmd.arg("--json")
        .arg("show")
        .arg("--trades")
        .arg("tests/data/trades.csv")
        .arg("--prices")
        .arg("tests/data/prices.csv");

    let output = cmd.output().expect("failed to run shadow");
    assert!(output.status.success());
    let json: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("stdout should be pure JSON");
    assert_eq!(json["inception_date"], "2024-01-04");
    assert_eq!(json["fx_rate"], 147.0);
    assert!(json["allocations"]["sector"]["Technology"].is_number());
}

#[test]
fn validate_reports_ledger_summary() {
    let mut cmd = shadow_cmd();
    cmd.arg("validate").arg("--trades").arg("tests/data/trades.csv");

    cmd.assert()
        .success()
        .stdout(predicate::str::contains(
            "4 trades across 3 tickers, inception 2024-01-04",
        ));
}

#[test]
fn validate_rejects_ledger_with_missing_columns() {
    let mut cmd = shadow_cmd();
    cmd.arg("validate").arg("--trades").arg("tests/data/bad_trades.csv");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("missing columns"))
        .stderr(predicate::str::contains("action"))
        .stderr(predicate::str::contains("currency"));
}

#[test]
fn missing_config_file_is_an_error() {
    let mut cmd = Command::new(cargo::cargo_bin!("shadow"));
    cmd.arg("--config")
        .arg("tests/data/does_not_exist.toml")
        .arg("validate");

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("config file not found"));
}
