//! Command dispatcher that routes parsed CLI commands to their handlers.

use anyhow::{Context, Result};
use chrono::Local;
use colored::Colorize;
use itertools::Itertools;
use serde::Serialize;
use std::path::Path;
use tracing::info;

use crate::cli::{formatters, Cli, Commands, ReportInputs};
use crate::config::Config;
use crate::ledger::Ledger;
use crate::prices::PriceTable;
use crate::pricing;
use crate::report::{generate_report, PortfolioReport, PortfolioSnapshot};

/// Route a parsed command line to its handler
pub async fn dispatch(cli: Cli) -> Result<()> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Update {
            inputs,
            output,
            save_prices,
        } => {
            let output = output.unwrap_or_else(|| config.output_path.clone());
            handle_update(&config, &inputs, &output, save_prices.as_deref(), cli.json).await
        }
        Commands::Show { inputs } => handle_show(&config, &inputs, cli.json).await,
        Commands::Validate { trades } => {
            let path = trades.unwrap_or_else(|| config.trades_path.clone());
            handle_validate(&config, &path, cli.json)
        }
    }
}

fn load_ledger(config: &Config, path: &Path) -> Result<Ledger> {
    Ledger::from_csv(path, &config.currencies)
}

/// Offline CSV when given, otherwise download every ledger ticker, benchmark
/// and the FX pair from inception to today
async fn load_prices(config: &Config, ledger: &Ledger, inputs: &ReportInputs) -> Result<PriceTable> {
    if let Some(path) = &inputs.prices {
        return PriceTable::from_csv(path);
    }

    let symbols: Vec<String> = ledger
        .tickers()
        .into_iter()
        .chain(config.reference_symbols())
        .unique()
        .collect();
    let today = Local::now().date_naive();
    pricing::fetch_price_table(&symbols, ledger.inception(), today)
        .await
        .context("Failed to download prices")
}

async fn build(config: &Config, inputs: &ReportInputs) -> Result<(PortfolioReport, PriceTable)> {
    let trades_path = inputs
        .trades
        .clone()
        .unwrap_or_else(|| config.trades_path.clone());
    let ledger = load_ledger(config, &trades_path)?;
    let prices = load_prices(config, &ledger, inputs).await?;
    let report = generate_report(&ledger, &prices, config, Local::now().naive_local())?;
    Ok((report, prices))
}

async fn handle_update(
    config: &Config,
    inputs: &ReportInputs,
    output: &Path,
    save_prices: Option<&Path>,
    json_output: bool,
) -> Result<()> {
    let (report, prices) = build(config, inputs).await?;

    if let Some(path) = save_prices {
        prices.write_csv(path)?;
        info!("Price table cached to {:?}", path);
    }

    let snapshot = PortfolioSnapshot::from_report(&report, config);
    snapshot.write_json(output)?;

    if json_output {
        println!("{}", snapshot.to_json()?);
    } else {
        print!("{}", formatters::format_summary(&report, config));
        println!(
            "\n{} Snapshot written to {}",
            "✓".green().bold(),
            output.display()
        );
    }
    Ok(())
}

async fn handle_show(config: &Config, inputs: &ReportInputs, json_output: bool) -> Result<()> {
    let (report, _) = build(config, inputs).await?;

    if json_output {
        let snapshot = PortfolioSnapshot::from_report(&report, config);
        println!("{}", snapshot.to_json()?);
        return Ok(());
    }

    if report.holdings.is_empty() {
        println!("{} No open positions", "ℹ".blue().bold());
    } else {
        println!("{}", formatters::format_holdings_table(&report, config));
    }
    print!("{}", formatters::format_summary(&report, config));
    Ok(())
}

fn handle_validate(config: &Config, path: &Path, json_output: bool) -> Result<()> {
    let ledger = load_ledger(config, path)?;

    if json_output {
        #[derive(Serialize)]
        struct ValidationJson {
            trades: usize,
            tickers: usize,
            inception: String,
            oversold: Vec<String>,
        }

        let out = ValidationJson {
            trades: ledger.len(),
            tickers: ledger.tickers().len(),
            inception: ledger.inception().format("%Y-%m-%d").to_string(),
            oversold: ledger.oversold_tickers(),
        };
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        print!("{}", formatters::format_validation(&ledger));
    }
    Ok(())
}
