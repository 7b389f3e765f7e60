use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod formatters;

#[derive(Parser)]
#[command(name = "shadow")]
#[command(version, about = "Shadow portfolio NAV reconstruction and reporting")]
#[command(
    long_about = "Replay a trade ledger against daily closes to rebuild the NAV of a two-currency shadow portfolio, then report performance, holdings, allocations and a benchmark comparison chart."
)]
pub struct Cli {
    /// Disable colorized/ANSI output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,

    /// Output results in JSON format
    #[arg(long = "json", global = true)]
    pub json: bool,

    /// Configuration file (defaults to ./shadow.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Rebuild the portfolio and write the JSON snapshot
    Update {
        #[command(flatten)]
        inputs: ReportInputs,

        /// Where to write the snapshot (overrides config output_path)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Cache the price table used for this run as a CSV
        #[arg(long)]
        save_prices: Option<PathBuf>,
    },

    /// Rebuild the portfolio and print it without writing anything
    Show {
        #[command(flatten)]
        inputs: ReportInputs,
    },

    /// Check a trade ledger for errors
    Validate {
        /// Trade ledger CSV (overrides config trades_path)
        #[arg(short, long)]
        trades: Option<PathBuf>,
    },
}

/// Where the ledger and prices come from
#[derive(Args, Debug, Clone, Default)]
pub struct ReportInputs {
    /// Trade ledger CSV (overrides config trades_path)
    #[arg(short, long)]
    pub trades: Option<PathBuf>,

    /// Wide price CSV to use instead of downloading from Yahoo Finance
    #[arg(short, long)]
    pub prices: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_update_parses_all_inputs() {
        let cli = Cli::try_parse_from([
            "shadow",
            "--json",
            "update",
            "--trades",
            "t.csv",
            "--prices",
            "p.csv",
            "-o",
            "out/portfolio.json",
            "--save-prices",
            "cache.csv",
        ])
        .unwrap();

        assert!(cli.json);
        match cli.command {
            Commands::Update {
                inputs,
                output,
                save_prices,
            } => {
                assert_eq!(inputs.trades, Some(PathBuf::from("t.csv")));
                assert_eq!(inputs.prices, Some(PathBuf::from("p.csv")));
                assert_eq!(output, Some(PathBuf::from("out/portfolio.json")));
                assert_eq!(save_prices, Some(PathBuf::from("cache.csv")));
            }
            _ => panic!("expected update"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["shadow", "show", "--no-color", "--config", "x.toml"]).unwrap();
        assert!(cli.no_color);
        assert_eq!(cli.config, Some(PathBuf::from("x.toml")));
        assert!(matches!(cli.command, Commands::Show { .. }));
    }
}
