//! Pipeline configuration
//!
//! Everything the engine needs besides the ledger and the price table:
//! starting capital, the currency pair, the FX fallback, the risk-free rate
//! and the sector/benchmark/name classification tables. Loaded from TOML,
//! every field has a default so an absent file yields a usable config.

use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::PortfolioError;

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_PATH: &str = "shadow.toml";

/// Sector label for tickers missing from the classification table
pub const DEFAULT_SECTOR: &str = "Other";

/// Which side of the configured currency pair an amount is denominated in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Currency {
    Base,
    Foreign,
}

/// The two currencies the portfolio deals in, and how to convert between them
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CurrencyPair {
    /// Reporting currency code (e.g. "JPY")
    pub base: String,
    /// The only other currency trades may be denominated in (e.g. "USD")
    pub foreign: String,
    /// Price table symbol holding units of base per one unit of foreign
    pub fx_ticker: String,
    /// Country label for base-currency listings in the geography breakdown
    pub home_country: String,
    /// Country label for foreign-currency listings
    pub foreign_country: String,
}

impl Default for CurrencyPair {
    fn default() -> Self {
        Self {
            base: "JPY".to_string(),
            foreign: "USD".to_string(),
            fx_ticker: "JPY=X".to_string(),
            home_country: "Japan".to_string(),
            foreign_country: "United States".to_string(),
        }
    }
}

impl CurrencyPair {
    /// Resolve a currency code against the pair (case-insensitive)
    pub fn resolve(&self, code: &str) -> Option<Currency> {
        let code = code.trim();
        if code.eq_ignore_ascii_case(&self.base) {
            Some(Currency::Base)
        } else if code.eq_ignore_ascii_case(&self.foreign) {
            Some(Currency::Foreign)
        } else {
            None
        }
    }

    pub fn code(&self, currency: Currency) -> &str {
        match currency {
            Currency::Base => &self.base,
            Currency::Foreign => &self.foreign,
        }
    }

    pub fn country(&self, currency: Currency) -> &str {
        match currency {
            Currency::Base => &self.home_country,
            Currency::Foreign => &self.foreign_country,
        }
    }
}

/// A benchmark index plotted against the portfolio
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Benchmark {
    pub label: String,
    pub ticker: String,
}

impl Benchmark {
    pub fn new(label: &str, ticker: &str) -> Self {
        Self {
            label: label.to_string(),
            ticker: ticker.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub starting_capital: Decimal,
    /// Annualized, as a fraction (0.05 = 5%)
    pub risk_free_rate: Decimal,
    /// Units of base per foreign used whenever no FX observation is available
    pub fallback_fx_rate: Decimal,
    pub currencies: CurrencyPair,
    /// Order is preserved in the report
    pub benchmarks: Vec<Benchmark>,
    pub sectors: BTreeMap<String, String>,
    /// Company name overrides; take precedence over names from the price source
    pub names: BTreeMap<String, String>,
    pub trades_path: PathBuf,
    pub output_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let sectors = [
            ("6501.T", "Industrials"),
            ("8306.T", "Financials"),
            ("6758.T", "Technology"),
            ("8035.T", "Semiconductors"),
            ("7203.T", "Autos"),
            ("9984.T", "Technology"),
            ("4063.T", "Materials"),
            ("2914.T", "Consumer Staples"),
            ("AAPL", "Technology"),
            ("MSFT", "Technology"),
            ("GOOGL", "Technology"),
            ("V", "Financials"),
        ]
        .into_iter()
        .map(|(t, s)| (t.to_string(), s.to_string()))
        .collect();

        Self {
            starting_capital: Decimal::from(15_000_000),
            risk_free_rate: Decimal::new(5, 2),
            fallback_fx_rate: Decimal::from(150),
            currencies: CurrencyPair::default(),
            benchmarks: vec![
                Benchmark::new("Nikkei 225", "^N225"),
                Benchmark::new("S&P 500", "^GSPC"),
            ],
            sectors,
            names: BTreeMap::new(),
            trades_path: PathBuf::from("data/trades.csv"),
            output_path: PathBuf::from("data/portfolio.json"),
        }
    }
}

impl Config {
    /// Load configuration.
    ///
    /// An explicit path must exist. Without one, `shadow.toml` in the working
    /// directory is used when present, otherwise the built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(p) => {
                if !p.exists() {
                    return Err(PortfolioError::ConfigError(format!(
                        "config file not found: {}",
                        p.display()
                    ))
                    .into());
                }
                Self::from_file(p)?
            }
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_PATH);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    debug!("No {} found, using default configuration", DEFAULT_CONFIG_PATH);
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        info!("Loading configuration from {:?}", path);
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(text).map_err(|e| PortfolioError::ConfigError(e.to_string()))?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.starting_capital <= Decimal::ZERO {
            return Err(PortfolioError::ConfigError(format!(
                "starting_capital must be positive, got {}",
                self.starting_capital
            ))
            .into());
        }
        if self.fallback_fx_rate <= Decimal::ZERO {
            return Err(PortfolioError::ConfigError(format!(
                "fallback_fx_rate must be positive, got {}",
                self.fallback_fx_rate
            ))
            .into());
        }
        if self.risk_free_rate < Decimal::ZERO {
            return Err(PortfolioError::ConfigError(format!(
                "risk_free_rate must not be negative, got {}",
                self.risk_free_rate
            ))
            .into());
        }
        if self
            .currencies
            .base
            .eq_ignore_ascii_case(&self.currencies.foreign)
        {
            return Err(PortfolioError::ConfigError(format!(
                "base and foreign currency are both {}",
                self.currencies.base
            ))
            .into());
        }
        Ok(())
    }

    /// Sector label for a ticker, `"Other"` when unclassified
    pub fn sector_for(&self, ticker: &str) -> &str {
        self.sectors
            .get(ticker)
            .map(String::as_str)
            .unwrap_or(DEFAULT_SECTOR)
    }

    /// Every symbol the price table must cover besides the ledger tickers
    pub fn reference_symbols(&self) -> Vec<String> {
        self.benchmarks
            .iter()
            .map(|b| b.ticker.clone())
            .chain(std::iter::once(self.currencies.fx_ticker.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.starting_capital, dec!(15000000));
        assert_eq!(config.benchmarks.len(), 2);
        assert_eq!(config.benchmarks[0].label, "Nikkei 225");
    }

    #[test]
    fn test_sector_lookup_defaults_to_other() {
        let config = Config::default();
        assert_eq!(config.sector_for("8306.T"), "Financials");
        assert_eq!(config.sector_for("NVDA"), "Other");
    }

    #[test]
    fn test_currency_resolution_is_case_insensitive() {
        let pair = CurrencyPair::default();
        assert_eq!(pair.resolve("jpy"), Some(Currency::Base));
        assert_eq!(pair.resolve(" USD "), Some(Currency::Foreign));
        assert_eq!(pair.resolve("EUR"), None);
        assert_eq!(pair.country(Currency::Foreign), "United States");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = Config::from_toml_str(
            r#"
            starting_capital = 1000
            risk_free_rate = 0

            [currencies]
            base = "EUR"
            foreign = "USD"
            fx_ticker = "EUR=X"

            [[benchmarks]]
            label = "DAX"
            ticker = "^GDAXI"

            [sectors]
            "SAP.DE" = "Technology"
            "#,
        )
        .unwrap();

        assert_eq!(config.starting_capital, dec!(1000));
        assert_eq!(config.risk_free_rate, Decimal::ZERO);
        assert_eq!(config.fallback_fx_rate, dec!(150));
        assert_eq!(config.currencies.base, "EUR");
        // unspecified fields of a nested table fall back too
        assert_eq!(config.currencies.home_country, "Japan");
        assert_eq!(config.benchmarks, vec![Benchmark::new("DAX", "^GDAXI")]);
        assert_eq!(config.sector_for("SAP.DE"), "Technology");
        assert_eq!(config.sector_for("AAPL"), "Other");
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = Config::default();
        config.starting_capital = Decimal::ZERO;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.fallback_fx_rate = dec!(-1);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.risk_free_rate = dec!(-0.01);
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.currencies.foreign = "jpy".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_explicit_missing_path_is_an_error() {
        let result = Config::load(Some(Path::new("/nonexistent/shadow.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn test_reference_symbols_include_fx_and_benchmarks() {
        let symbols = Config::default().reference_symbols();
        assert_eq!(symbols, vec!["^N225", "^GSPC", "JPY=X"]);
    }
}
