//! Trade ledger: the validated, date-ordered list of buy/sell events
//!
//! The ledger is loaded once per run from a CSV file with the columns
//! `date,ticker,action,shares,price,currency` and is immutable afterwards.
//! Any malformed row fails the whole load; nothing is repaired.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::ReaderBuilder;
use itertools::Itertools;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::io::Read;
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::config::{Currency, CurrencyPair};
use crate::error::PortfolioError;

pub const REQUIRED_COLUMNS: [&str; 6] = ["date", "ticker", "action", "shares", "price", "currency"];

/// Trade direction
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub enum Action {
    Buy,
    Sell,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Buy => "BUY",
            Action::Sell => "SELL",
        }
    }
}

impl FromStr for Action {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "BUY" => Ok(Action::Buy),
            "SELL" => Ok(Action::Sell),
            _ => Err(()),
        }
    }
}

/// A single recorded trade, price in the trade's own currency
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trade {
    pub date: NaiveDate,
    pub ticker: String,
    pub action: Action,
    pub shares: u64,
    pub price: Decimal,
    pub currency: Currency,
}

impl Trade {
    /// Gross amount in the trade currency (shares × price)
    pub fn notional(&self) -> Decimal {
        Decimal::from(self.shares) * self.price
    }

    /// Share delta this trade applies to the running position
    pub fn signed_shares(&self) -> i64 {
        let shares = i64::try_from(self.shares).unwrap_or(i64::MAX);
        match self.action {
            Action::Buy => shares,
            Action::Sell => -shares,
        }
    }
}

/// Date-ordered trade history
#[derive(Debug, Clone)]
pub struct Ledger {
    trades: Vec<Trade>,
}

impl Ledger {
    /// Build a ledger from trades in any order.
    ///
    /// Trades are stable-sorted by date so same-day trades keep their
    /// recorded order. An empty ledger is rejected: it has no inception date.
    pub fn new(mut trades: Vec<Trade>) -> Result<Self> {
        if trades.is_empty() {
            return Err(PortfolioError::ValidationError(
                "trade ledger is empty".to_string(),
            )
            .into());
        }
        trades.sort_by_key(|t| t.date);
        Ok(Self { trades })
    }

    pub fn from_csv<P: AsRef<Path>>(path: P, currencies: &CurrencyPair) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading trades from {:?}", path);
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open trades file {}", path.display()))?;
        Self::from_reader(file, currencies)
            .with_context(|| format!("Failed to load trades from {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R, currencies: &CurrencyPair) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = reader
            .headers()
            .context("Failed to read CSV headers")?
            .clone();
        debug!("Trade CSV headers: {:?}", headers);

        let columns = ColumnMapping::from_headers(&headers)?;

        let mut trades = Vec::new();
        for (idx, result) in reader.records().enumerate() {
            // header is line 1
            let line = idx + 2;
            let record = result.with_context(|| format!("Failed to read CSV line {}", line))?;
            let trade = columns
                .parse_row(&record, currencies)
                .with_context(|| format!("Invalid trade on line {}", line))?;
            trades.push(trade);
        }

        let ledger = Self::new(trades)?;
        info!(
            "Loaded {} trades across {} tickers",
            ledger.len(),
            ledger.tickers().len()
        );
        Ok(ledger)
    }

    pub fn trades(&self) -> &[Trade] {
        &self.trades
    }

    pub fn len(&self) -> usize {
        self.trades.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trades.is_empty()
    }

    /// Date of the earliest trade
    pub fn inception(&self) -> NaiveDate {
        // non-empty by construction
        self.trades[0].date
    }

    /// Every trade dated on or before `date`, in ledger order
    pub fn trades_through(&self, date: NaiveDate) -> &[Trade] {
        let end = self.trades.partition_point(|t| t.date <= date);
        &self.trades[..end]
    }

    /// Distinct tickers in first-appearance order
    pub fn tickers(&self) -> Vec<String> {
        self.trades
            .iter()
            .map(|t| t.ticker.clone())
            .unique()
            .collect()
    }

    /// Currency of a ticker, taken from its first trade
    pub fn currency_of(&self, ticker: &str) -> Option<Currency> {
        self.trades
            .iter()
            .find(|t| t.ticker == ticker)
            .map(|t| t.currency)
    }

    /// Tickers whose cumulative sells exceed cumulative buys at some point.
    ///
    /// This is a data-quality condition; callers only report it.
    pub fn oversold_tickers(&self) -> Vec<String> {
        let mut held: HashMap<&str, i64> = HashMap::new();
        let mut oversold = BTreeSet::new();
        for trade in &self.trades {
            let running = held.entry(trade.ticker.as_str()).or_insert(0);
            *running = running.saturating_add(trade.signed_shares());
            if *running < 0 {
                oversold.insert(trade.ticker.clone());
            }
        }
        oversold.into_iter().collect()
    }
}

#[derive(Debug)]
struct ColumnMapping {
    date: usize,
    ticker: usize,
    action: usize,
    shares: usize,
    price: usize,
    currency: usize,
}

impl ColumnMapping {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self> {
        let index: HashMap<String, usize> = headers
            .iter()
            .enumerate()
            .map(|(idx, h)| (h.trim().to_lowercase(), idx))
            .collect();

        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|c| !index.contains_key(*c))
            .sorted()
            .collect();
        if !missing.is_empty() {
            return Err(PortfolioError::ValidationError(format!(
                "trades file is missing columns: {}",
                missing.join(", ")
            ))
            .into());
        }

        Ok(Self {
            date: index["date"],
            ticker: index["ticker"],
            action: index["action"],
            shares: index["shares"],
            price: index["price"],
            currency: index["currency"],
        })
    }

    fn parse_row(&self, record: &csv::StringRecord, currencies: &CurrencyPair) -> Result<Trade> {
        let date_str = field(record, self.date, "date")?;
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
            PortfolioError::ParseError(format!(
                "invalid date '{}', expected YYYY-MM-DD",
                date_str
            ))
        })?;

        let ticker = field(record, self.ticker, "ticker")?.to_string();

        let action_str = field(record, self.action, "action")?;
        let action = Action::from_str(action_str).map_err(|_| {
            PortfolioError::ValidationError(format!(
                "unknown action '{}', expected BUY or SELL",
                action_str
            ))
        })?;

        let shares = parse_shares(field(record, self.shares, "shares")?)?;

        let price_str = field(record, self.price, "price")?;
        let price = Decimal::from_str(price_str)
            .map_err(|_| PortfolioError::ParseError(format!("invalid price '{}'", price_str)))?;
        if price <= Decimal::ZERO {
            return Err(
                PortfolioError::ValidationError(format!("price must be positive, got {}", price))
                    .into(),
            );
        }

        let currency_str = field(record, self.currency, "currency")?;
        let currency = currencies.resolve(currency_str).ok_or_else(|| {
            PortfolioError::ValidationError(format!(
                "currency '{}' is neither {} nor {}",
                currency_str, currencies.base, currencies.foreign
            ))
        })?;

        Ok(Trade {
            date,
            ticker,
            action,
            shares,
            price,
            currency,
        })
    }
}

fn field<'a>(record: &'a csv::StringRecord, idx: usize, name: &str) -> Result<&'a str> {
    match record.get(idx) {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(PortfolioError::ValidationError(format!("empty {} field", name)).into()),
    }
}

/// Share counts are whole numbers; "10" and "10.0" are both accepted
fn parse_shares(raw: &str) -> Result<u64> {
    let value = Decimal::from_str(raw)
        .map_err(|_| PortfolioError::ParseError(format!("invalid share count '{}'", raw)))?;
    if value <= Decimal::ZERO || !value.fract().is_zero() {
        return Err(PortfolioError::ValidationError(format!(
            "shares must be a positive integer, got {}",
            raw
        ))
        .into());
    }
    // share deltas are signed during replay, so counts must fit in i64
    value
        .to_i64()
        .and_then(|v| u64::try_from(v).ok())
        .ok_or_else(|| {
            PortfolioError::ValidationError(format!("share count out of range: {}", raw)).into()
        })
}
