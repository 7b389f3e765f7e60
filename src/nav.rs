//! NAV reconstruction: replay the ledger against the price table day by day
//!
//! For each date on the price table's axis from inception onwards, the engine
//! replays every trade dated on or before that day from a fresh state
//! (starting capital in cash, no shares) and values what is held at that
//! day's as-of prices. Each date is computed independently, so the value for
//! a date depends only on the ledger prefix and the prices, never on the
//! order dates were evaluated in.
//!
//! Cash effects of foreign trades convert at the FX rate as of the trade's own
//! date; holdings convert at the rate as of the valuation date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info};

use crate::config::{Config, Currency};
use crate::fx::FxRates;
use crate::ledger::{Action, Ledger, Trade};
use crate::prices::PriceTable;

/// Portfolio valuation on one date, all amounts in base currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NavPoint {
    pub date: NaiveDate,
    pub cash: Decimal,
    pub holdings_value: Decimal,
}

impl NavPoint {
    pub fn nav(&self) -> Decimal {
        self.cash + self.holdings_value
    }
}

/// Cash and share counts after replaying a ledger prefix
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayState {
    pub cash: Decimal,
    /// Net shares per ticker. A ticker never traded is not present and
    /// reads as zero through [`ReplayState::shares_of`].
    pub shares_held: BTreeMap<String, i64>,
}

impl ReplayState {
    pub fn new(starting_capital: Decimal) -> Self {
        Self {
            cash: starting_capital,
            shares_held: BTreeMap::new(),
        }
    }

    pub fn shares_of(&self, ticker: &str) -> i64 {
        self.shares_held.get(ticker).copied().unwrap_or(0)
    }

    /// Apply one trade's share and cash effects.
    ///
    /// Foreign notional converts at the FX rate in effect on the trade date.
    pub fn apply(&mut self, trade: &Trade, fx: &FxRates<'_>) {
        let amount = trade.notional() * fx.to_base(trade.currency, trade.date);
        match trade.action {
            Action::Buy => self.cash -= amount,
            Action::Sell => self.cash += amount,
        }
        let held = self.shares_held.entry(trade.ticker.clone()).or_insert(0);
        *held = held.saturating_add(trade.signed_shares());
    }
}

/// Replays a ledger against a price table under one configuration
pub struct NavEngine<'a> {
    ledger: &'a Ledger,
    prices: &'a PriceTable,
    fx: FxRates<'a>,
    starting_capital: Decimal,
    /// Valuation currency per ticker (from its first trade)
    currencies: HashMap<String, Currency>,
}

impl<'a> NavEngine<'a> {
    pub fn new(ledger: &'a Ledger, prices: &'a PriceTable, config: &Config) -> Self {
        let currencies = ledger
            .tickers()
            .into_iter()
            .filter_map(|t| ledger.currency_of(&t).map(|c| (t, c)))
            .collect();

        Self {
            ledger,
            prices,
            fx: FxRates::from_table(prices, &config.currencies.fx_ticker, config.fallback_fx_rate),
            starting_capital: config.starting_capital,
            currencies,
        }
    }

    /// Cash and shares after every trade dated on or before `date`
    pub fn replay_through(&self, date: NaiveDate) -> ReplayState {
        let mut state = ReplayState::new(self.starting_capital);
        for trade in self.ledger.trades_through(date) {
            state.apply(trade, &self.fx);
        }
        state
    }

    /// Valuation on a single date
    pub fn value_on(&self, date: NaiveDate) -> NavPoint {
        let state = self.replay_through(date);

        let mut holdings_value = Decimal::ZERO;
        for (ticker, &shares) in &state.shares_held {
            // flat and short positions are not valued
            if shares <= 0 {
                continue;
            }
            let Some(price) = self.prices.as_of(ticker, date) else {
                continue;
            };
            let currency = self
                .currencies
                .get(ticker)
                .copied()
                .unwrap_or(Currency::Base);
            holdings_value += price * Decimal::from(shares) * self.fx.to_base(currency, date);
        }

        NavPoint {
            date,
            cash: state.cash,
            holdings_value,
        }
    }

    /// Valuation dates: the price axis from inception onwards
    pub fn valuation_dates(&self) -> Vec<NaiveDate> {
        let inception = self.ledger.inception();
        self.prices
            .dates()
            .iter()
            .copied()
            .filter(|d| *d >= inception)
            .collect()
    }

    /// Daily NAV series from inception to the last price date
    pub fn reconstruct(&self) -> Vec<NavPoint> {
        let dates = self.valuation_dates();
        info!(
            "Reconstructing NAV over {} dates from {}",
            dates.len(),
            self.ledger.inception()
        );
        let series: Vec<NavPoint> = dates.into_iter().map(|d| self.value_on(d)).collect();
        if let Some(last) = series.last() {
            debug!(
                "Final NAV on {}: cash {} + holdings {}",
                last.date, last.cash, last.holdings_value
            );
        }
        series
    }
}

/// Convenience wrapper around [`NavEngine::reconstruct`]
pub fn reconstruct_nav(ledger: &Ledger, prices: &PriceTable, config: &Config) -> Vec<NavPoint> {
    NavEngine::new(ledger, prices, config).reconstruct()
}
