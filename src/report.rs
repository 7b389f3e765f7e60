//! Report assembly: run every builder and shape the output snapshot
//!
//! [`generate_report`] is the single entry point of the engine. It takes the
//! ledger, an aligned price table and the configuration, and returns the full
//! set of unrounded results. [`PortfolioSnapshot`] is the rounded, serializable
//! view of a report that the website consumes.

use anyhow::{Context, Result};
use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

use crate::allocation::{calculate_allocations, AllocationEntry, Allocations};
use crate::chart::{benchmark_returns, build_chart, BenchmarkReturn, ChartSeries};
use crate::config::{Config, Currency};
use crate::error::PortfolioError;
use crate::fx::FxRates;
use crate::holdings::{calculate_holdings, weight_pct, Holding};
use crate::ledger::Ledger;
use crate::metrics::{calculate_metrics, PerformanceMetrics};
use crate::nav::{NavEngine, NavPoint};
use crate::positions::build_positions;
use crate::prices::PriceTable;
use crate::utils::format_money;

/// Everything computed for one run, unrounded
#[derive(Debug, Clone)]
pub struct PortfolioReport {
    pub generated_at: NaiveDateTime,
    pub inception: NaiveDate,
    pub starting_capital: Decimal,
    pub fx_rate: Decimal,
    pub nav: Vec<NavPoint>,
    pub metrics: PerformanceMetrics,
    pub holdings: Vec<Holding>,
    pub cash: Decimal,
    pub cash_pct: Decimal,
    pub benchmarks: Vec<BenchmarkReturn>,
    pub allocations: Allocations,
    pub chart: ChartSeries,
}

impl PortfolioReport {
    pub fn portfolio_value(&self) -> Decimal {
        self.metrics.current_nav
    }

    pub fn count_in(&self, currency: Currency) -> usize {
        self.holdings.iter().filter(|h| h.currency == currency).count()
    }
}

/// Run the whole engine for one snapshot.
///
/// `now` stamps the report and decides the YTD year. Fails when the price
/// table has no dates on or after the ledger's inception.
pub fn generate_report(
    ledger: &Ledger,
    prices: &PriceTable,
    config: &Config,
    now: NaiveDateTime,
) -> Result<PortfolioReport> {
    let inception = ledger.inception();
    info!(
        "Found {} trades across {} tickers, inception {}",
        ledger.len(),
        ledger.tickers().len(),
        inception
    );

    for ticker in ledger.oversold_tickers() {
        warn!("{}: sells exceed buys at some point in the ledger", ticker);
    }

    for symbol in config.reference_symbols() {
        if !prices.contains(&symbol) {
            warn!("{}: not in price data", symbol);
        }
    }

    let fx = FxRates::from_table(prices, &config.currencies.fx_ticker, config.fallback_fx_rate);
    let fx_rate = fx.latest();
    info!(
        "{}/{}: {}",
        config.currencies.foreign, config.currencies.base, fx_rate
    );

    let positions = build_positions(ledger, config);
    info!("Active positions: {}", positions.len());

    let nav = NavEngine::new(ledger, prices, config).reconstruct();
    if nav.is_empty() {
        return Err(PortfolioError::PricingError(format!(
            "no price data on or after inception {}",
            inception
        ))
        .into());
    }

    let metrics = calculate_metrics(&nav, config.risk_free_rate, now.date())?;
    let total_value = metrics.current_nav;

    let holdings = calculate_holdings(&positions, prices, config, fx_rate, total_value);
    let invested: Decimal = holdings.iter().map(|h| h.value_base).sum();
    let cash = total_value - invested;
    let cash_pct = weight_pct(cash, total_value);

    let allocations = calculate_allocations(&holdings, total_value, &config.currencies);
    let benchmarks = benchmark_returns(prices, &config.benchmarks, inception);
    let chart = build_chart(&nav, prices, &config.benchmarks, inception);

    Ok(PortfolioReport {
        generated_at: now,
        inception,
        starting_capital: config.starting_capital,
        fx_rate,
        nav,
        metrics,
        holdings,
        cash,
        cash_pct,
        benchmarks,
        allocations,
        chart,
    })
}

/// Rounded, serializable report consumed by the website
#[derive(Debug, Clone, Serialize)]
pub struct PortfolioSnapshot {
    pub last_updated: String,
    pub inception_date: String,
    pub starting_capital: Decimal,
    pub fx_rate: Decimal,
    pub summary: SummarySnapshot,
    pub benchmarks: LabelledMap<BenchmarkSnapshot>,
    pub holdings: Vec<HoldingSnapshot>,
    pub allocations: AllocationsSnapshot,
    pub chart: ChartSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SummarySnapshot {
    pub portfolio_value: Decimal,
    pub total_return: Decimal,
    pub ytd_return: Decimal,
    pub sharpe_ratio: Decimal,
    pub max_drawdown: Decimal,
    pub max_drawdown_date: String,
    pub positions_count: usize,
    pub home_count: usize,
    pub foreign_count: usize,
    pub cash: Decimal,
    pub cash_pct: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct BenchmarkSnapshot {
    pub current: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct HoldingSnapshot {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub shares: u64,
    pub avg_cost: Decimal,
    pub current_price: Decimal,
    pub display_cost: String,
    pub display_current: String,
    pub currency: String,
    pub cost_base: Decimal,
    pub value_base: Decimal,
    pub return_pct: Decimal,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub struct AllocationsSnapshot {
    pub geography: LabelledMap<Decimal>,
    pub sector: LabelledMap<Decimal>,
}

/// Ordered label → value pairs, serialized as a JSON object in this order
#[derive(Debug, Clone, PartialEq)]
pub struct LabelledMap<T>(pub Vec<(String, T)>);

impl<T> LabelledMap<T> {
    pub fn get(&self, label: &str) -> Option<&T> {
        self.0.iter().find(|(l, _)| l == label).map(|(_, v)| v)
    }
}

impl<T: Serialize> Serialize for LabelledMap<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.iter().map(|(k, v)| (k, v)))
    }
}

/// `dates` and `portfolio` first, then one array per benchmark label
#[derive(Debug, Clone)]
pub struct ChartSnapshot {
    pub dates: Vec<String>,
    pub portfolio: Vec<Decimal>,
    pub benchmarks: Vec<(String, Vec<Decimal>)>,
}

impl Serialize for ChartSnapshot {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(2 + self.benchmarks.len()))?;
        map.serialize_entry("dates", &self.dates)?;
        map.serialize_entry("portfolio", &self.portfolio)?;
        for (label, curve) in &self.benchmarks {
            map.serialize_entry(label, curve)?;
        }
        map.end()
    }
}

fn rounded(values: &[Decimal], dp: u32) -> Vec<Decimal> {
    values.iter().map(|v| v.round_dp(dp)).collect()
}

fn allocation_map(entries: &[AllocationEntry]) -> LabelledMap<Decimal> {
    LabelledMap(
        entries
            .iter()
            .map(|e| (e.label.clone(), e.weight.round_dp(1)))
            .collect(),
    )
}

impl PortfolioSnapshot {
    pub fn from_report(report: &PortfolioReport, config: &Config) -> Self {
        let metrics = &report.metrics;
        let currencies = &config.currencies;

        let holdings = report
            .holdings
            .iter()
            .map(|h| {
                let code = currencies.code(h.currency);
                let dp = match h.currency {
                    Currency::Base => 0,
                    Currency::Foreign => 2,
                };
                HoldingSnapshot {
                    ticker: h.ticker.clone(),
                    company_name: h.company_name.clone(),
                    sector: h.sector.clone(),
                    shares: h.shares,
                    avg_cost: h.avg_cost.round_dp(2),
                    current_price: h.current_price.round_dp(2),
                    display_cost: format_money(h.avg_cost, code, dp),
                    display_current: format_money(h.current_price, code, dp),
                    currency: code.to_string(),
                    cost_base: h.cost_base.round_dp(0),
                    value_base: h.value_base.round_dp(0),
                    return_pct: h.return_pct.round_dp(2),
                    weight: h.weight.round_dp(1),
                }
            })
            .collect();

        Self {
            last_updated: report.generated_at.format("%Y-%m-%d %H:%M").to_string(),
            inception_date: report.inception.format("%Y-%m-%d").to_string(),
            starting_capital: report.starting_capital,
            fx_rate: report.fx_rate.round_dp(2),
            summary: SummarySnapshot {
                portfolio_value: report.portfolio_value().round_dp(0),
                total_return: metrics.total_return.round_dp(2),
                ytd_return: metrics.ytd_return.round_dp(2),
                sharpe_ratio: metrics.sharpe_ratio.round_dp(2),
                max_drawdown: metrics.max_drawdown.round_dp(2),
                max_drawdown_date: metrics.max_drawdown_date.format("%b %Y").to_string(),
                positions_count: report.holdings.len(),
                home_count: report.count_in(Currency::Base),
                foreign_count: report.count_in(Currency::Foreign),
                cash: report.cash.round_dp(0),
                cash_pct: report.cash_pct.round_dp(1),
            },
            benchmarks: LabelledMap(
                report
                    .benchmarks
                    .iter()
                    .map(|b| {
                        (
                            b.label.clone(),
                            BenchmarkSnapshot {
                                current: b.current.round_dp(2),
                            },
                        )
                    })
                    .collect(),
            ),
            holdings,
            allocations: AllocationsSnapshot {
                geography: allocation_map(&report.allocations.geography),
                sector: allocation_map(&report.allocations.sector),
            },
            chart: ChartSnapshot {
                dates: report
                    .chart
                    .dates
                    .iter()
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .collect(),
                portfolio: rounded(&report.chart.portfolio, 2),
                benchmarks: report
                    .chart
                    .benchmarks
                    .iter()
                    .map(|(label, curve)| (label.clone(), rounded(curve, 2)))
                    .collect(),
            },
        }
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize portfolio snapshot")
    }

    /// Write pretty-printed JSON, creating parent directories as needed
    pub fn write_json<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Portfolio JSON written to {:?}", path);
        Ok(())
    }
}
