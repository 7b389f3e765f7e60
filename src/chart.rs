//! Comparison chart: weekly cumulative returns of the portfolio and benchmarks
//!
//! Weeks end on Sunday and are labelled with that Sunday. Each weekly value is
//! the last observation inside the week. Benchmarks are resampled the same way
//! and then read as-of the portfolio's weekly labels, so every curve shares the
//! portfolio's grid and starts at 0%.

use chrono::{Datelike, Days, NaiveDate};
use itertools::Itertools;
use rust_decimal::Decimal;

use crate::config::Benchmark;
use crate::metrics::percent_change;
use crate::nav::NavPoint;
use crate::prices::{PriceSeries, PriceTable};

#[derive(Debug, Clone, PartialEq)]
pub struct ChartSeries {
    pub dates: Vec<NaiveDate>,
    /// Cumulative percent return per weekly date
    pub portfolio: Vec<Decimal>,
    /// One curve per benchmark label, aligned with `dates`
    pub benchmarks: Vec<(String, Vec<Decimal>)>,
}

/// Current cumulative return of a benchmark since inception
#[derive(Debug, Clone, PartialEq)]
pub struct BenchmarkReturn {
    pub label: String,
    pub current: Decimal,
}

/// The Sunday closing the week that contains `date`
pub fn week_ending(date: NaiveDate) -> NaiveDate {
    let offset = 6 - date.weekday().num_days_from_monday();
    date + Days::new(u64::from(offset))
}

/// Last value of each calendar week that has at least one observation
pub fn weekly_last(
    points: impl IntoIterator<Item = (NaiveDate, Decimal)>,
) -> Vec<(NaiveDate, Decimal)> {
    points
        .into_iter()
        .chunk_by(|(d, _)| week_ending(*d))
        .into_iter()
        .filter_map(|(week, group)| group.last().map(|(_, v)| (week, v)))
        .collect()
}

/// Percent change of every value against the first one
pub fn cumulative_returns(values: &[Decimal]) -> Vec<Decimal> {
    match values.first() {
        Some(base) => values.iter().map(|v| percent_change(*base, *v)).collect(),
        None => Vec::new(),
    }
}

/// Resample `series` (from `start`) weekly and read it as-of each of `grid`.
///
/// Grid dates before the first weekly value stay empty.
fn align_weekly(series: &PriceSeries, start: NaiveDate, grid: &[NaiveDate]) -> Vec<Option<Decimal>> {
    let weekly = PriceSeries::new(weekly_last(series.since(start)));
    grid.iter().map(|d| weekly.as_of(*d)).collect()
}

pub fn build_chart(
    nav: &[NavPoint],
    prices: &PriceTable,
    benchmarks: &[Benchmark],
    inception: NaiveDate,
) -> ChartSeries {
    let nav_weekly = weekly_last(nav.iter().map(|p| (p.date, p.nav())));
    let dates: Vec<NaiveDate> = nav_weekly.iter().map(|(d, _)| *d).collect();
    let nav_values: Vec<Decimal> = nav_weekly.iter().map(|(_, v)| *v).collect();

    let mut curves = Vec::new();
    for benchmark in benchmarks {
        let Some(series) = prices.series(&benchmark.ticker) else {
            continue;
        };
        if series.since(inception).next().is_none() {
            continue;
        }

        let aligned = align_weekly(series, inception, &dates);
        // a missing anchor leaves nothing to normalize against
        let curve = match aligned.first().copied().flatten() {
            Some(base) => aligned
                .iter()
                .map(|v| v.map(|v| percent_change(base, v)).unwrap_or(Decimal::ZERO))
                .collect(),
            None => vec![Decimal::ZERO; dates.len()],
        };
        curves.push((benchmark.label.clone(), curve));
    }

    ChartSeries {
        portfolio: cumulative_returns(&nav_values),
        dates,
        benchmarks: curves,
    }
}

/// Cumulative return of each benchmark from its first value on or after
/// inception to its latest value. Benchmarks without data are omitted.
pub fn benchmark_returns(
    prices: &PriceTable,
    benchmarks: &[Benchmark],
    inception: NaiveDate,
) -> Vec<BenchmarkReturn> {
    benchmarks
        .iter()
        .filter_map(|b| {
            let series = prices.series(&b.ticker)?;
            let mut window = series.since(inception);
            let (_, first) = window.next()?;
            let last = window.last().map(|(_, v)| v).unwrap_or(first);
            Some(BenchmarkReturn {
                label: b.label.clone(),
                current: percent_change(first, last),
            })
        })
        .collect()
}
