//! Price table: aligned daily closes for tickers, benchmarks and the FX pair
//!
//! Raw observations arrive per symbol on each symbol's own trading calendar.
//! The table puts them on one shared date axis (the union of all observation
//! dates) and fills gaps forward, then backward, so every symbol that has at
//! least one observation has a value on every axis date. Symbols with no
//! observations at all are left out of the table entirely.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, WriterBuilder};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::io::{Read, Write};
use std::path::Path;
use std::str::FromStr;
use tracing::{debug, info};

use crate::error::PortfolioError;

/// Daily close series for one symbol, keyed by date
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriceSeries {
    points: BTreeMap<NaiveDate, Decimal>,
}

impl PriceSeries {
    pub fn new(points: impl IntoIterator<Item = (NaiveDate, Decimal)>) -> Self {
        Self {
            points: points.into_iter().collect(),
        }
    }

    /// Most recent observation on or before `date`
    pub fn as_of(&self, date: NaiveDate) -> Option<Decimal> {
        self.points.range(..=date).next_back().map(|(_, v)| *v)
    }

    pub fn latest(&self) -> Option<(NaiveDate, Decimal)> {
        self.points.iter().next_back().map(|(d, v)| (*d, *v))
    }

    /// Observations dated on or after `start`, in date order
    pub fn since(&self, start: NaiveDate) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.points.range(start..).map(|(d, v)| (*d, *v))
    }

    pub fn iter(&self) -> impl Iterator<Item = (NaiveDate, Decimal)> + '_ {
        self.points.iter().map(|(d, v)| (*d, *v))
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Gap-filled prices for every symbol on a shared date axis
#[derive(Debug, Clone, Default)]
pub struct PriceTable {
    dates: Vec<NaiveDate>,
    series: HashMap<String, PriceSeries>,
    names: HashMap<String, String>,
}

impl PriceTable {
    /// Align raw per-symbol observations onto a shared, gap-filled axis
    pub fn from_observations(raw: HashMap<String, Vec<(NaiveDate, Decimal)>>) -> Self {
        let axis: BTreeSet<NaiveDate> = raw
            .values()
            .flat_map(|obs| obs.iter().map(|(d, _)| *d))
            .collect();
        let dates: Vec<NaiveDate> = axis.into_iter().collect();

        let mut series = HashMap::new();
        for (symbol, observations) in raw {
            if observations.is_empty() {
                debug!("No observations for {}, leaving it out of the price table", symbol);
                continue;
            }
            let known: BTreeMap<NaiveDate, Decimal> = observations.into_iter().collect();
            series.insert(symbol, fill_gaps(&dates, &known));
        }

        debug!(
            "Aligned {} symbols onto {} dates",
            series.len(),
            dates.len()
        );

        Self {
            dates,
            series,
            names: HashMap::new(),
        }
    }

    /// Drop every date before `start` from the axis and from each series
    pub fn clipped_from(mut self, start: NaiveDate) -> Self {
        self.dates.retain(|d| *d >= start);
        for series in self.series.values_mut() {
            series.points = series.points.split_off(&start);
        }
        self.series.retain(|_, s| !s.is_empty());
        self
    }

    /// Attach display names (e.g. company short names) to symbols
    pub fn with_names(mut self, names: HashMap<String, String>) -> Self {
        self.names.extend(names);
        self
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }

    pub fn series(&self, symbol: &str) -> Option<&PriceSeries> {
        self.series.get(symbol)
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.series.contains_key(symbol)
    }

    /// Last known close of `symbol` on or before `date`
    pub fn as_of(&self, symbol: &str, date: NaiveDate) -> Option<Decimal> {
        self.series.get(symbol).and_then(|s| s.as_of(date))
    }

    pub fn latest(&self, symbol: &str) -> Option<Decimal> {
        self.series.get(symbol).and_then(|s| s.latest()).map(|(_, v)| v)
    }

    pub fn name_of(&self, symbol: &str) -> Option<&str> {
        self.names.get(symbol).map(String::as_str)
    }

    pub fn symbols(&self) -> impl Iterator<Item = &str> {
        self.series.keys().map(String::as_str)
    }

    /// Load a wide CSV: a `date` column followed by one column per symbol.
    /// Blank cells are missing observations and get filled like any other gap.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        info!("Loading prices from {:?}", path);
        let file = std::fs::File::open(path)
            .with_context(|| format!("Failed to open price file {}", path.display()))?;
        Self::from_reader(file)
            .with_context(|| format!("Failed to load prices from {}", path.display()))
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut reader = ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let headers = reader.headers().context("Failed to read CSV headers")?.clone();

        let date_col = headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case("date"))
            .ok_or_else(|| {
                PortfolioError::ValidationError("price file has no date column".to_string())
            })?;

        let symbols: Vec<(usize, String)> = headers
            .iter()
            .enumerate()
            .filter(|(idx, _)| *idx != date_col)
            .map(|(idx, h)| (idx, h.to_string()))
            .collect();

        let mut raw: HashMap<String, Vec<(NaiveDate, Decimal)>> = symbols
            .iter()
            .map(|(_, s)| (s.clone(), Vec::new()))
            .collect();

        for (idx, result) in reader.records().enumerate() {
            let line = idx + 2;
            let record = result.with_context(|| format!("Failed to read CSV line {}", line))?;
            let date_str = record.get(date_col).unwrap_or_default();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|_| {
                PortfolioError::ParseError(format!(
                    "line {}: invalid date '{}', expected YYYY-MM-DD",
                    line, date_str
                ))
            })?;

            for (col, symbol) in &symbols {
                let cell = record.get(*col).unwrap_or_default();
                if cell.is_empty() {
                    continue;
                }
                let price = Decimal::from_str(cell).map_err(|_| {
                    PortfolioError::ParseError(format!(
                        "line {}: invalid price '{}' for {}",
                        line, cell, symbol
                    ))
                })?;
                if let Some(points) = raw.get_mut(symbol) {
                    points.push((date, price));
                }
            }
        }

        Ok(Self::from_observations(raw))
    }

    /// Write the aligned table in the same wide layout `from_csv` reads
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let file = std::fs::File::create(path)
            .with_context(|| format!("Failed to create price file {}", path.display()))?;
        self.write_to(file)?;
        info!("Wrote {} price rows to {:?}", self.dates.len(), path);
        Ok(())
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut symbols: Vec<&String> = self.series.keys().collect();
        symbols.sort();

        let mut writer = WriterBuilder::new().from_writer(writer);
        let mut header = vec!["date".to_string()];
        header.extend(symbols.iter().map(|s| s.to_string()));
        writer.write_record(&header)?;

        for date in &self.dates {
            let mut row = vec![date.format("%Y-%m-%d").to_string()];
            for symbol in &symbols {
                let cell = self
                    .series
                    .get(*symbol)
                    .and_then(|s| s.as_of(*date))
                    .map(|p| p.normalize().to_string())
                    .unwrap_or_default();
                row.push(cell);
            }
            writer.write_record(&row)?;
        }
        writer.flush()?;
        Ok(())
    }
}

/// Forward-fill then back-fill `known` over `axis`
fn fill_gaps(axis: &[NaiveDate], known: &BTreeMap<NaiveDate, Decimal>) -> PriceSeries {
    let mut filled: Vec<(NaiveDate, Option<Decimal>)> = Vec::with_capacity(axis.len());
    let mut last = None;
    for date in axis {
        if let Some(v) = known.get(date) {
            last = Some(*v);
        }
        filled.push((*date, last));
    }

    let mut next = None;
    for (_, value) in filled.iter_mut().rev() {
        match value {
            Some(v) => next = Some(*v),
            None => *value = next,
        }
    }

    PriceSeries::new(filled.into_iter().filter_map(|(d, v)| v.map(|v| (d, v))))
}
