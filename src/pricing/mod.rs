// Pricing module - builds the price table from Yahoo Finance

pub mod yahoo;

use anyhow::Result;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{info, warn};

use crate::error::PortfolioError;
use crate::prices::PriceTable;

/// Pause between symbols to stay under Yahoo's rate limit
const SYMBOL_DELAY_MS: u64 = 150;

/// Download daily closes for every symbol from `start` through `end`.
///
/// Symbols that fail after retries are logged and left out of the table;
/// the engine then treats them as unpriced. Fails only when nothing could
/// be fetched at all.
pub async fn fetch_price_table(
    symbols: &[String],
    start: NaiveDate,
    end: NaiveDate,
) -> Result<PriceTable> {
    let client = yahoo::build_client()?;
    let mut observations = HashMap::new();
    let mut names = HashMap::new();
    let mut failed = Vec::new();

    for (i, symbol) in symbols.iter().enumerate() {
        if i > 0 {
            tokio::time::sleep(Duration::from_millis(SYMBOL_DELAY_MS)).await;
        }

        match yahoo::fetch_history(&client, symbol, start, end).await {
            Ok(history) if history.closes.is_empty() => {
                warn!("{}: no prices between {} and {}", symbol, start, end);
                failed.push(symbol.clone());
            }
            Ok(history) => {
                if let Some(name) = history.name {
                    names.insert(history.symbol.clone(), name);
                }
                observations.insert(history.symbol, history.closes);
            }
            Err(e) => {
                warn!("{}: price fetch failed: {:#}", symbol, e);
                failed.push(symbol.clone());
            }
        }
    }

    if observations.is_empty() {
        return Err(PortfolioError::PricingError(format!(
            "could not fetch prices for any of {} symbols",
            symbols.len()
        ))
        .into());
    }

    info!(
        "Fetched prices for {}/{} symbols",
        observations.len(),
        symbols.len()
    );
    if !failed.is_empty() {
        warn!("Missing prices for: {}", failed.join(", "));
    }

    // bars stamped in exchange time can fall just before the requested window
    Ok(PriceTable::from_observations(observations)
        .clipped_from(start)
        .with_names(names))
}
