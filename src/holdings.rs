//! Holdings: live positions valued at the latest prices, in base currency

use rust_decimal::Decimal;
use tracing::warn;

use crate::config::{Config, Currency};
use crate::positions::Position;
use crate::prices::PriceTable;

/// A priced position as it appears in the report
#[derive(Debug, Clone, PartialEq)]
pub struct Holding {
    pub ticker: String,
    pub company_name: String,
    pub sector: String,
    pub shares: u64,
    /// Native currency
    pub avg_cost: Decimal,
    /// Native currency
    pub current_price: Decimal,
    pub currency: Currency,
    pub cost_base: Decimal,
    pub value_base: Decimal,
    /// Price return in native currency, percent
    pub return_pct: Decimal,
    /// Share of total portfolio value, percent
    pub weight: Decimal,
}

/// `part / whole × 100`, zero when `whole` is not positive
pub fn weight_pct(part: Decimal, whole: Decimal) -> Decimal {
    if whole > Decimal::ZERO {
        part / whole * Decimal::ONE_HUNDRED
    } else {
        Decimal::ZERO
    }
}

/// Value every position at its latest price.
///
/// Foreign positions convert at `fx_rate` for both cost and value. Positions
/// with no price series are skipped with a warning. Result is sorted by
/// value, largest first.
pub fn calculate_holdings(
    positions: &[Position],
    prices: &PriceTable,
    config: &Config,
    fx_rate: Decimal,
    portfolio_value: Decimal,
) -> Vec<Holding> {
    let mut holdings = Vec::with_capacity(positions.len());

    for pos in positions {
        let Some(series) = prices.series(&pos.ticker) else {
            warn!("Skipping {}: not in price data", pos.ticker);
            continue;
        };
        let Some((_, current_price)) = series.latest() else {
            warn!("Skipping {}: no price data available", pos.ticker);
            continue;
        };

        let fx = match pos.currency {
            Currency::Base => Decimal::ONE,
            Currency::Foreign => fx_rate,
        };
        let shares = Decimal::from(pos.shares);
        let cost_base = pos.avg_cost * shares * fx;
        let value_base = current_price * shares * fx;

        let return_pct = if pos.avg_cost.is_zero() {
            Decimal::ZERO
        } else {
            (current_price - pos.avg_cost) / pos.avg_cost * Decimal::ONE_HUNDRED
        };

        let company_name = config
            .names
            .get(&pos.ticker)
            .map(String::as_str)
            .or_else(|| prices.name_of(&pos.ticker))
            .unwrap_or(&pos.ticker)
            .to_string();

        holdings.push(Holding {
            ticker: pos.ticker.clone(),
            company_name,
            sector: pos.sector.clone(),
            shares: pos.shares,
            avg_cost: pos.avg_cost,
            current_price,
            currency: pos.currency,
            cost_base,
            value_base,
            return_pct,
            weight: weight_pct(value_base, portfolio_value),
        });
    }

    holdings.sort_by(|a, b| b.value_base.cmp(&a.value_base));
    holdings
}
