//! Foreign → base currency conversion with a fixed fallback rate

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::debug;

use crate::config::Currency;
use crate::prices::{PriceSeries, PriceTable};

/// As-of FX lookups against the table's FX series.
///
/// A missing or non-positive observation never fails a lookup; the configured
/// fallback rate is used instead.
#[derive(Debug, Clone, Copy)]
pub struct FxRates<'a> {
    series: Option<&'a PriceSeries>,
    fallback: Decimal,
}

impl<'a> FxRates<'a> {
    pub fn new(series: Option<&'a PriceSeries>, fallback: Decimal) -> Self {
        Self { series, fallback }
    }

    pub fn from_table(prices: &'a PriceTable, fx_ticker: &str, fallback: Decimal) -> Self {
        Self::new(prices.series(fx_ticker), fallback)
    }

    /// Units of base per unit of foreign in effect on `date`
    pub fn rate_on(&self, date: NaiveDate) -> Decimal {
        match self.series.and_then(|s| s.as_of(date)) {
            Some(rate) if rate > Decimal::ZERO => rate,
            _ => {
                debug!("No usable FX rate on {}, using fallback {}", date, self.fallback);
                self.fallback
            }
        }
    }

    /// Latest observed rate, or the fallback
    pub fn latest(&self) -> Decimal {
        match self.series.and_then(|s| s.latest()) {
            Some((_, rate)) if rate > Decimal::ZERO => rate,
            _ => self.fallback,
        }
    }

    /// Multiplier taking an amount in `currency` to base on `date`
    pub fn to_base(&self, currency: Currency, date: NaiveDate) -> Decimal {
        match currency {
            Currency::Base => Decimal::ONE,
            Currency::Foreign => self.rate_on(date),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_rate_falls_back_before_first_observation() {
        let series = PriceSeries::new(vec![(date(2024, 1, 10), dec!(145))]);
        let fx = FxRates::new(Some(&series), dec!(150));
        assert_eq!(fx.rate_on(date(2024, 1, 9)), dec!(150));
        assert_eq!(fx.rate_on(date(2024, 1, 10)), dec!(145));
        assert_eq!(fx.rate_on(date(2024, 2, 1)), dec!(145));
    }

    #[test]
    fn test_non_positive_rate_uses_fallback() {
        let series = PriceSeries::new(vec![(date(2024, 1, 10), Decimal::ZERO)]);
        let fx = FxRates::new(Some(&series), dec!(150));
        assert_eq!(fx.rate_on(date(2024, 1, 11)), dec!(150));
        assert_eq!(fx.latest(), dec!(150));
    }

    #[test]
    fn test_missing_series_always_uses_fallback() {
        let fx = FxRates::new(None, dec!(150));
        assert_eq!(fx.to_base(Currency::Foreign, date(2024, 1, 1)), dec!(150));
        assert_eq!(fx.to_base(Currency::Base, date(2024, 1, 1)), Decimal::ONE);
    }
}
