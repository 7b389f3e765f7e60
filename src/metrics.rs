//! Return and risk statistics derived from the NAV series

use anyhow::{anyhow, Result};
use chrono::{Datelike, NaiveDate};
use itertools::Itertools;
use rust_decimal::{Decimal, MathematicalOps};
use serde::Serialize;

use crate::error::PortfolioError;
use crate::nav::NavPoint;

/// Trading days per year used to de-annualize the risk-free rate and
/// annualize the Sharpe ratio
pub const TRADING_DAYS_PER_YEAR: u32 = 252;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceMetrics {
    /// Percent
    pub total_return: Decimal,
    /// Percent, since the first valuation in `today`'s calendar year
    pub ytd_return: Decimal,
    pub sharpe_ratio: Decimal,
    /// Percent, zero or negative
    pub max_drawdown: Decimal,
    pub max_drawdown_date: NaiveDate,
    pub current_nav: Decimal,
}

/// Compute every metric for a non-empty NAV series.
///
/// `today` decides which calendar year YTD refers to.
pub fn calculate_metrics(
    nav: &[NavPoint],
    risk_free_rate: Decimal,
    today: NaiveDate,
) -> Result<PerformanceMetrics> {
    let (first, last) = match (nav.first(), nav.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => {
            return Err(PortfolioError::ValidationError(
                "cannot compute metrics for an empty NAV series".to_string(),
            )
            .into())
        }
    };

    let total_return = percent_change(first.nav(), last.nav());
    let ytd_return = ytd_return(nav, today).unwrap_or(total_return);
    let sharpe_ratio = sharpe_ratio(&daily_returns(nav), risk_free_rate)?;
    let (max_drawdown, max_drawdown_date) = max_drawdown(nav);

    Ok(PerformanceMetrics {
        total_return,
        ytd_return,
        sharpe_ratio,
        max_drawdown,
        max_drawdown_date,
        current_nav: last.nav(),
    })
}

/// `(to / from − 1) × 100`, zero when `from` is zero
pub fn percent_change(from: Decimal, to: Decimal) -> Decimal {
    if from.is_zero() {
        return Decimal::ZERO;
    }
    (to / from - Decimal::ONE) * Decimal::ONE_HUNDRED
}

/// Return since the first valuation in `today`'s year, `None` if there is none
fn ytd_return(nav: &[NavPoint], today: NaiveDate) -> Option<Decimal> {
    let year_start = NaiveDate::from_ymd_opt(today.year(), 1, 1)?;
    let start = nav.iter().find(|p| p.date >= year_start)?;
    let last = nav.last()?;
    Some(percent_change(start.nav(), last.nav()))
}

/// Day-over-day fractional changes. A change from a zero NAV is undefined
/// and dropped.
pub fn daily_returns(nav: &[NavPoint]) -> Vec<Decimal> {
    nav.windows(2)
        .filter_map(|w| {
            let prev = w[0].nav();
            if prev.is_zero() {
                None
            } else {
                Some(w[1].nav() / prev - Decimal::ONE)
            }
        })
        .collect()
}

/// Annualized Sharpe ratio of daily returns over a daily risk-free rate.
///
/// Zero with fewer than two returns or when the excess returns do not vary.
pub fn sharpe_ratio(returns: &[Decimal], risk_free_rate: Decimal) -> Result<Decimal> {
    if returns.len() < 2 {
        return Ok(Decimal::ZERO);
    }

    let days = Decimal::from(TRADING_DAYS_PER_YEAR);
    let daily_rf = risk_free_rate / days;
    let excess: Vec<Decimal> = returns.iter().map(|r| *r - daily_rf).collect();

    if excess.iter().all_equal() {
        return Ok(Decimal::ZERO);
    }

    let n = Decimal::from(excess.len());
    let mean = excess.iter().sum::<Decimal>() / n;
    // sample variance, n - 1 degrees of freedom
    let variance = excess
        .iter()
        .map(|x| (*x - mean) * (*x - mean))
        .sum::<Decimal>()
        / (n - Decimal::ONE);

    if variance <= Decimal::ZERO {
        return Ok(Decimal::ZERO);
    }

    let std_dev = variance
        .sqrt()
        .ok_or_else(|| anyhow!("failed to take square root of variance {}", variance))?;
    if std_dev.is_zero() {
        return Ok(Decimal::ZERO);
    }

    let annualizer = days
        .sqrt()
        .ok_or_else(|| anyhow!("failed to take square root of {}", days))?;

    Ok(mean / std_dev * annualizer)
}

/// Deepest peak-to-trough decline in percent and the date it was reached.
///
/// The first occurrence wins on ties; a series that never declines reports
/// zero on its first date.
pub fn max_drawdown(nav: &[NavPoint]) -> (Decimal, NaiveDate) {
    let Some(first) = nav.first() else {
        return (Decimal::ZERO, NaiveDate::MIN);
    };

    let mut peak = first.nav();
    let mut worst = (Decimal::ZERO, first.date);

    for point in nav {
        let value = point.nav();
        if value > peak {
            peak = value;
        }
        let drawdown = if peak > Decimal::ZERO {
            (value - peak) / peak
        } else {
            Decimal::ZERO
        };
        if drawdown < worst.0 {
            worst = (drawdown, point.date);
        }
    }

    (worst.0 * Decimal::ONE_HUNDRED, worst.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Cash-only series over consecutive days starting at `start`
    fn series(start: NaiveDate, values: &[Decimal]) -> Vec<NavPoint> {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| NavPoint {
                date: start + chrono::Days::new(i as u64),
                cash: *v,
                holdings_value: Decimal::ZERO,
            })
            .collect()
    }

    #[test]
    fn test_flat_series_has_zero_everything() {
        let nav = series(date(2024, 3, 1), &[dec!(1000); 30]);
        let m = calculate_metrics(&nav, dec!(0.05), date(2024, 6, 1)).unwrap();
        assert_eq!(m.total_return, Decimal::ZERO);
        assert_eq!(m.ytd_return, Decimal::ZERO);
        assert_eq!(m.sharpe_ratio, Decimal::ZERO);
        assert_eq!(m.max_drawdown, Decimal::ZERO);
        assert_eq!(m.max_drawdown_date, date(2024, 3, 1));
        assert_eq!(m.current_nav, dec!(1000));
    }

    #[test]
    fn test_empty_series_is_an_error() {
        assert!(calculate_metrics(&[], dec!(0.05), date(2024, 1, 1)).is_err());
    }

    #[test]
    fn test_total_return() {
        let nav = series(date(2024, 1, 1), &[dec!(1000), dec!(1100), dec!(1250)]);
        let m = calculate_metrics(&nav, Decimal::ZERO, date(2024, 1, 3)).unwrap();
        assert_eq!(m.total_return, dec!(25));
    }

    #[test]
    fn test_ytd_starts_at_first_point_of_current_year() {
        let nav = series(
            date(2023, 12, 30),
            &[dec!(1000), dec!(1000), dec!(1200), dec!(1320)],
        );
        // 2024-01-01 is the third point
        let m = calculate_metrics(&nav, Decimal::ZERO, date(2024, 5, 1)).unwrap();
        assert_eq!(m.total_return, dec!(32));
        assert_eq!(m.ytd_return, dec!(10));
    }

    #[test]
    fn test_ytd_falls_back_to_total_when_year_has_no_points() {
        let nav = series(date(2023, 6, 1), &[dec!(1000), dec!(1100)]);
        let m = calculate_metrics(&nav, Decimal::ZERO, date(2025, 2, 1)).unwrap();
        assert_eq!(m.ytd_return, m.total_return);
    }

    #[test]
    fn test_sharpe_needs_two_returns() {
        assert_eq!(sharpe_ratio(&[dec!(0.01)], dec!(0.05)).unwrap(), Decimal::ZERO);
        assert_eq!(sharpe_ratio(&[], dec!(0.05)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_constant_returns_is_zero() {
        let returns = vec![dec!(0.01); 20];
        assert_eq!(sharpe_ratio(&returns, dec!(0.05)).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_sharpe_matches_hand_computation() {
        // excess with rf = 0: mean 0.01, sample std 0.01 → 1 × sqrt(252)
        let returns = vec![dec!(0.02), dec!(0.00), dec!(0.02), dec!(0.00)];
        let sharpe = sharpe_ratio(&returns, Decimal::ZERO).unwrap();
        // sample std of [0.02,0,0.02,0] = sqrt(0.0004/3)
        let expected = dec!(0.01) / (dec!(0.0004) / dec!(3)).sqrt().unwrap()
            * dec!(252).sqrt().unwrap();
        assert!((sharpe - expected).abs() < dec!(0.0000001), "{} vs {}", sharpe, expected);
        assert!(sharpe > dec!(13) && sharpe < dec!(14));
    }

    #[test]
    fn test_sharpe_risk_free_lowers_ratio() {
        let returns = vec![dec!(0.01), dec!(-0.005), dec!(0.007), dec!(0.002)];
        let without = sharpe_ratio(&returns, Decimal::ZERO).unwrap();
        let with = sharpe_ratio(&returns, dec!(0.05)).unwrap();
        assert!(with < without);
    }

    #[test]
    fn test_max_drawdown_and_date() {
        let nav = series(
            date(2024, 1, 30),
            &[dec!(100), dec!(120), dec!(90), dec!(60), dec!(130), dec!(117)],
        );
        let (dd, when) = max_drawdown(&nav);
        // 60 vs peak 120
        assert_eq!(dd, dec!(-50));
        assert_eq!(when, date(2024, 2, 2));
    }

    #[test]
    fn test_drawdown_is_bounded() {
        let nav = series(
            date(2024, 1, 1),
            &[dec!(100), dec!(150), dec!(0), dec!(10), dec!(200)],
        );
        let (dd, _) = max_drawdown(&nav);
        assert!(dd >= dec!(-100) && dd <= Decimal::ZERO);
        assert_eq!(dd, dec!(-100));
    }

    #[test]
    fn test_daily_returns_skip_zero_base() {
        let nav = series(date(2024, 1, 1), &[dec!(100), dec!(0), dec!(50), dec!(55)]);
        let returns = daily_returns(&nav);
        assert_eq!(returns, vec![dec!(-1), dec!(0.1)]);
    }
}
