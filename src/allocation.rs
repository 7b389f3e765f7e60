//! Geography and sector breakdowns of the portfolio value

use rust_decimal::Decimal;
use std::collections::HashMap;

use crate::config::CurrencyPair;
use crate::holdings::{weight_pct, Holding};

pub const CASH_LABEL: &str = "Cash";

/// One labelled share of the portfolio, weight in percent
#[derive(Debug, Clone, PartialEq)]
pub struct AllocationEntry {
    pub label: String,
    pub weight: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Allocations {
    /// By country of listing, largest first, then a trailing cash entry
    pub geography: Vec<AllocationEntry>,
    /// By sector, largest first
    pub sector: Vec<AllocationEntry>,
}

impl Allocations {
    pub fn geography_total(&self) -> Decimal {
        self.geography.iter().map(|e| e.weight).sum()
    }
}

/// Break `total_value` down by listing country and sector.
///
/// Each holding's weight is its value over `total_value` (the latest NAV);
/// whatever the holdings do not account for is reported as cash at the end
/// of the geography list.
pub fn calculate_allocations(
    holdings: &[Holding],
    total_value: Decimal,
    currencies: &CurrencyPair,
) -> Allocations {
    let mut geography = Breakdown::default();
    let mut sector = Breakdown::default();

    for h in holdings {
        let weight = weight_pct(h.value_base, total_value);
        geography.add(currencies.country(h.currency), weight);
        sector.add(&h.sector, weight);
    }

    let invested: Decimal = holdings.iter().map(|h| h.value_base).sum();
    let mut geography = geography.into_sorted();
    geography.push(AllocationEntry {
        label: CASH_LABEL.to_string(),
        weight: weight_pct(total_value - invested, total_value),
    });

    Allocations {
        geography,
        sector: sector.into_sorted(),
    }
}

/// Weight accumulator that remembers first-seen label order for tie-breaks
#[derive(Default)]
struct Breakdown {
    order: Vec<String>,
    weights: HashMap<String, Decimal>,
}

impl Breakdown {
    fn add(&mut self, label: &str, weight: Decimal) {
        if !self.weights.contains_key(label) {
            self.order.push(label.to_string());
        }
        *self.weights.entry(label.to_string()).or_insert(Decimal::ZERO) += weight;
    }

    fn into_sorted(self) -> Vec<AllocationEntry> {
        let mut entries: Vec<AllocationEntry> = self
            .order
            .into_iter()
            .map(|label| {
                let weight = self.weights.get(&label).copied().unwrap_or(Decimal::ZERO);
                AllocationEntry { label, weight }
            })
            .collect();
        // stable: equal weights keep first-seen order
        entries.sort_by(|a, b| b.weight.cmp(&a.weight));
        entries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Currency;
    use rust_decimal_macros::dec;

    fn holding(ticker: &str, sector: &str, currency: Currency, value: Decimal) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            company_name: ticker.to_string(),
            sector: sector.to_string(),
            shares: 1,
            avg_cost: value,
            current_price: value,
            currency,
            cost_base: value,
            value_base: value,
            return_pct: Decimal::ZERO,
            weight: Decimal::ZERO,
        }
    }

    #[test]
    fn test_breakdowns_sorted_with_trailing_cash() {
        let holdings = vec![
            holding("AAPL", "Technology", Currency::Foreign, dec!(300)),
            holding("8306.T", "Financials", Currency::Base, dec!(200)),
            holding("6758.T", "Technology", Currency::Base, dec!(150)),
        ];
        let alloc = calculate_allocations(&holdings, dec!(1000), &CurrencyPair::default());

        let geo: Vec<(&str, Decimal)> = alloc
            .geography
            .iter()
            .map(|e| (e.label.as_str(), e.weight))
            .collect();
        assert_eq!(
            geo,
            vec![("Japan", dec!(35)), ("United States", dec!(30)), ("Cash", dec!(35))]
        );

        let sectors: Vec<(&str, Decimal)> = alloc
            .sector
            .iter()
            .map(|e| (e.label.as_str(), e.weight))
            .collect();
        assert_eq!(sectors, vec![("Technology", dec!(45)), ("Financials", dec!(20))]);
    }

    #[test]
    fn test_geography_sums_to_hundred() {
        let holdings = vec![
            holding("A", "X", Currency::Base, dec!(123.45)),
            holding("B", "Y", Currency::Foreign, dec!(678.9)),
        ];
        let alloc = calculate_allocations(&holdings, dec!(1500), &CurrencyPair::default());
        let total = alloc.geography_total();
        assert!((total - dec!(100)).abs() < dec!(0.000001), "{}", total);
    }

    #[test]
    fn test_zero_total_value_yields_zero_weights() {
        let holdings = vec![holding("A", "X", Currency::Base, dec!(10))];
        let alloc = calculate_allocations(&holdings, Decimal::ZERO, &CurrencyPair::default());
        assert!(alloc.geography.iter().all(|e| e.weight.is_zero()));
        assert!(alloc.sector.iter().all(|e| e.weight.is_zero()));
    }

    #[test]
    fn test_all_cash_portfolio() {
        let alloc = calculate_allocations(&[], dec!(5000), &CurrencyPair::default());
        assert_eq!(alloc.geography.len(), 1);
        assert_eq!(alloc.geography[0].label, CASH_LABEL);
        assert_eq!(alloc.geography[0].weight, dec!(100));
        assert!(alloc.sector.is_empty());
    }
}
