//! Position aggregation: collapse the ledger into live long positions

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeMap;

use crate::config::{Config, Currency};
use crate::ledger::{Action, Ledger};

/// A currently held position with weighted-average cost basis
#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    pub ticker: String,
    pub shares: u64,
    /// In the position's own currency
    pub avg_cost: Decimal,
    pub currency: Currency,
    pub first_buy: NaiveDate,
    pub sector: String,
}

/// Running buy/sell totals for one ticker. Absent tickers are all-zero.
#[derive(Debug, Default)]
struct TickerTotals {
    bought: u64,
    sold: u64,
    buy_cost: Decimal,
    first_buy: Option<(NaiveDate, Currency)>,
}

impl TickerTotals {
    fn add_buy(&mut self, shares: u64, price: Decimal, date: NaiveDate, currency: Currency) {
        self.bought += shares;
        self.buy_cost += Decimal::from(shares) * price;
        match self.first_buy {
            Some((first, _)) if first <= date => {}
            _ => self.first_buy = Some((date, currency)),
        }
    }

    fn add_sell(&mut self, shares: u64) {
        self.sold += shares;
    }

    /// Sells never touch the cost basis of what remains
    fn average_cost(&self) -> Decimal {
        if self.bought > 0 {
            self.buy_cost / Decimal::from(self.bought)
        } else {
            Decimal::ZERO
        }
    }
}

/// Net positions, one per ticker with more shares bought than sold, in ticker order.
///
/// Fully sold or oversold tickers are dropped here; their cash effect still
/// counts in NAV reconstruction.
pub fn build_positions(ledger: &Ledger, config: &Config) -> Vec<Position> {
    let mut totals: BTreeMap<&str, TickerTotals> = BTreeMap::new();

    for trade in ledger.trades() {
        let entry = totals.entry(trade.ticker.as_str()).or_default();
        match trade.action {
            Action::Buy => entry.add_buy(trade.shares, trade.price, trade.date, trade.currency),
            Action::Sell => entry.add_sell(trade.shares),
        }
    }

    totals
        .into_iter()
        .filter_map(|(ticker, t)| {
            if t.sold >= t.bought {
                return None;
            }
            let (first_buy, currency) = t.first_buy?;
            Some(Position {
                ticker: ticker.to_string(),
                shares: t.bought - t.sold,
                avg_cost: t.average_cost(),
                currency,
                first_buy,
                sector: config.sector_for(ticker).to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CurrencyPair;
    use rust_decimal_macros::dec;

    fn ledger(csv: &str) -> Ledger {
        let text = format!("date,ticker,action,shares,price,currency\n{}", csv);
        Ledger::from_reader(text.as_bytes(), &CurrencyPair::default()).unwrap()
    }

    #[test]
    fn test_weighted_average_cost_from_buys_only() {
        let ledger = ledger(
            "2024-01-02,8306.T,BUY,100,1000,JPY\n\
             2024-01-10,8306.T,BUY,50,1300,JPY\n\
             2024-02-01,8306.T,SELL,75,1500,JPY\n",
        );
        let positions = build_positions(&ledger, &Config::default());
        assert_eq!(positions.len(), 1);

        let p = &positions[0];
        assert_eq!(p.shares, 75);
        // (100*1000 + 50*1300) / 150, unaffected by the partial sell
        assert_eq!(p.avg_cost, dec!(1100));
        assert_eq!(p.first_buy, NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(p.sector, "Financials");
        assert_eq!(p.currency, Currency::Base);
    }

    #[test]
    fn test_closed_and_oversold_tickers_are_dropped() {
        let ledger = ledger(
            "2024-01-02,AAPL,BUY,10,180,USD\n\
             2024-01-03,AAPL,SELL,10,190,USD\n\
             2024-01-04,MSFT,BUY,5,400,USD\n\
             2024-01-05,MSFT,SELL,8,410,USD\n\
             2024-01-06,NVDA,BUY,2,500,USD\n",
        );
        let positions = build_positions(&ledger, &Config::default());
        let tickers: Vec<&str> = positions.iter().map(|p| p.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["NVDA"]);
        assert_eq!(positions[0].sector, "Other");
        assert_eq!(positions[0].currency, Currency::Foreign);
    }

    #[test]
    fn test_positions_are_sorted_by_ticker() {
        let ledger = ledger(
            "2024-01-02,V,BUY,1,250,USD\n\
             2024-01-02,7203.T,BUY,100,2500,JPY\n\
             2024-01-02,AAPL,BUY,1,180,USD\n",
        );
        let tickers: Vec<String> = build_positions(&ledger, &Config::default())
            .into_iter()
            .map(|p| p.ticker)
            .collect();
        assert_eq!(tickers, vec!["7203.T", "AAPL", "V"]);
    }
}
