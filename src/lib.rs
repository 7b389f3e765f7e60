//! Shadow - paper portfolio NAV reconstruction and reporting
//!
//! This library replays a trade ledger against daily closing prices to rebuild
//! the daily net asset value of a two-currency portfolio, and derives the
//! performance metrics, holdings, allocations and benchmark chart published
//! in the portfolio snapshot.

pub mod allocation;
pub mod chart;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fx;
pub mod holdings;
pub mod ledger;
pub mod metrics;
pub mod nav;
pub mod positions;
pub mod prices;
pub mod pricing;
pub mod report;
pub mod utils;
