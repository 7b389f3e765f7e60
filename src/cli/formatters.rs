//! Output formatting module for CLI display
//!
//! This module handles all terminal output formatting, separating
//! the concerns of data calculation from presentation.

use colored::{ColoredString, Colorize};
use rust_decimal::Decimal;
use tabled::{
    settings::{object::Columns, Alignment, Style},
    Table, Tabled,
};

use crate::config::{Config, Currency};
use crate::ledger::Ledger;
use crate::report::PortfolioReport;
use crate::utils::{format_money, format_pct};

fn signed(text: String, value: Decimal) -> ColoredString {
    if value >= Decimal::ZERO {
        text.green()
    } else {
        text.red()
    }
}

/// Holdings table, largest position first
pub fn format_holdings_table(report: &PortfolioReport, config: &Config) -> String {
    #[derive(Tabled)]
    struct HoldingRow {
        #[tabled(rename = "Ticker")]
        ticker: String,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Sector")]
        sector: String,
        #[tabled(rename = "Shares")]
        shares: String,
        #[tabled(rename = "Avg Cost")]
        avg_cost: String,
        #[tabled(rename = "Price")]
        price: String,
        #[tabled(rename = "Value")]
        value: String,
        #[tabled(rename = "Return %")]
        return_pct: String,
        #[tabled(rename = "Weight %")]
        weight: String,
    }

    let base = &config.currencies.base;
    let rows: Vec<HoldingRow> = report
        .holdings
        .iter()
        .map(|h| {
            let code = config.currencies.code(h.currency);
            let dp = match h.currency {
                Currency::Base => 0,
                Currency::Foreign => 2,
            };
            HoldingRow {
                ticker: h.ticker.clone(),
                name: h.company_name.clone(),
                sector: h.sector.clone(),
                shares: h.shares.to_string(),
                avg_cost: format_money(h.avg_cost, code, dp),
                price: format_money(h.current_price, code, dp),
                value: format_money(h.value_base, base, 0),
                return_pct: signed(format_pct(h.return_pct), h.return_pct).to_string(),
                weight: format!("{:.1}", h.weight.round_dp(1)),
            }
        })
        .collect();

    let mut table = Table::new(&rows);
    table.with(Style::modern());
    // Right-align numeric columns (Shares onwards)
    table.modify(Columns::new(3..), Alignment::right());
    table.to_string()
}

/// Headline figures: value, returns, risk, cash and benchmarks
pub fn format_summary(report: &PortfolioReport, config: &Config) -> String {
    let base = &config.currencies.base;
    let m = &report.metrics;
    let mut output = String::new();

    output.push_str(&format!("\n{} Summary", "━".repeat(60).bright_black()));
    output.push_str(&format!(
        "\n{:<22} {}",
        "Portfolio Value:".bold(),
        format_money(report.portfolio_value(), base, 0)
    ));
    output.push_str(&format!(
        "\n{:<22} {}",
        "Total Return:".bold(),
        signed(format_pct(m.total_return), m.total_return)
    ));
    output.push_str(&format!(
        "\n{:<22} {}",
        "YTD Return:".bold(),
        signed(format_pct(m.ytd_return), m.ytd_return)
    ));
    output.push_str(&format!(
        "\n{:<22} {:.2}",
        "Sharpe Ratio:".bold(),
        m.sharpe_ratio.round_dp(2)
    ));
    output.push_str(&format!(
        "\n{:<22} {} ({})",
        "Max Drawdown:".bold(),
        format!("{:.2}%", m.max_drawdown.round_dp(2)).red(),
        m.max_drawdown_date.format("%b %Y")
    ));
    output.push_str(&format!(
        "\n{:<22} {} ({:.1}%)",
        "Cash:".bold(),
        format_money(report.cash, base, 0),
        report.cash_pct.round_dp(1)
    ));
    output.push_str(&format!(
        "\n{:<22} {} ({} {}, {} {})",
        "Positions:".bold(),
        report.holdings.len(),
        report.count_in(Currency::Base),
        config.currencies.home_country,
        report.count_in(Currency::Foreign),
        config.currencies.foreign_country
    ));
    output.push_str(&format!(
        "\n{:<22} {:.2}",
        format!("{}/{}:", config.currencies.foreign, base).bold(),
        report.fx_rate.round_dp(2)
    ));

    for b in &report.benchmarks {
        output.push_str(&format!(
            "\n{:<22} {}",
            format!("{}:", b.label).bold(),
            signed(format_pct(b.current), b.current)
        ));
    }
    output.push('\n');
    output
}

/// Outcome of `validate`: counts, inception and any oversold tickers
pub fn format_validation(ledger: &Ledger) -> String {
    let mut output = format!(
        "{} {} trades across {} tickers, inception {}\n",
        "✓".green().bold(),
        ledger.len(),
        ledger.tickers().len(),
        ledger.inception()
    );
    for ticker in ledger.oversold_tickers() {
        output.push_str(&format!(
            "{} {}: sells exceed buys at some point\n",
            "⚠".yellow().bold(),
            ticker
        ));
    }
    output
}
