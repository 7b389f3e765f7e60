//! Utility functions for formatting money and percentages
//!
//! Centralized formatting for the display strings in the report and the
//! terminal output. Amounts use `,` as the thousands separator and `.` as the
//! decimal separator.

use rust_decimal::Decimal;

/// Symbol printed in front of an amount for a currency code.
///
/// Unknown codes print the code itself followed by a space.
pub fn currency_symbol(code: &str) -> String {
    match code.to_ascii_uppercase().as_str() {
        "JPY" => "¥".to_string(),
        "USD" => "$".to_string(),
        "EUR" => "€".to_string(),
        "GBP" => "£".to_string(),
        other => format!("{} ", other),
    }
}

/// Group digits with thousands separators and round to `decimals` places.
///
/// # Examples
/// ```
/// use shadow::utils::format_amount;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount(dec!(1234567.891), 2), "1,234,567.89");
/// assert_eq!(format_amount(dec!(-1500), 0), "-1,500");
/// ```
pub fn format_amount(value: Decimal, decimals: u32) -> String {
    let is_negative = value < Decimal::ZERO;
    let rounded = value.abs().round_dp(decimals);

    let formatted = format!("{:.*}", decimals as usize, rounded);
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((i, d)) => (i.to_string(), Some(d.to_string())),
        None => (formatted.clone(), None),
    };

    let with_separators: String = integer_part
        .chars()
        .rev()
        .enumerate()
        .flat_map(|(i, c)| {
            if i > 0 && i % 3 == 0 {
                vec![',', c]
            } else {
                vec![c]
            }
        })
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();

    // "-0" after rounding is just zero
    let sign = if is_negative && !rounded.is_zero() { "-" } else { "" };
    match decimal_part {
        Some(d) => format!("{}{}.{}", sign, with_separators, d),
        None => format!("{}{}", sign, with_separators),
    }
}

/// Amount with currency symbol: "¥1,234", "$1,234.56"
///
/// # Examples
/// ```
/// use shadow::utils::format_money;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_money(dec!(2500), "JPY", 0), "¥2,500");
/// assert_eq!(format_money(dec!(189.5), "USD", 2), "$189.50");
/// ```
pub fn format_money(value: Decimal, currency_code: &str, decimals: u32) -> String {
    let amount = format_amount(value, decimals);
    let symbol = currency_symbol(currency_code);
    match amount.strip_prefix('-') {
        Some(abs) => format!("-{}{}", symbol, abs),
        None => format!("{}{}", symbol, amount),
    }
}

/// Signed percentage with two decimals: "+1.25%", "-3.40%"
pub fn format_pct(value: Decimal) -> String {
    let rounded = value.round_dp(2);
    if rounded > Decimal::ZERO {
        format!("+{:.2}%", rounded)
    } else {
        format!("{:.2}%", rounded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_amount_basic() {
        assert_eq!(format_amount(dec!(1234.56), 2), "1,234.56");
        assert_eq!(format_amount(dec!(0.99), 2), "0.99");
        assert_eq!(format_amount(dec!(1000000), 2), "1,000,000.00");
    }

    #[test]
    fn test_format_amount_no_decimals() {
        assert_eq!(format_amount(dec!(0), 0), "0");
        assert_eq!(format_amount(dec!(999), 0), "999");
        assert_eq!(format_amount(dec!(15000000), 0), "15,000,000");
        assert_eq!(format_amount(dec!(1234.4), 0), "1,234");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount(dec!(-1234.56), 2), "-1,234.56");
        assert_eq!(format_amount(dec!(-0.001), 2), "0.00");
    }

    #[test]
    fn test_format_money_symbols() {
        assert_eq!(format_money(dec!(1500000), "JPY", 0), "¥1,500,000");
        assert_eq!(format_money(dec!(-42.5), "usd", 2), "-$42.50");
        assert_eq!(format_money(dec!(10), "CHF", 2), "CHF 10.00");
    }

    #[test]
    fn test_format_pct() {
        assert_eq!(format_pct(dec!(1.254)), "+1.25%");
        assert_eq!(format_pct(dec!(-3.4)), "-3.40%");
        assert_eq!(format_pct(Decimal::ZERO), "0.00%");
    }
}
