//! Formatting helpers for amounts, percentages and quantities
//!
//! Amounts are shown with two decimals, `,` as thousands separator and `.`
//! as decimal separator. Values are rounded half away from zero.

use rust_decimal::{Decimal, RoundingStrategy};

/// Core formatting function with full control over output.
///
/// # Arguments
/// * `value` - The decimal value to format
/// * `width` - Minimum width for padding (0 for no padding, right-aligned)
/// * `signed` - Prefix positive values with `+`
///
/// # Examples
/// ```
/// use tally::utils::format_amount_with_width;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount_with_width(dec!(1234.56), 0, false), "1,234.56");
/// assert_eq!(format_amount_with_width(dec!(12), 8, true), "  +12.00");
/// ```
pub fn format_amount_with_width(value: Decimal, width: usize, signed: bool) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let is_negative = rounded < Decimal::ZERO;

    let formatted = format!("{:.2}", rounded.abs());
    let (integer_part, decimal_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), "00"));

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

    let sign = if is_negative {
        "-"
    } else if signed && rounded > Decimal::ZERO {
        "+"
    } else {
        ""
    };

    let result = format!("{}{}.{}", sign, with_separators, decimal_part);

    if width > 0 && result.len() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

/// "1,234.56"
///
/// # Examples
/// ```
/// use tally::utils::format_amount;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount(dec!(-500)), "-500.00");
/// ```
pub fn format_amount(value: Decimal) -> String {
    format_amount_with_width(value, 0, false)
}

/// P&L style: "+1,234.56" / "-12.00" / "0.00"
pub fn format_signed(value: Decimal) -> String {
    format_amount_with_width(value, 0, true)
}

/// Percent units to "12.50%"
pub fn format_pct(value: Decimal) -> String {
    let rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("{:.2}%", rounded)
}

/// Quantities keep their precision but drop trailing zeros
pub fn format_quantity(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_amount_basic() {
        assert_eq!(format_amount(dec!(1234.56)), "1,234.56");
        assert_eq!(format_amount(dec!(0.99)), "0.99");
        assert_eq!(format_amount(dec!(1000000)), "1,000,000.00");
        assert_eq!(format_amount(dec!(0)), "0.00");
    }

    #[test]
    fn test_format_amount_negative() {
        assert_eq!(format_amount(dec!(-1234.56)), "-1,234.56");
        assert_eq!(format_amount(dec!(-0.01)), "-0.01");
    }

    #[test]
    fn test_rounding_is_half_away_from_zero() {
        assert_eq!(format_amount(dec!(1.005)), "1.01");
        assert_eq!(format_amount(dec!(-1.005)), "-1.01");
        assert_eq!(format_amount(dec!(-0.001)), "0.00");
    }

    #[test]
    fn test_signed_and_width() {
        assert_eq!(format_signed(dec!(500)), "+500.00");
        assert_eq!(format_signed(dec!(-3.2)), "-3.20");
        assert_eq!(format_signed(dec!(0)), "0.00");
        assert_eq!(format_amount_with_width(dec!(100), 10, false), "    100.00");
        assert_eq!(format_amount_with_width(dec!(1000000), 5, false), "1,000,000.00");
    }

    #[test]
    fn test_pct_and_quantity() {
        assert_eq!(format_pct(dec!(13.333333)), "13.33%");
        assert_eq!(format_pct(dec!(0)), "0.00%");
        assert_eq!(format_quantity(dec!(1.500)), "1.5");
        assert_eq!(format_quantity(dec!(10)), "10");
    }
}
