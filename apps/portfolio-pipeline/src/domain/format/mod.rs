//! Display Formatting
//!
//! Pure formatting helpers for monetary values, large-number abbreviations,
//! and percentages. All rounding is half-away-from-zero to two decimals.

use rust_decimal::{Decimal, RoundingStrategy};

const TRILLION: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);
const BILLION: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
const MILLION: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);
const THOUSAND: Decimal = Decimal::from_parts(1_000, 0, 0, false, 0);

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a value as US dollars with thousands grouping and two decimals.
///
/// `6000` becomes `$6,000.00`; negatives carry a leading `-` (`-$12.50`).
#[must_use]
pub fn format_currency_2dp(value: Decimal) -> String {
    let rounded = round2(value);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() {
        "-"
    } else {
        ""
    };

    let plain = format!("{:.2}", rounded.abs());
    let (whole, fraction) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    format!("{sign}${}.{fraction}", group_thousands(whole))
}

/// Abbreviate a large value with a `Tr`/`Bn`/`M`/`K` suffix and two decimals.
///
/// Values below one thousand are rendered plainly with two decimals.
#[must_use]
pub fn format_abbreviated(value: Decimal) -> String {
    let sign = if value.is_sign_negative() && !value.is_zero() {
        "-"
    } else {
        ""
    };
    let magnitude = value.abs();

    let (scaled, suffix) = if magnitude >= TRILLION {
        (magnitude / TRILLION, "Tr")
    } else if magnitude >= BILLION {
        (magnitude / BILLION, "Bn")
    } else if magnitude >= MILLION {
        (magnitude / MILLION, "M")
    } else if magnitude >= THOUSAND {
        (magnitude / THOUSAND, "K")
    } else {
        (magnitude, "")
    };

    format!("{sign}{:.2}{suffix}", round2(scaled))
}

/// Format a percentage figure with two decimals and a `%` suffix.
#[must_use]
pub fn format_percent(value: Decimal) -> String {
    format!("{:.2}%", round2(value))
}

fn group_thousands(digits: &str) -> String {
    let len = digits.len();
    let mut grouped = String::with_capacity(len + len / 3);

    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use test_case::test_case;

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test_case("6000", "$6,000.00" ; "whole thousands")]
    #[test_case("0", "$0.00" ; "zero")]
    #[test_case("0.005", "$0.01" ; "rounds half away from zero")]
    #[test_case("999.999", "$1,000.00" ; "rounding carries into grouping")]
    #[test_case("1234567.891", "$1,234,567.89" ; "millions")]
    #[test_case("-12.5", "-$12.50" ; "negative")]
    #[test_case("-0.001", "$0.00" ; "negative rounding to zero has no sign")]
    fn currency(input: &str, expected: &str) {
        assert_eq!(format_currency_2dp(dec(input)), expected);
    }

    #[test_case("1000000000000", "1.00Tr" ; "one trillion")]
    #[test_case("2345000000000", "2.35Tr" ; "trillions round")]
    #[test_case("45600000000", "45.60Bn" ; "billions")]
    #[test_case("12000000", "12.00M" ; "millions")]
    #[test_case("1500", "1.50K" ; "thousands")]
    #[test_case("999.5", "999.50" ; "below a thousand")]
    #[test_case("-3000000", "-3.00M" ; "negative millions")]
    fn abbreviated(input: &str, expected: &str) {
        assert_eq!(format_abbreviated(dec(input)), expected);
    }

    #[test]
    fn trillion_constant_is_exact() {
        assert_eq!(TRILLION, Decimal::from(1_000_000_000_000_u64));
    }

    #[test]
    fn percent_two_decimals() {
        assert_eq!(format_percent(dec("45.123")), "45.12%");
        assert_eq!(format_percent(dec("-1.5")), "-1.50%");
    }

    #[test]
    fn group_thousands_boundaries() {
        assert_eq!(group_thousands("1"), "1");
        assert_eq!(group_thousands("123"), "123");
        assert_eq!(group_thousands("1234"), "1,234");
        assert_eq!(group_thousands("123456"), "123,456");
    }
}
