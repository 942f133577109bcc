//! Display formatting shared by every screen.
//!
//! All output follows British English conventions: comma digit grouping,
//! pounds sterling, and day-month-year dates.

use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::Price;

/// Group the digits of an integer in threes, e.g. `10000` → `"10,000"`.
#[must_use]
pub fn format_number(value: impl Into<i128>) -> String {
    let value = value.into();
    let grouped = group_digits(&value.unsigned_abs().to_string());
    if value < 0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}

/// Format whole pounds with no decimals, e.g. `29999` → `"£29,999"`.
#[must_use]
pub fn format_currency(whole_pounds: i64) -> String {
    let grouped = group_digits(&whole_pounds.unsigned_abs().to_string());
    if whole_pounds < 0 {
        format!("-£{grouped}")
    } else {
        format!("£{grouped}")
    }
}

/// Format a price as whole pounds, ignoring any fractional part.
///
/// A price with no leading digits is shown as-is.
#[must_use]
pub fn format_price(price: &Price) -> String {
    price
        .whole_units()
        .map_or_else(|| price.as_str().to_string(), format_currency)
}

const COMPACT_UNITS: [(&str, i64); 5] = [
    ("", 1),
    ("K", 1_000),
    ("M", 1_000_000),
    ("B", 1_000_000_000),
    ("T", 1_000_000_000_000),
];

/// Format an amount in compact notation, e.g. `2943354` → `"£2.9M"`.
///
/// Amounts below ten units keep one decimal place (dropped when zero), larger
/// ones are rounded to a whole number of units.
#[must_use]
pub fn format_currency_compact(value: Decimal) -> String {
    let magnitude = value.abs();
    let mut unit_index = COMPACT_UNITS
        .iter()
        .rposition(|(_, divisor)| magnitude >= Decimal::from(*divisor))
        .unwrap_or(0);

    let mut scaled = round_compact(magnitude, unit_index);
    if scaled >= Decimal::ONE_THOUSAND && unit_index + 1 < COMPACT_UNITS.len() {
        unit_index += 1;
        scaled = round_compact(magnitude, unit_index);
    }

    let suffix = COMPACT_UNITS.get(unit_index).map_or("", |(suffix, _)| suffix);
    let body = scaled.normalize().to_string();
    let body = match body.split_once('.') {
        Some((whole, fraction)) => format!("{}.{fraction}", group_digits(whole)),
        None => group_digits(&body),
    };

    if value.is_sign_negative() && !scaled.is_zero() {
        format!("-£{body}{suffix}")
    } else {
        format!("£{body}{suffix}")
    }
}

fn round_compact(magnitude: Decimal, unit_index: usize) -> Decimal {
    let divisor = COMPACT_UNITS.get(unit_index).map_or(1, |(_, divisor)| *divisor);
    let scaled = magnitude / Decimal::from(divisor);
    let places = if scaled < Decimal::TEN { 1 } else { 0 };
    scaled.round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
}

/// Format a date the long British way, e.g. `"1 January 2021"`.
#[must_use]
pub fn format_long_date(date: NaiveDate) -> String {
    date.format("%-d %B %Y").to_string()
}

/// Display name of a colour: the first letter upper-cased.
#[must_use]
pub fn color_name(color: &str) -> String {
    let mut chars = color.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// CSS colour for a swatch.
///
/// Two stock colours are not CSS keywords and map to hex values; everything
/// else is passed through.
#[must_use]
pub fn web_color(color: &str) -> &str {
    match color {
        "sky blue" => "#87CEEB",
        "mint green" => "#98FB98",
        other => other,
    }
}

fn group_digits(digits: &str) -> String {
    let len = digits.len();
    let mut out = String::with_capacity(len + len / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (len - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
