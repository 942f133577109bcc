//! String-backed price representation.
//!
//! Prices travel through the system exactly as the backend sends them so no
//! floating-point rounding ever touches a currency value. Arithmetic, when
//! needed, goes through [`rust_decimal::Decimal`].

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price in pounds sterling, kept as the decimal string the API returned.
///
/// # Examples
///
/// ```
/// use vehicle_manager_core::Price;
///
/// let price = Price::new("29999.50");
/// assert_eq!(price.whole_units(), Some(29999));
/// assert_eq!(price.as_str(), "29999.50");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(String);

impl Price {
    /// Wrap a decimal string without altering it.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Build a price from a whole number of pounds.
    #[must_use]
    pub fn from_whole_units(units: u64) -> Self {
        Self(units.to_string())
    }

    /// The raw decimal string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The integer part of the price, read the way the list and details
    /// views read it: leading whitespace is skipped, an optional sign and the
    /// leading run of digits are parsed, and everything after is ignored.
    ///
    /// Returns `None` when no digits lead the string.
    #[must_use]
    pub fn whole_units(&self) -> Option<i64> {
        let trimmed = self.0.trim_start();
        let (negative, rest) = match trimmed.as_bytes().first() {
            Some(b'-') => (true, trimmed.get(1..)?),
            Some(b'+') => (false, trimmed.get(1..)?),
            _ => (false, trimmed),
        };
        let digits_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let digits = rest.get(..digits_end)?;
        if digits.is_empty() {
            return None;
        }
        let value = digits.parse::<i64>().ok()?;
        Some(if negative { -value } else { value })
    }

    /// The exact decimal amount, if the string is a well-formed decimal.
    #[must_use]
    pub fn amount(&self) -> Option<Decimal> {
        Decimal::from_str(self.0.trim()).ok()
    }
}

impl std::fmt::Display for Price {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whole_units_integer_string() {
        assert_eq!(Price::new("29999").whole_units(), Some(29999));
    }

    #[test]
    fn test_whole_units_truncates_fraction() {
        assert_eq!(Price::new("1234.99").whole_units(), Some(1234));
    }

    #[test]
    fn test_whole_units_stops_at_first_non_digit() {
        assert_eq!(Price::new(" 12abc").whole_units(), Some(12));
        assert_eq!(Price::new("-40").whole_units(), Some(-40));
    }

    #[test]
    fn test_whole_units_rejects_non_numeric() {
        assert_eq!(Price::new("abc").whole_units(), None);
        assert_eq!(Price::new("").whole_units(), None);
        assert_eq!(Price::new("-").whole_units(), None);
    }

    #[test]
    fn test_amount_is_exact() {
        let amount = Price::new("0.10").amount();
        assert_eq!(amount, Decimal::from_str("0.10").ok());
    }

    #[test]
    fn test_price_serializes_as_string() {
        let json = serde_json::to_string(&Price::from_whole_units(19999)).ok();
        assert_eq!(json.as_deref(), Some("\"19999\""));
    }
}
