//! Dashboard aggregates and chart series.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Aggregate stock counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Vehicles in stock.
    pub count: u64,
    /// Distinct manufacturers in stock.
    pub oems: u64,
    /// Total value of the stock in pounds.
    pub value: Decimal,
}

/// Which breakdown a chart request asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChartKind {
    FuelType,
    Oem,
    RegistrationYear,
}

impl ChartKind {
    /// Value of the `type` query parameter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::FuelType => "FUEL_TYPE",
            Self::Oem => "OEM",
            Self::RegistrationYear => "REGISTRATION_YEAR",
        }
    }

    /// Card title shown above the chart.
    #[must_use]
    pub const fn title(self) -> &'static str {
        match self {
            Self::FuelType => "Fuel Type Breakdown",
            Self::Oem => "Top 5 OEMs",
            Self::RegistrationYear => "Registrations By Year",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single (category, count) pair of a chart series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub key: String,
    pub value: u64,
}

impl ChartPoint {
    #[must_use]
    pub fn new(key: impl Into<String>, value: u64) -> Self {
        Self {
            key: key.into(),
            value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chart_kind_wire_names() {
        assert_eq!(ChartKind::FuelType.as_str(), "FUEL_TYPE");
        assert_eq!(
            serde_json::to_string(&ChartKind::RegistrationYear).ok().as_deref(),
            Some("\"REGISTRATION_YEAR\"")
        );
    }

    #[test]
    fn test_summary_accepts_numeric_value() {
        let summary: Option<Summary> =
            serde_json::from_str(r#"{"count": 104, "oems": 30, "value": 2943354}"#).ok();
        assert_eq!(summary.map(|s| s.value), Some(Decimal::from(2_943_354)));
    }
}
