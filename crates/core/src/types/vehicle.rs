//! Vehicle records as exchanged with the vehicle API.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Price, VehicleId};

/// Fuel kind of a vehicle.
///
/// The API spells petrol as `Gasoline`; the UI always shows [`FuelType::label`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FuelType {
    Gasoline,
    Diesel,
    Hybrid,
    Electric,
}

/// Error returned when a string is not a known fuel kind.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown fuel type: {0}")]
pub struct UnknownFuelType(pub String);

impl FuelType {
    /// Every fuel kind, in the order the create form offers them.
    pub const ALL: [Self; 4] = [Self::Gasoline, Self::Diesel, Self::Hybrid, Self::Electric];

    /// Wire value used by the API.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gasoline => "Gasoline",
            Self::Diesel => "Diesel",
            Self::Hybrid => "Hybrid",
            Self::Electric => "Electric",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Gasoline => "Petrol",
            Self::Diesel => "Diesel",
            Self::Hybrid => "Hybrid",
            Self::Electric => "Electric",
        }
    }

    /// Series key used by the fuel breakdown chart.
    #[must_use]
    pub const fn chart_key(self) -> &'static str {
        match self {
            Self::Gasoline => "petrol",
            Self::Diesel => "diesel",
            Self::Hybrid => "hybrid",
            Self::Electric => "electric",
        }
    }

    /// Look up a fuel kind by its chart series key.
    #[must_use]
    pub fn from_chart_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|fuel| fuel.chart_key() == key)
    }
}

impl fmt::Display for FuelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FuelType {
    type Err = UnknownFuelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|fuel| fuel.as_str() == s)
            .ok_or_else(|| UnknownFuelType(s.to_string()))
    }
}

/// A full vehicle record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    pub id: VehicleId,
    /// Vehicle registration mark (number plate).
    pub vrm: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub fuel: FuelType,
    pub color: String,
    /// Vehicle identification number.
    pub vin: String,
    pub mileage: u32,
    pub registration_date: NaiveDate,
    pub price: Price,
}

impl Vehicle {
    /// Assign an identifier to submitted form data.
    #[must_use]
    pub fn from_form(id: VehicleId, form: VehicleFormData) -> Self {
        Self {
            id,
            vrm: form.vrm,
            manufacturer: form.manufacturer,
            model: form.model,
            vehicle_type: form.vehicle_type,
            fuel: form.fuel,
            color: form.color,
            vin: form.vin,
            mileage: form.mileage,
            registration_date: form.registration_date,
            price: form.price,
        }
    }

    /// Project to the reduced shape used by list views.
    #[must_use]
    pub fn summary(&self) -> VehicleSummary {
        VehicleSummary {
            id: self.id.clone(),
            vrm: self.vrm.clone(),
            manufacturer: self.manufacturer.clone(),
            model: self.model.clone(),
            vehicle_type: self.vehicle_type.clone(),
            color: self.color.clone(),
            fuel: self.fuel,
            price: self.price.clone(),
        }
    }
}

/// The subset of [`Vehicle`] returned by the list endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleSummary {
    pub id: VehicleId,
    pub vrm: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub color: String,
    pub fuel: FuelType,
    pub price: Price,
}

/// Body of a create request: a [`Vehicle`] without its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VehicleFormData {
    pub vrm: String,
    pub manufacturer: String,
    pub model: String,
    #[serde(rename = "type")]
    pub vehicle_type: String,
    pub fuel: FuelType,
    pub color: String,
    pub vin: String,
    pub mileage: u32,
    pub registration_date: NaiveDate,
    pub price: Price,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const VEHICLE_JSON: &str = r#"{
        "id": "1",
        "vrm": "VRM1",
        "manufacturer": "Ford",
        "model": "Focus",
        "type": "Saloon",
        "fuel": "Gasoline",
        "color": "black",
        "vin": "1234567890",
        "mileage": 10000,
        "registrationDate": "2021-01-01",
        "price": "29999"
    }"#;

    #[test]
    fn test_vehicle_parses_api_shape() {
        let vehicle: Vehicle = serde_json::from_str(VEHICLE_JSON).unwrap();
        assert_eq!(vehicle.id, VehicleId::new("1"));
        assert_eq!(vehicle.vehicle_type, "Saloon");
        assert_eq!(vehicle.fuel, FuelType::Gasoline);
        assert_eq!(
            vehicle.registration_date,
            NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
        );
        assert_eq!(vehicle.price.as_str(), "29999");
    }

    #[test]
    fn test_form_data_uses_api_field_names() {
        let vehicle: Vehicle = serde_json::from_str(VEHICLE_JSON).unwrap();
        let form = VehicleFormData {
            vrm: vehicle.vrm,
            manufacturer: vehicle.manufacturer,
            model: vehicle.model,
            vehicle_type: vehicle.vehicle_type,
            fuel: vehicle.fuel,
            color: vehicle.color,
            vin: vehicle.vin,
            mileage: vehicle.mileage,
            registration_date: vehicle.registration_date,
            price: vehicle.price,
        };
        let value = serde_json::to_value(&form).unwrap();
        assert_eq!(value["type"], "Saloon");
        assert_eq!(value["registrationDate"], "2021-01-01");
        assert_eq!(value["price"], "29999");
        assert!(value.get("id").is_none());
    }

    #[test]
    fn test_fuel_labels() {
        assert_eq!(FuelType::Gasoline.label(), "Petrol");
        assert_eq!(FuelType::Electric.label(), "Electric");
    }

    #[test]
    fn test_fuel_from_str() {
        assert_eq!("Hybrid".parse::<FuelType>().ok(), Some(FuelType::Hybrid));
        assert!("Petrol".parse::<FuelType>().is_err());
    }

    #[test]
    fn test_fuel_chart_keys() {
        assert_eq!(FuelType::from_chart_key("petrol"), Some(FuelType::Gasoline));
        assert_eq!(FuelType::from_chart_key("steam"), None);
    }

    #[test]
    fn test_summary_projection_keeps_identifier() {
        let vehicle: Vehicle = serde_json::from_str(VEHICLE_JSON).unwrap();
        let summary = vehicle.summary();
        assert_eq!(summary.id, vehicle.id);
        assert_eq!(summary.price, vehicle.price);
    }
}
