//! Core types for Vehicle Manager.
//!
//! This module provides type-safe wrappers and the entity shapes exchanged
//! with the vehicle REST API.

pub mod id;
pub mod listing;
pub mod price;
pub mod stats;
pub mod user;
pub mod vehicle;

pub use id::*;
pub use listing::{PageSummary, VehicleList};
pub use price::Price;
pub use stats::{ChartKind, ChartPoint, Summary};
pub use user::{SessionToken, User};
pub use vehicle::{FuelType, Vehicle, VehicleFormData, VehicleSummary};
