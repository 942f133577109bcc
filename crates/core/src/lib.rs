//! Vehicle Manager Core - Shared types library.
//!
//! This crate provides the types used across all Vehicle Manager components:
//! - `admin` - The stock management web panel
//! - `integration-tests` - The fake backend and end-to-end tests
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Everything here mirrors the wire format of the vehicle REST API.
//!
//! # Modules
//!
//! - [`types`] - Entities, newtype IDs, the string-backed [`Price`], and enums
//! - [`format`] - Display formatting for numbers, currency, dates, and colours

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod format;
pub mod types;

pub use types::*;
