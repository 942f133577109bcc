//! Newtype IDs for type-safe entity references.
//!
//! The vehicle API hands out opaque string identifiers (UUIDs in practice).
//! Use the `define_id!` macro to create wrappers that prevent accidentally
//! mixing IDs from different entity types.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - Conversion methods: `new()`, `as_str()`
/// - `Display`, `From<String>` and `From<&str>` implementations
///
/// # Example
///
/// ```rust
/// # use vehicle_manager_core::define_id;
/// define_id!(GarageId);
/// define_id!(DealerId);
///
/// let garage_id = GarageId::new("1");
/// let dealer_id = DealerId::new("1");
///
/// // These are different types, so this won't compile:
/// // let _: GarageId = dealer_id;
/// assert_eq!(garage_id.as_str(), dealer_id.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the underlying identifier.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

define_id!(VehicleId);
define_id!(UserId);
