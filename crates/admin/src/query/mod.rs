//! Remote-state cache and per-view query observers.
//!
//! - [`QueryClient`] owns the shared cache. It deduplicates concurrent
//!   requests per key, never caches errors, and can drop everything that
//!   belongs to one session.
//! - [`QueryObserver`] tracks what a single view is showing, including the
//!   placeholder data kept while a new key loads.
//! - [`ViewRegistry`] holds the observers of every view a session has open.

mod client;
mod key;
mod observer;
mod views;

pub use client::{QueryClient, QueryError};
pub use key::{AddOptions, CacheKey, CacheValue, HomeData, QueryKey};
pub use observer::{QueryObserver, QueryStatus, Resolution};
pub use views::{ViewId, ViewRegistry};
