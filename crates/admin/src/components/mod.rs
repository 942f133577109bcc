//! Reusable view pieces shared by several screens.

pub mod pagination;

pub use pagination::{PageLink, PaginationView, vehicles_results_url, vehicles_url};
