//! Paginated vehicle listings.

use serde::{Deserialize, Serialize};

use super::VehicleSummary;

/// Pagination metadata of a list response.
///
/// `page` is 1-indexed and `total_pages` is `ceil(total / page_size)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageSummary {
    pub total: u64,
    pub total_pages: u64,
    pub page: u64,
    pub page_size: u64,
}

impl PageSummary {
    /// Build the metadata for `page` of a result set of `total` items.
    #[must_use]
    pub const fn new(total: u64, page: u64, page_size: u64) -> Self {
        Self {
            total,
            total_pages: Self::pages_for(total, page_size),
            page,
            page_size,
        }
    }

    /// Number of pages needed to show `total` items `page_size` at a time.
    #[must_use]
    pub const fn pages_for(total: u64, page_size: u64) -> u64 {
        if page_size == 0 {
            0
        } else {
            total.div_ceil(page_size)
        }
    }

    /// Whether this page is the first one.
    #[must_use]
    pub const fn is_first(&self) -> bool {
        self.page == 1
    }

    /// Whether this page is the last one.
    #[must_use]
    pub const fn is_last(&self) -> bool {
        self.page == self.total_pages
    }

    /// Whether the metadata satisfies `total_pages == ceil(total / page_size)`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.total_pages == Self::pages_for(self.total, self.page_size)
    }
}

/// One page of vehicles plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VehicleList {
    pub summary: PageSummary,
    pub vehicles: Vec<VehicleSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_total_pages_rounds_up() {
        assert_eq!(PageSummary::new(101, 1, 10).total_pages, 11);
        assert_eq!(PageSummary::new(100, 1, 10).total_pages, 10);
        assert_eq!(PageSummary::new(1, 1, 10).total_pages, 1);
    }

    #[test]
    fn test_empty_result_has_no_pages() {
        let summary = PageSummary::new(0, 1, 10);
        assert_eq!(summary.total_pages, 0);
        assert!(summary.is_consistent());
    }

    #[test]
    fn test_zero_page_size_does_not_divide() {
        assert_eq!(PageSummary::pages_for(5, 0), 0);
    }

    #[test]
    fn test_first_and_last_page() {
        let first = PageSummary::new(25, 1, 10);
        assert!(first.is_first());
        assert!(!first.is_last());

        let last = PageSummary::new(25, 3, 10);
        assert!(!last.is_first());
        assert!(last.is_last());
    }

    #[test]
    fn test_inconsistent_metadata_is_detected() {
        let summary = PageSummary {
            total: 25,
            total_pages: 2,
            page: 1,
            page_size: 10,
        };
        assert!(!summary.is_consistent());
    }

    #[test]
    fn test_list_parses_api_shape() {
        let json = r#"{
            "summary": {"total": 1, "totalPages": 1, "page": 1, "pageSize": 10},
            "vehicles": [{
                "id": "a", "vrm": "AB12 CDE", "manufacturer": "Audi", "model": "A4",
                "type": "Saloon", "color": "white", "fuel": "Diesel", "price": "12000"
            }]
        }"#;
        let list: Result<VehicleList, _> = serde_json::from_str(json);
        let list = list.ok();
        assert_eq!(list.as_ref().map(|l| l.summary.total_pages), Some(1));
        assert_eq!(list.map(|l| l.vehicles.len()), Some(1));
    }
}
