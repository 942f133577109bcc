//! Pagination controls for the vehicle list.

use url::form_urlencoded;

use vehicle_manager_core::PageSummary;

use crate::query::ViewId;

/// URL of the vehicle list for a page and search term.
///
/// Both parameters are always present, matching what the search form submits.
#[must_use]
pub fn vehicles_url(page: u64, q: &str) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("page", &page.to_string())
        .append_pair("q", q)
        .finish();
    format!("/vehicles?{query}")
}

/// URL of the list results fragment for a page and search term, loaded into
/// the view `view`.
#[must_use]
pub fn vehicles_results_url(page: u64, q: &str, view: ViewId) -> String {
    let query = form_urlencoded::Serializer::new(String::new())
        .append_pair("page", &page.to_string())
        .append_pair("q", q)
        .append_pair("view", &view.to_string())
        .finish();
    format!("/vehicles/results?{query}")
}

/// Link to another page of the list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageLink {
    /// Full page URL, also pushed to the history when loaded in place.
    pub href: String,
    /// Results fragment for the same page in the current view.
    pub fragment: String,
}

impl PageLink {
    fn new(page: u64, q: &str, view: ViewId) -> Self {
        Self {
            href: vehicles_url(page, q),
            fragment: vehicles_results_url(page, q, view),
        }
    }
}

/// Pagination view for templates.
///
/// A `None` link renders as a disabled button.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationView {
    /// Whether the controls are shown at all.
    pub visible: bool,
    /// "Page X of Y"
    pub label: String,
    pub previous: Option<PageLink>,
    pub next: Option<PageLink>,
}

impl PaginationView {
    /// Build the controls for a result page, keeping the search term in
    /// every link.
    #[must_use]
    pub fn new(summary: &PageSummary, q: &str, view: ViewId) -> Self {
        let previous =
            (!summary.is_first()).then(|| PageLink::new(summary.page.saturating_sub(1), q, view));
        let next = (!summary.is_last()).then(|| PageLink::new(summary.page + 1, q, view));

        Self {
            visible: summary.total_pages > 1,
            label: format!("Page {} of {}", summary.page, summary.total_pages),
            previous,
            next,
        }
    }
}
