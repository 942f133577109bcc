//! Vehicle list, details, and delete handlers.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tracing::instrument;

use vehicle_manager_core::{
    Vehicle, VehicleId, VehicleList, VehicleSummary,
    format::{color_name, format_long_date, format_number, format_price, web_color},
};

use super::{ErrorTemplate, LayoutView, NotFoundTemplate};
use crate::components::{PaginationView, vehicles_results_url};
use crate::error::AppError;
use crate::middleware::RequireSession;
use crate::models::set_flash;
use crate::query::{QueryKey, QueryObserver, QueryStatus, Resolution, ViewId};
use crate::state::AppState;

/// Notice shown on the dashboard after a delete.
const DELETED_NOTICE: &str = "Vehicle successfully deleted";

/// What one list view is following, and the last page it showed.
type VehiclesView = QueryObserver<QueryKey, VehicleList>;

// =============================================================================
// List
// =============================================================================

/// List query parameters. All are kept as raw strings so a malformed value
/// falls back to its default instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub q: Option<String>,
    /// View the results fragment loads into.
    pub view: Option<String>,
}

impl ListQuery {
    /// Page number, 1 when absent, malformed, or below 1.
    #[must_use]
    pub fn page(&self) -> u64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<u64>().ok())
            .filter(|&p| p >= 1)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn q(&self) -> &str {
        self.q.as_deref().unwrap_or_default()
    }

    /// View id carried by fragment requests.
    #[must_use]
    pub fn view(&self) -> Option<ViewId> {
        self.view.as_deref().and_then(|id| id.parse().ok())
    }

    fn key(&self) -> QueryKey {
        QueryKey::Vehicles {
            page: self.page(),
            q: self.q().to_string(),
        }
    }
}

/// Vehicle row view for templates.
#[derive(Debug, Clone)]
pub struct VehicleRowView {
    pub details_url: String,
    pub vrm: String,
    pub manufacturer: String,
    /// "model type"
    pub description: String,
    pub swatch: String,
    pub fuel: &'static str,
    pub price: String,
}

impl From<&VehicleSummary> for VehicleRowView {
    fn from(vehicle: &VehicleSummary) -> Self {
        Self {
            details_url: details_url(&vehicle.id),
            vrm: vehicle.vrm.clone(),
            manufacturer: vehicle.manufacturer.clone(),
            description: format!("{} {}", vehicle.model, vehicle.vehicle_type),
            swatch: web_color(&vehicle.color).to_string(),
            fuel: vehicle.fuel.label(),
            price: format_price(&vehicle.price),
        }
    }
}

/// One page of results.
#[derive(Debug, Clone)]
pub struct ListView {
    pub total: String,
    pub is_empty: bool,
    pub rows: Vec<VehicleRowView>,
    pub pagination: PaginationView,
}

impl ListView {
    fn new(list: &VehicleList, q: &str, view: ViewId) -> Self {
        Self {
            total: format_number(list.summary.total),
            is_empty: list.summary.total == 0,
            rows: list.vehicles.iter().map(VehicleRowView::from).collect(),
            pagination: PaginationView::new(&list.summary, q, view),
        }
    }
}

/// State of the results area, rendered by `vehicles/_results.html`.
#[derive(Debug, Clone)]
pub struct ResultsView {
    /// A request for the current key is still outstanding.
    pub loading: bool,
    /// `list` belongs to a previous page or search.
    pub stale: bool,
    /// Where htmx loads the results from once the area is on screen.
    pub fetch_url: Option<String>,
    pub list: Option<ListView>,
    pub error: Option<String>,
    pub retry_url: String,
}

impl ResultsView {
    /// Describe what the results area of view `id` shows for the observer's
    /// state.
    ///
    /// With `refetch` set, a settled result for the current key is shown but
    /// loaded again.
    fn new(view: &VehiclesView, id: ViewId, query: &ListQuery, refetch: bool) -> Self {
        let results_url = vehicles_results_url(query.page(), query.q(), id);
        let list = view.data().map(|list| ListView::new(list, query.q(), id));

        let (loading, error) = match view.status() {
            QueryStatus::Success => (refetch, None),
            QueryStatus::Error => (false, view.error().map(ToString::to_string)),
            QueryStatus::Idle | QueryStatus::Fetching => (true, None),
        };

        Self {
            loading,
            stale: view.is_placeholder(),
            fetch_url: loading.then(|| results_url.clone()),
            list: if error.is_some() { None } else { list },
            error,
            retry_url: results_url,
        }
    }
}

/// Vehicle list page template.
#[derive(Template, WebTemplate)]
#[template(path = "vehicles/index.html")]
pub struct ListTemplate {
    pub layout: LayoutView,
    pub page: u64,
    pub q: String,
    pub results: ResultsView,
}

/// Results fragment template (HTMX).
///
/// Also updates the page the search form submits, since pagination loads
/// other pages in place.
#[derive(Template, WebTemplate)]
#[template(path = "vehicles/results.html")]
pub struct ResultsTemplate {
    pub page: u64,
    pub results: ResultsView,
}

/// Vehicle list page handler.
///
/// Opens a new list view on the page and search from the URL. A cached
/// result renders straight away; otherwise the previous results (or a
/// skeleton) render and the results fragment loads the new ones.
///
/// GET /vehicles?page&q
#[instrument(skip(auth, state))]
pub async fn index(
    auth: RequireSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let layout = LayoutView::load(&state, &auth, "/vehicles").await;
    let key = query.key();

    let cached = state.queries().cached_vehicles(&auth.token, &key).await;
    let refetch = cached.is_none();

    let id = state.views().open(&auth.token).await;
    let results = state
        .views()
        .update(&auth.token, id, |view| {
            view.observe(key.clone());
            if let Some(list) = cached {
                view.resolve(&key, Ok(list));
            }
            ResultsView::new(view, id, &query, refetch)
        })
        .await;

    ListTemplate {
        layout,
        page: query.page(),
        q: query.q().to_string(),
        results,
    }
    .into_response()
}

/// Results fragment handler.
///
/// Returns 204 when the same view has moved to another page or search in the
/// meantime, so htmx leaves the newer results in place. Requests without a
/// known view load into a new one.
///
/// GET /vehicles/results?page&q&view
#[instrument(skip(auth, state))]
pub async fn results(
    auth: RequireSession,
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Response {
    let key = query.key();
    let id = match query.view() {
        Some(id) => id,
        None => state.views().open(&auth.token).await,
    };
    state
        .views()
        .update(&auth.token, id, |view| view.observe(key.clone()))
        .await;

    let api = auth.api(state.api());
    let result = state
        .queries()
        .vehicles(&api, query.page(), query.q())
        .await
        .map_err(|e| {
            tracing::warn!("Failed to load vehicles: {e}");
            e.to_string()
        });

    let results = state
        .views()
        .update(&auth.token, id, |view| match view.resolve(&key, result) {
            Resolution::Applied => Some(ResultsView::new(view, id, &query, false)),
            Resolution::Discarded => None,
        })
        .await;

    let Some(results) = results else {
        tracing::debug!("Discarding results for a superseded page");
        return StatusCode::NO_CONTENT.into_response();
    };

    ResultsTemplate {
        page: query.page(),
        results,
    }
    .into_response()
}

// =============================================================================
// Details
// =============================================================================

/// Details URL for a vehicle.
#[must_use]
pub fn details_url(id: &VehicleId) -> String {
    format!("/vehicles/details?id={}", urlencoding::encode(id.as_str()))
}

/// Details query parameters.
#[derive(Debug, Deserialize)]
pub struct DetailsQuery {
    pub id: Option<String>,
    /// `confirm` opens the delete confirmation dialog.
    pub delete: Option<String>,
}

/// Labelled detail row.
#[derive(Debug, Clone)]
pub struct FieldView {
    pub label: &'static str,
    pub value: String,
    pub swatch: Option<String>,
}

impl FieldView {
    fn text(label: &'static str, value: impl Into<String>) -> Self {
        Self {
            label,
            value: value.into(),
            swatch: None,
        }
    }
}

/// Vehicle details view for templates.
#[derive(Debug, Clone)]
pub struct VehicleDetailsView {
    pub id: String,
    pub vrm: String,
    /// "manufacturer model"
    pub description: String,
    pub fields: Vec<FieldView>,
    pub url: String,
    pub confirm_url: String,
}

impl From<&Vehicle> for VehicleDetailsView {
    fn from(vehicle: &Vehicle) -> Self {
        let url = details_url(&vehicle.id);
        let fields = vec![
            FieldView::text("Manufacturer", &vehicle.manufacturer),
            FieldView::text("Model", &vehicle.model),
            FieldView::text("Type", &vehicle.vehicle_type),
            FieldView::text("Fuel", vehicle.fuel.label()),
            FieldView {
                label: "Colour",
                value: color_name(&vehicle.color),
                swatch: Some(web_color(&vehicle.color).to_string()),
            },
            FieldView::text("Mileage", format_number(vehicle.mileage)),
            FieldView::text("Price", format_price(&vehicle.price)),
            FieldView::text("Registration date", format_long_date(vehicle.registration_date)),
            FieldView::text("VIN", &vehicle.vin),
        ];

        Self {
            id: vehicle.id.as_str().to_string(),
            vrm: vehicle.vrm.clone(),
            description: format!("{} {}", vehicle.manufacturer, vehicle.model),
            fields,
            confirm_url: format!("{url}&delete=confirm"),
            url,
        }
    }
}

/// Vehicle details page template.
#[derive(Template, WebTemplate)]
#[template(path = "vehicles/details.html")]
pub struct DetailsTemplate {
    pub layout: LayoutView,
    pub vehicle: VehicleDetailsView,
    pub confirm_delete: bool,
    pub delete_error: Option<String>,
}

/// Vehicle details page handler.
///
/// GET /vehicles/details?id[&delete=confirm]
#[instrument(skip(auth, state))]
pub async fn details(
    auth: RequireSession,
    State(state): State<AppState>,
    Query(query): Query<DetailsQuery>,
) -> Response {
    let Some(id) = query.id.filter(|id| !id.is_empty()).map(VehicleId::new) else {
        return (StatusCode::NOT_FOUND, NotFoundTemplate).into_response();
    };

    let layout = LayoutView::load(&state, &auth, "/vehicles/details").await;
    let api = auth.api(state.api());

    match state.queries().details(&api, &id).await {
        Ok(vehicle) => DetailsTemplate {
            layout,
            vehicle: VehicleDetailsView::from(&vehicle),
            confirm_delete: query.delete.as_deref() == Some("confirm"),
            delete_error: None,
        }
        .into_response(),
        Err(e) => {
            tracing::warn!("Failed to load vehicle: {e}");
            ErrorTemplate::for_query(layout, &e, details_url(&id))
        }
    }
}

/// Delete form.
#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub id: String,
}

/// Delete a vehicle after confirmation.
///
/// On failure the details page renders again with the dialog open.
///
/// POST /vehicles/delete
#[instrument(skip(auth, state, form), fields(vehicle_id = %form.id))]
pub async fn delete(
    auth: RequireSession,
    State(state): State<AppState>,
    Form(form): Form<DeleteForm>,
) -> Result<Response, AppError> {
    let id = VehicleId::new(form.id);
    let api = auth.api(state.api());

    match api.delete_vehicle(&id).await {
        Ok(()) => {
            set_flash(&auth.session, DELETED_NOTICE).await?;
            Ok(Redirect::to("/").into_response())
        }
        Err(delete_error) => {
            tracing::warn!("Failed to delete vehicle: {delete_error}");
            let layout = LayoutView::load(&state, &auth, "/vehicles/details").await;
            let vehicle = match state.queries().details(&api, &id).await {
                Ok(vehicle) => vehicle,
                Err(e) => return Ok(ErrorTemplate::for_query(layout, &e, details_url(&id))),
            };

            let page = DetailsTemplate {
                layout,
                vehicle: VehicleDetailsView::from(&vehicle),
                confirm_delete: true,
                delete_error: Some(delete_error.to_string()),
            };
            Ok((StatusCode::BAD_GATEWAY, page).into_response())
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::NaiveDate;
    use uuid::Uuid;
    use vehicle_manager_core::{FuelType, PageSummary, Price};

    use super::*;

    fn query(page: Option<&str>, q: Option<&str>) -> ListQuery {
        ListQuery {
            page: page.map(ToString::to_string),
            q: q.map(ToString::to_string),
            view: None,
        }
    }

    fn summary(id: &str) -> VehicleSummary {
        VehicleSummary {
            id: VehicleId::new(id),
            vrm: format!("VRM{id}"),
            manufacturer: "Ford".to_string(),
            model: "Focus".to_string(),
            vehicle_type: "Saloon".to_string(),
            color: "skyblue".to_string(),
            fuel: FuelType::Gasoline,
            price: Price::new("29999"),
        }
    }

    fn list(total: u64, page: u64) -> VehicleList {
        VehicleList {
            summary: PageSummary::new(total, page, 10),
            vehicles: vec![summary("1")],
        }
    }

    #[test]
    fn test_page_defaults_and_fallbacks() {
        assert_eq!(query(None, None).page(), 1);
        assert_eq!(query(Some("3"), None).page(), 3);
        assert_eq!(query(Some("0"), None).page(), 1);
        assert_eq!(query(Some("abc"), None).page(), 1);
        assert_eq!(query(Some("-2"), None).page(), 1);
        assert_eq!(query(None, None).q(), "");
    }

    #[test]
    fn test_view_id_is_parsed_leniently() {
        let mut q = query(Some("1"), None);
        assert!(q.view().is_none());

        q.view = Some("not-a-view".to_string());
        assert!(q.view().is_none());

        let id = Uuid::new_v4();
        q.view = Some(id.to_string());
        assert_eq!(q.view(), Some(id));
    }

    #[test]
    fn test_row_view_formats_columns() {
        let row = VehicleRowView::from(&summary("7"));
        assert_eq!(row.details_url, "/vehicles/details?id=7");
        assert_eq!(row.description, "Focus Saloon");
        assert_eq!(row.fuel, "Petrol");
        assert_eq!(row.price, "£29,999");
    }

    #[test]
    fn test_empty_list_view() {
        let empty = VehicleList {
            summary: PageSummary::new(0, 1, 10),
            vehicles: vec![],
        };
        let view = ListView::new(&empty, "nothing", Uuid::nil());
        assert!(view.is_empty);
        assert!(!view.pagination.visible);
    }

    #[test]
    fn test_results_skeleton_before_first_load() {
        let q = query(Some("1"), None);
        let mut view = VehiclesView::new(true);
        view.observe(q.key());

        let results = ResultsView::new(&view, Uuid::nil(), &q, true);
        assert!(results.loading);
        assert!(results.list.is_none());
        assert_eq!(
            results.fetch_url.as_deref(),
            Some("/vehicles/results?page=1&q=&view=00000000-0000-0000-0000-000000000000")
        );
    }

    #[test]
    fn test_results_keep_previous_page_while_loading() {
        let first = query(Some("1"), None);
        let second = query(Some("2"), None);
        let mut view = VehiclesView::new(true);
        view.observe(first.key());
        view.resolve(&first.key(), Ok(list(20, 1)));
        view.observe(second.key());

        let results = ResultsView::new(&view, Uuid::nil(), &second, true);
        assert!(results.loading);
        assert!(results.stale);
        assert_eq!(results.list.unwrap().pagination.label, "Page 1 of 2");
    }

    #[test]
    fn test_results_cached_hit_is_not_refetched() {
        let q = query(Some("1"), Some("ford"));
        let mut view = VehiclesView::new(true);
        view.observe(q.key());
        view.resolve(&q.key(), Ok(list(1, 1)));

        let results = ResultsView::new(&view, Uuid::nil(), &q, false);
        assert!(!results.loading);
        assert!(results.fetch_url.is_none());
        assert!(results.list.is_some());
    }

    #[test]
    fn test_results_error_hides_list() {
        let q = query(Some("1"), None);
        let mut view = VehiclesView::new(true);
        view.observe(q.key());
        view.resolve(&q.key(), Err("Request failed".to_string()));

        let results = ResultsView::new(&view, Uuid::nil(), &q, false);
        assert_eq!(results.error.as_deref(), Some("Request failed"));
        assert!(results.list.is_none());
        assert!(results.retry_url.starts_with("/vehicles/results?page=1&q=&view="));
    }

    #[test]
    fn test_details_view_fields() {
        let vehicle = Vehicle {
            id: VehicleId::new("42"),
            vrm: "AB12CDE".to_string(),
            manufacturer: "Ford".to_string(),
            model: "Focus".to_string(),
            vehicle_type: "Saloon".to_string(),
            fuel: FuelType::Diesel,
            color: "black".to_string(),
            vin: "VIN123".to_string(),
            mileage: 10000,
            registration_date: NaiveDate::from_ymd_opt(2021, 1, 1).unwrap(),
            price: Price::new("29999"),
        };
        let view = VehicleDetailsView::from(&vehicle);

        assert_eq!(view.description, "Ford Focus");
        assert_eq!(view.confirm_url, "/vehicles/details?id=42&delete=confirm");
        let labels: Vec<&str> = view.fields.iter().map(|f| f.label).collect();
        assert_eq!(
            labels,
            vec![
                "Manufacturer",
                "Model",
                "Type",
                "Fuel",
                "Colour",
                "Mileage",
                "Price",
                "Registration date",
                "VIN"
            ]
        );
        let values: Vec<&str> = view.fields.iter().map(|f| f.value.as_str()).collect();
        assert_eq!(values[3], "Diesel");
        assert_eq!(values[4], "Black");
        assert_eq!(values[5], "10,000");
        assert_eq!(values[6], "£29,999");
        assert_eq!(values[7], "1 January 2021");
    }

    #[test]
    fn test_details_url_encodes_id() {
        assert_eq!(details_url(&VehicleId::new("a b")), "/vehicles/details?id=a%20b");
    }
}
