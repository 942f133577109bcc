//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                       - Health check
//!
//! # Dashboard
//! GET  /                             - Stock statistics and charts
//!
//! # Vehicles
//! GET  /vehicles?page&q              - List shell (search, last results)
//! GET  /vehicles/results?page&q      - List results fragment (HTMX)
//! GET  /vehicles/details?id          - Vehicle details
//! GET  /vehicles/details?id&delete=confirm - Details with delete confirmation
//! POST /vehicles/delete              - Delete a vehicle
//!
//! # Create
//! GET  /add                          - Create form
//! POST /add                          - Create a vehicle
//!
//! # Auth
//! GET  /login?to                     - Login page
//! POST /login                        - Login action
//! POST /logout                       - Logout
//! ```

pub mod add;
pub mod auth;
pub mod dashboard;
pub mod vehicles;

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Router,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};

use crate::middleware::RequireSession;
use crate::models::take_flash;
use crate::query::QueryError;
use crate::state::AppState;

/// Signed-in user shown in the header.
#[derive(Debug, Clone)]
pub struct UserView {
    pub name: String,
    pub email: String,
    pub avatar: String,
}

/// Navigation entry.
#[derive(Debug, Clone)]
pub struct NavItem {
    pub href: &'static str,
    pub label: &'static str,
    pub active: bool,
}

const NAV: [(&str, &str); 3] = [("/", "Home"), ("/vehicles", "Vehicles"), ("/add", "Add Vehicle")];

/// Data shared by every page of the signed-in layout.
#[derive(Debug, Clone)]
pub struct LayoutView {
    pub nav: Vec<NavItem>,
    /// Absent when the current user could not be loaded.
    pub user: Option<UserView>,
    pub flash: Option<String>,
}

impl LayoutView {
    /// Build the layout for a page at `current_path`.
    ///
    /// Takes any queued flash message and loads the current user through the
    /// query cache. A failed user lookup only hides the user menu.
    pub async fn load(state: &AppState, auth: &RequireSession, current_path: &str) -> Self {
        let api = auth.api(state.api());
        let user = match state.queries().me(&api).await {
            Ok(user) => Some(UserView {
                name: user.name,
                email: user.email,
                avatar: user.avatar,
            }),
            Err(e) => {
                tracing::warn!("Failed to load current user: {e}");
                None
            }
        };

        Self {
            nav: nav_items(current_path),
            user,
            flash: take_flash(&auth.session).await,
        }
    }
}

fn nav_items(current_path: &str) -> Vec<NavItem> {
    NAV.iter()
        .map(|&(href, label)| NavItem {
            href,
            label,
            active: href == current_path,
        })
        .collect()
}

/// Full-page error with a retry action.
#[derive(Template, WebTemplate)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub layout: LayoutView,
    pub message: String,
    pub retry_url: String,
}

impl ErrorTemplate {
    /// Render a failed query, reporting upstream 404s as 404.
    pub fn for_query(layout: LayoutView, error: &QueryError, retry_url: impl Into<String>) -> Response {
        let status = if error.is_not_found() {
            StatusCode::NOT_FOUND
        } else {
            StatusCode::BAD_GATEWAY
        };
        let page = Self {
            layout,
            message: error.to_string(),
            retry_url: retry_url.into(),
        };
        (status, page).into_response()
    }
}

/// "404: Not found" page.
#[derive(Template, WebTemplate)]
#[template(path = "not_found.html")]
pub struct NotFoundTemplate;

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, NotFoundTemplate)
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check the API.
pub async fn health() -> &'static str {
    "ok"
}

/// Create the vehicle routes router.
pub fn vehicle_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(vehicles::index))
        .route("/results", get(vehicles::results))
        .route("/details", get(vehicles::details))
        .route("/delete", post(vehicles::delete))
}

/// Create all routes for the panel.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        // Dashboard
        .route("/", get(dashboard::dashboard))
        // Vehicles
        .nest("/vehicles", vehicle_routes())
        // Create form
        .route("/add", get(add::add_page).post(add::create))
        // Auth
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/logout", post(auth::logout))
        .fallback(not_found)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nav_marks_current_path() {
        let items = nav_items("/vehicles");
        let active: Vec<&str> = items.iter().filter(|i| i.active).map(|i| i.label).collect();
        assert_eq!(active, vec!["Vehicles"]);
    }

    #[test]
    fn test_nav_unknown_path_has_no_active_item() {
        assert!(nav_items("/vehicles/details").iter().all(|i| !i.active));
    }
}
