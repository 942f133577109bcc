//! Authentication gate.
//!
//! A session is authenticated iff it holds an API token. Private handlers take
//! [`RequireSession`]; unauthenticated page requests are redirected to the
//! login page with the original location in `to`, htmx fragment requests get
//! a 401 carrying an `HX-Redirect` header instead.

use axum::{
    extract::{FromRequestParts, OriginalUri},
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use tower_sessions::Session;

use vehicle_manager_core::SessionToken;

use crate::api::{ApiClient, AuthedApi};
use crate::models::session_keys;

/// Extractor that requires a signed-in session.
///
/// # Example
///
/// ```rust,ignore
/// async fn protected_handler(auth: RequireSession, State(state): State<AppState>) {
///     let api = auth.api(state.api());
///     let user = api.current_user().await?;
/// }
/// ```
pub struct RequireSession {
    pub session: Session,
    pub token: SessionToken,
}

impl RequireSession {
    /// API client scoped to this session.
    #[must_use]
    pub fn api(&self, client: &ApiClient) -> AuthedApi {
        client.with_token(self.token.clone())
    }
}

/// Rejection returned when the session is not signed in.
#[derive(Debug)]
pub enum AuthRejection {
    /// Redirect to the login page, returning to `to` afterwards.
    RedirectToLogin { to: String },
    /// Tell htmx to navigate to the login page.
    HtmxRedirect { to: String },
    /// The session layer is not installed.
    MissingSession,
}

impl IntoResponse for AuthRejection {
    fn into_response(self) -> Response {
        match self {
            Self::RedirectToLogin { to } => Redirect::to(&login_url(&to)).into_response(),
            Self::HtmxRedirect { to } => (
                StatusCode::UNAUTHORIZED,
                [("HX-Redirect", login_url(&to))],
            )
                .into_response(),
            Self::MissingSession => {
                tracing::error!("Session layer missing from router");
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            }
        }
    }
}

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = AuthRejection;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        // Get the session from extensions (set by SessionManagerLayer)
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or(AuthRejection::MissingSession)?;

        let token: Option<SessionToken> = session
            .get(session_keys::TOKEN)
            .await
            .unwrap_or_else(|e| {
                tracing::warn!("Failed to read session token: {e}");
                None
            });

        let Some(token) = token else {
            // Nested routers see the URI with their prefix stripped
            let uri = parts
                .extensions
                .get::<OriginalUri>()
                .map_or(&parts.uri, |original| &original.0);
            let to = uri
                .path_and_query()
                .map_or_else(|| "/".to_string(), ToString::to_string);
            let is_htmx = parts.headers.contains_key("HX-Request");
            return Err(if is_htmx {
                AuthRejection::HtmxRedirect { to }
            } else {
                AuthRejection::RedirectToLogin { to }
            });
        };

        Ok(Self { session, token })
    }
}

/// Login page URL that returns to `to` after signing in.
#[must_use]
pub fn login_url(to: &str) -> String {
    format!("/login?to={}", urlencoding::encode(to))
}

/// The post-login destination: `to` when it is a path on this site, `/`
/// otherwise.
#[must_use]
pub fn safe_return_path(to: Option<&str>) -> &str {
    match to {
        Some(path) if path.starts_with('/') && !path.starts_with("//") && !path.contains('\\') => {
            path
        }
        _ => "/",
    }
}

/// Store the token of a fresh login, rotating the session id.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_session_token(
    session: &Session,
    token: &SessionToken,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(session_keys::TOKEN, token).await
}

/// Forget everything about the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_session(session: &Session) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
