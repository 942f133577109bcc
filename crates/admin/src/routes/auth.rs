//! Login and logout.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use secrecy::SecretString;
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use vehicle_manager_core::SessionToken;

use crate::error::AppError;
use crate::middleware::{clear_session, safe_return_path, set_session_token};
use crate::models::session_keys;
use crate::state::AppState;

/// Query parameters of the login page.
#[derive(Debug, Deserialize)]
pub struct LoginQuery {
    pub to: Option<String>,
}

/// Submitted login form.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
    /// Where to go after signing in, carried through a hidden input.
    #[serde(default)]
    pub to: String,
}

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub email: String,
    pub to: String,
    pub error: Option<String>,
}

async fn session_token(session: &Session) -> Option<SessionToken> {
    session
        .get::<SessionToken>(session_keys::TOKEN)
        .await
        .ok()
        .flatten()
}

/// Render the login page.
///
/// GET /login?to
#[instrument(skip(session))]
pub async fn login_page(session: Session, Query(query): Query<LoginQuery>) -> Response {
    let to = safe_return_path(query.to.as_deref()).to_string();

    if session_token(&session).await.is_some() {
        return Redirect::to(&to).into_response();
    }

    LoginTemplate {
        email: String::new(),
        to,
        error: None,
    }
    .into_response()
}

/// Exchange credentials for an API token.
///
/// POST /login
#[instrument(skip(state, session, form), fields(email = %form.email))]
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let to = safe_return_path(Some(&form.to)).to_string();
    let password = SecretString::from(form.password);

    match state.api().login(form.email.trim(), &password).await {
        Ok(token) => {
            set_session_token(&session, &token).await?;
            tracing::info!("User signed in");
            Ok(Redirect::to(&to).into_response())
        }
        Err(e) => {
            let status = if e.is_unauthorized() {
                tracing::info!("Login rejected: {e}");
                StatusCode::UNAUTHORIZED
            } else {
                tracing::warn!("Login failed: {e}");
                StatusCode::BAD_GATEWAY
            };
            let page = LoginTemplate {
                email: form.email,
                to,
                error: Some(e.to_string()),
            };
            Ok((status, page).into_response())
        }
    }
}

/// Sign out, forgetting everything held for the session.
///
/// POST /logout
#[instrument(skip(state, session))]
pub async fn logout(State(state): State<AppState>, session: Session) -> Result<Redirect, AppError> {
    if let Some(token) = session_token(&session).await {
        state.queries().clear_scope(&token);
        state.views().clear_scope(&token).await;
    }
    clear_session(&session).await?;

    Ok(Redirect::to("/login"))
}
