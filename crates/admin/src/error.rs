//! Unified error handling for the panel.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Application-level error type.
///
/// Failures the user can act on (an API error while loading a screen, a
/// rejected form) are rendered by the handlers themselves. This type covers
/// what is left, which is a broken session store.
#[derive(Debug, Error)]
pub enum AppError {
    /// Session store failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),
}

impl AppError {
    /// HTTP status this error is reported with.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Session(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log server errors with Sentry
        let event_id = sentry::capture_error(&self);
        tracing::error!(
            error = %self,
            sentry_event_id = %event_id,
            "Request error"
        );

        // Don't expose internal error details to clients
        (status, "Internal server error").into_response()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use axum::body::to_bytes;

    use super::*;

    fn session_error() -> AppError {
        AppError::Session(tower_sessions::session::Error::Store(
            tower_sessions::session_store::Error::Backend("store offline".to_string()),
        ))
    }

    #[test]
    fn test_app_error_display() {
        let message = session_error().to_string();
        assert!(message.starts_with("Session error: "));
        assert!(message.contains("store offline"));
    }

    #[tokio::test]
    async fn test_session_error_hides_details() {
        let response = session_error().into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"Internal server error");
    }
}
