//! Errors returned by the vehicle API client.

use reqwest::{Method, StatusCode};
use thiserror::Error;
use url::Url;

/// Errors that can occur when talking to the vehicle API.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, reset, ...).
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("Request failed with status code {status}: {method} {url}")]
    Status {
        status: StatusCode,
        method: Method,
        url: Url,
    },

    /// The response body did not have the expected shape.
    #[error("Invalid response from {url}: {source}")]
    Parse {
        url: Url,
        #[source]
        source: serde_json::Error,
    },

    /// The configured base URL cannot carry path segments.
    #[error("Invalid API base URL: {0}")]
    InvalidBaseUrl(Url),
}

impl ApiError {
    /// HTTP status of the response, when there was one.
    #[must_use]
    pub const fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the API reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    /// Whether the API rejected the credentials or token.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        self.status() == Some(StatusCode::UNAUTHORIZED)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_message() {
        let err = ApiError::Status {
            status: StatusCode::UNAUTHORIZED,
            method: Method::POST,
            url: Url::parse("http://api.local/login").unwrap(),
        };
        assert_eq!(
            err.to_string(),
            "Request failed with status code 401 Unauthorized: POST http://api.local/login"
        );
        assert!(err.is_unauthorized());
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_not_found() {
        let err = ApiError::Status {
            status: StatusCode::NOT_FOUND,
            method: Method::GET,
            url: Url::parse("http://api.local/vehicles/42").unwrap(),
        };
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn test_parse_error_has_no_status() {
        let source = serde_json::from_str::<u32>("nope").unwrap_err();
        let err = ApiError::Parse {
            url: Url::parse("http://api.local/summary").unwrap(),
            source,
        };
        assert_eq!(err.status(), None);
        assert!(err.to_string().starts_with("Invalid response from http://api.local/summary"));
    }
}
