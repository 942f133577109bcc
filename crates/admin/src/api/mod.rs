//! Typed client for the vehicle REST API.
//!
//! # Architecture
//!
//! - One method per backend operation, each returning the parsed entity or an
//!   [`ApiError`]
//! - No retries and no client-side timeouts; recovery is user-triggered
//! - Private operations go through [`AuthedApi`], which sends the session
//!   token as a bearer credential
//!
//! # Example
//!
//! ```rust,ignore
//! let client = ApiClient::new(config.api_url.clone());
//! let token = client.login("jane.doe@company.com", &password).await?;
//!
//! let api = client.with_token(token);
//! let page = api.list_vehicles(1, "ford").await?;
//! ```

mod error;

pub use error::ApiError;

use std::sync::Arc;

use reqwest::{Method, RequestBuilder};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use url::Url;

use vehicle_manager_core::{
    ChartKind, ChartPoint, SessionToken, Summary, User, Vehicle, VehicleFormData, VehicleId,
    VehicleList,
};

/// Client for the vehicle REST API.
///
/// Cheaply cloneable; all clones share one connection pool.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    token: SessionToken,
}

/// The only field the create endpoint is required to return.
#[derive(Deserialize)]
struct Created {
    id: VehicleId,
}

impl ApiClient {
    /// Create a client for the API rooted at `base_url`.
    #[must_use]
    pub fn new(base_url: Url) -> Self {
        Self {
            inner: Arc::new(ApiClientInner {
                client: reqwest::Client::new(),
                base_url,
            }),
        }
    }

    /// Base URL every request path is resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Scope this client to a signed-in session.
    #[must_use]
    pub fn with_token(&self, token: SessionToken) -> AuthedApi {
        AuthedApi {
            client: self.clone(),
            token,
        }
    }

    /// Exchange credentials for a session token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 401 for wrong credentials, or a
    /// transport/parse error.
    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<SessionToken, ApiError> {
        let url = self.url(&["login"])?;
        let credentials = Credentials {
            email,
            password: password.expose_secret(),
        };
        let body = self
            .send(Method::POST, url.clone(), None, |request| request.json(&credentials))
            .await?;
        let response: LoginResponse = parse(url, &body)?;
        Ok(response.token)
    }

    /// Resolve path segments against the base URL, percent-encoding each one.
    fn url(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidBaseUrl(self.inner.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Issue a request and return the body of a successful response.
    async fn send(
        &self,
        method: Method,
        url: Url,
        token: Option<&SessionToken>,
        configure: impl FnOnce(RequestBuilder) -> RequestBuilder,
    ) -> Result<String, ApiError> {
        let mut request = self.inner.client.request(method.clone(), url.clone());
        if let Some(token) = token {
            request = request.bearer_auth(token.as_str());
        }

        let response = configure(request).send().await?;
        let status = response.status();

        if !status.is_success() {
            tracing::warn!(%status, %method, %url, "Vehicle API returned non-success status");
            return Err(ApiError::Status {
                status,
                method,
                url,
            });
        }

        Ok(response.text().await?)
    }
}

fn parse<T: DeserializeOwned>(url: Url, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|source| {
        tracing::error!(
            error = %source,
            url = %url,
            body = %body.chars().take(500).collect::<String>(),
            "Failed to parse vehicle API response"
        );
        ApiError::Parse { url, source }
    })
}

/// API operations that require a signed-in user.
#[derive(Clone)]
pub struct AuthedApi {
    client: ApiClient,
    token: SessionToken,
}

impl AuthedApi {
    /// The session token requests are sent with.
    #[must_use]
    pub const fn token(&self) -> &SessionToken {
        &self.token
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        let body = self
            .client
            .send(Method::GET, url.clone(), Some(&self.token), |request| request)
            .await?;
        parse(url, &body)
    }

    /// Profile of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self))]
    pub async fn current_user(&self) -> Result<User, ApiError> {
        self.get(self.client.url(&["me"])?).await
    }

    /// Aggregate stock counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn summary(&self) -> Result<Summary, ApiError> {
        self.get(self.client.url(&["summary"])?).await
    }

    /// One chart series.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn chart(&self, kind: ChartKind) -> Result<Vec<ChartPoint>, ApiError> {
        let mut url = self.client.url(&["chart"])?;
        url.query_pairs_mut().append_pair("type", kind.as_str());
        self.get(url).await
    }

    /// One page of vehicles matching `q`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn list_vehicles(&self, page: u64, q: &str) -> Result<VehicleList, ApiError> {
        let mut url = self.client.url(&["vehicles"])?;
        url.query_pairs_mut()
            .append_pair("page", &page.to_string())
            .append_pair("q", q);
        let list: VehicleList = self.get(url).await?;

        if !list.summary.is_consistent() {
            tracing::warn!(
                total = list.summary.total,
                total_pages = list.summary.total_pages,
                page_size = list.summary.page_size,
                "Vehicle API returned inconsistent pagination metadata"
            );
        }
        Ok(list)
    }

    /// A single vehicle.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Status` with 404 when the vehicle does not exist.
    #[instrument(skip(self), fields(vehicle_id = %id))]
    pub async fn vehicle(&self, id: &VehicleId) -> Result<Vehicle, ApiError> {
        self.get(self.client.url(&["vehicles", id.as_str()])?).await
    }

    /// Create a vehicle and return its identifier.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response has no `id`.
    #[instrument(skip(self, form), fields(vrm = %form.vrm))]
    pub async fn create_vehicle(&self, form: &VehicleFormData) -> Result<VehicleId, ApiError> {
        let url = self.client.url(&["vehicles"])?;
        let body = self
            .client
            .send(Method::POST, url.clone(), Some(&self.token), |request| {
                request.json(form)
            })
            .await?;
        let created: Created = parse(url, &body)?;
        tracing::info!(vehicle_id = %created.id, "Vehicle created");
        Ok(created.id)
    }

    /// Delete a vehicle. The response body is ignored.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(vehicle_id = %id))]
    pub async fn delete_vehicle(&self, id: &VehicleId) -> Result<(), ApiError> {
        let url = self.client.url(&["vehicles", id.as_str()])?;
        self.client
            .send(Method::DELETE, url, Some(&self.token), |request| request)
            .await?;
        tracing::info!("Vehicle deleted");
        Ok(())
    }

    /// Known manufacturers, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn manufacturers(&self) -> Result<Vec<String>, ApiError> {
        self.options("manufacturers").await
    }

    /// Known models, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn models(&self) -> Result<Vec<String>, ApiError> {
        self.options("models").await
    }

    /// Known body types, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn types(&self) -> Result<Vec<String>, ApiError> {
        self.options("types").await
    }

    /// Known colours, sorted.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn colors(&self) -> Result<Vec<String>, ApiError> {
        self.options("colors").await
    }

    #[instrument(skip(self))]
    async fn options(&self, resource: &str) -> Result<Vec<String>, ApiError> {
        self.get(self.client.url(&[resource])?).await
    }
}
