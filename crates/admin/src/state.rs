//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use vehicle_manager_core::VehicleList;

use crate::api::ApiClient;
use crate::config::AppConfig;
use crate::middleware::session::SESSION_EXPIRY_SECONDS;
use crate::query::{QueryClient, QueryKey, ViewRegistry};

/// Observers of the open vehicle list views.
pub type VehicleViews = ViewRegistry<QueryKey, VehicleList>;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: AppConfig,
    api: ApiClient,
    queries: QueryClient,
    views: VehicleViews,
}

impl AppState {
    /// Create the state for a configuration.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let api = ApiClient::new(config.api_url.clone());
        let queries = QueryClient::new(config.cache);
        let views = VehicleViews::new(
            config.cache.capacity,
            Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs()),
            true,
        );

        Self {
            inner: Arc::new(AppStateInner {
                config,
                api,
                queries,
                views,
            }),
        }
    }

    /// Get a reference to the application configuration.
    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.inner.config
    }

    /// Get a reference to the vehicle API client.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    /// Get a reference to the shared query cache.
    #[must_use]
    pub fn queries(&self) -> &QueryClient {
        &self.inner.queries
    }

    /// Get a reference to the open list views.
    #[must_use]
    pub fn views(&self) -> &VehicleViews {
        &self.inner.views
    }
}
