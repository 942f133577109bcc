//! Keyed cache of remote query results.
//!
//! Concurrent requests for the same key share a single API call. Successful
//! results stay cached for the configured freshness window, except the current
//! user, which stays cached for the whole session. Errors are never cached, so
//! a retry always reaches the API again.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use moka::Expiry;
use moka::future::Cache;
use thiserror::Error;
use tracing::{debug, instrument};

use vehicle_manager_core::{ChartKind, SessionToken, User, Vehicle, VehicleId, VehicleList};

use super::key::{AddOptions, CacheKey, CacheValue, HomeData, QueryKey};
use crate::api::{ApiError, AuthedApi};
use crate::config::CacheConfig;

/// Error surfaced by a query.
#[derive(Debug, Clone, Error)]
pub enum QueryError {
    /// The API call failed. Shared by every caller that joined it.
    #[error(transparent)]
    Api(#[from] Arc<ApiError>),

    /// The cache held a value of the wrong kind for the key.
    #[error("Cached value for {0:?} has an unexpected type")]
    Mismatch(QueryKey),
}

impl QueryError {
    /// Whether the API reported the resource as missing.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Api(err) if err.is_not_found())
    }
}

/// Per-entry freshness.
struct Freshness {
    stale_after: Duration,
}

impl Expiry<CacheKey, CacheValue> for Freshness {
    fn expire_after_create(
        &self,
        key: &CacheKey,
        _value: &CacheValue,
        _created_at: Instant,
    ) -> Option<Duration> {
        match key.query {
            QueryKey::Me => None,
            _ => Some(self.stale_after),
        }
    }
}

/// Session-scoped, deduplicating cache in front of [`AuthedApi`].
#[derive(Clone)]
pub struct QueryClient {
    cache: Cache<CacheKey, CacheValue>,
}

impl QueryClient {
    /// Create an empty cache.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        let cache = Cache::builder()
            .max_capacity(config.capacity)
            .expire_after(Freshness {
                stale_after: config.stale_after,
            })
            .support_invalidation_closures()
            .build();

        Self { cache }
    }

    /// Run `fetch` for `key`, or join the call already in flight for it.
    ///
    /// A fresh cached value is returned without calling `fetch` at all.
    ///
    /// # Errors
    ///
    /// Returns the API error of the shared call.
    pub async fn fetch<F>(
        &self,
        scope: &SessionToken,
        key: QueryKey,
        fetch: F,
    ) -> Result<CacheValue, QueryError>
    where
        F: Future<Output = Result<CacheValue, ApiError>>,
    {
        let cache_key = CacheKey {
            scope: scope.clone(),
            query: key,
        };
        Ok(self.cache.try_get_with(cache_key, fetch).await?)
    }

    /// A fresh cached value for `key`, without fetching.
    pub async fn peek(&self, scope: &SessionToken, key: &QueryKey) -> Option<CacheValue> {
        let cache_key = CacheKey {
            scope: scope.clone(),
            query: key.clone(),
        };
        self.cache.get(&cache_key).await
    }

    /// Drop every entry belonging to a session.
    pub fn clear_scope(&self, scope: &SessionToken) {
        let scope = scope.clone();
        if let Err(e) = self
            .cache
            .invalidate_entries_if(move |key, _| key.scope == scope)
        {
            tracing::error!("Failed to clear cached queries for session: {e}");
        }
    }

    // =========================================================================
    // Typed queries
    // =========================================================================

    /// The signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self, api))]
    pub async fn me(&self, api: &AuthedApi) -> Result<User, QueryError> {
        let key = QueryKey::Me;
        let value = self
            .fetch(api.token(), key.clone(), async {
                Ok(CacheValue::Me(api.current_user().await?))
            })
            .await?;
        match value {
            CacheValue::Me(user) => Ok(user),
            _ => Err(QueryError::Mismatch(key)),
        }
    }

    /// Dashboard data. All four sources must succeed.
    ///
    /// # Errors
    ///
    /// Returns the first API error among the four calls.
    #[instrument(skip(self, api))]
    pub async fn home(&self, api: &AuthedApi) -> Result<HomeData, QueryError> {
        let key = QueryKey::Home;
        let value = self
            .fetch(api.token(), key.clone(), async {
                let (summary, fuel_types, oems, registration_years) = tokio::try_join!(
                    api.summary(),
                    api.chart(ChartKind::FuelType),
                    api.chart(ChartKind::Oem),
                    api.chart(ChartKind::RegistrationYear),
                )?;
                Ok(CacheValue::Home(Box::new(HomeData {
                    summary,
                    fuel_types,
                    oems,
                    registration_years,
                })))
            })
            .await?;
        match value {
            CacheValue::Home(home) => Ok(*home),
            _ => Err(QueryError::Mismatch(key)),
        }
    }

    /// One page of the vehicle list.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails.
    #[instrument(skip(self, api))]
    pub async fn vehicles(
        &self,
        api: &AuthedApi,
        page: u64,
        q: &str,
    ) -> Result<VehicleList, QueryError> {
        let key = QueryKey::Vehicles {
            page,
            q: q.to_string(),
        };
        let value = self
            .fetch(api.token(), key.clone(), async {
                Ok(CacheValue::Vehicles(api.list_vehicles(page, q).await?))
            })
            .await?;
        match value {
            CacheValue::Vehicles(list) => Ok(list),
            _ => Err(QueryError::Mismatch(key)),
        }
    }

    /// A fresh cached page of the vehicle list, if there is one.
    pub async fn cached_vehicles(
        &self,
        scope: &SessionToken,
        key: &QueryKey,
    ) -> Option<VehicleList> {
        match self.peek(scope, key).await {
            Some(CacheValue::Vehicles(list)) => {
                debug!("Cache hit for vehicle list");
                Some(list)
            }
            _ => None,
        }
    }

    /// One vehicle.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails, including 404 for a missing id.
    #[instrument(skip(self, api), fields(vehicle_id = %id))]
    pub async fn details(&self, api: &AuthedApi, id: &VehicleId) -> Result<Vehicle, QueryError> {
        let key = QueryKey::Details { id: id.clone() };
        let value = self
            .fetch(api.token(), key.clone(), async {
                Ok(CacheValue::Details(Box::new(api.vehicle(id).await?)))
            })
            .await?;
        match value {
            CacheValue::Details(vehicle) => Ok(*vehicle),
            _ => Err(QueryError::Mismatch(key)),
        }
    }

    /// Option lists for the create form. All four must succeed.
    ///
    /// # Errors
    ///
    /// Returns the first API error among the four calls.
    #[instrument(skip(self, api))]
    pub async fn add_options(&self, api: &AuthedApi) -> Result<AddOptions, QueryError> {
        let key = QueryKey::AddOptions;
        let value = self
            .fetch(api.token(), key.clone(), async {
                let (manufacturers, models, types, colors) = tokio::try_join!(
                    api.manufacturers(),
                    api.models(),
                    api.types(),
                    api.colors(),
                )?;
                Ok(CacheValue::AddOptions(AddOptions {
                    manufacturers,
                    models,
                    types,
                    colors,
                }))
            })
            .await?;
        match value {
            CacheValue::AddOptions(options) => Ok(options),
            _ => Err(QueryError::Mismatch(key)),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use reqwest::{Method, StatusCode};
    use url::Url;
    use vehicle_manager_core::UserId;

    use super::*;

    fn user(name: &str) -> User {
        User {
            id: UserId::new("1"),
            name: name.to_string(),
            email: "jane.doe@company.com".to_string(),
            avatar: "https://example.com/avatar.png".to_string(),
        }
    }

    fn not_found() -> ApiError {
        ApiError::Status {
            status: StatusCode::NOT_FOUND,
            method: Method::GET,
            url: Url::parse("http://api.local/vehicles/9").unwrap(),
        }
    }

    fn client(stale_after: Duration) -> QueryClient {
        QueryClient::new(CacheConfig {
            capacity: 100,
            stale_after,
        })
    }

    async fn counted(calls: &AtomicUsize, name: &str) -> Result<CacheValue, ApiError> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(CacheValue::Me(user(name)))
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let queries = client(Duration::ZERO);
        let token = SessionToken::new("token");
        let calls = AtomicUsize::new(0);

        let (a, b) = tokio::join!(
            queries.fetch(&token, QueryKey::Home, counted(&calls, "a")),
            queries.fetch(&token, QueryKey::Home, counted(&calls, "b")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(a.is_ok());
        assert!(b.is_ok());
    }

    #[tokio::test]
    async fn test_different_keys_fetch_separately() {
        let queries = client(Duration::ZERO);
        let token = SessionToken::new("token");
        let calls = AtomicUsize::new(0);

        let page_one = QueryKey::Vehicles {
            page: 1,
            q: String::new(),
        };
        let page_two = QueryKey::Vehicles {
            page: 2,
            q: String::new(),
        };
        let (a, b) = tokio::join!(
            queries.fetch(&token, page_one, counted(&calls, "a")),
            queries.fetch(&token, page_two, counted(&calls, "b")),
        );

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(a.is_ok() && b.is_ok());
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_entries() {
        let queries = client(Duration::from_secs(60));
        let calls = AtomicUsize::new(0);

        queries
            .fetch(&SessionToken::new("a"), QueryKey::Home, counted(&calls, "a"))
            .await
            .unwrap();
        queries
            .fetch(&SessionToken::new("b"), QueryKey::Home, counted(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let queries = client(Duration::from_secs(60));
        let token = SessionToken::new("token");
        let key = QueryKey::Details {
            id: VehicleId::new("9"),
        };

        let first = queries
            .fetch(&token, key.clone(), async { Err(not_found()) })
            .await;
        assert!(first.unwrap_err().is_not_found());

        let calls = AtomicUsize::new(0);
        let second = queries.fetch(&token, key, counted(&calls, "retry")).await;
        assert!(second.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_zero_freshness_refetches_after_completion() {
        let queries = client(Duration::ZERO);
        let token = SessionToken::new("token");
        let calls = AtomicUsize::new(0);

        queries
            .fetch(&token, QueryKey::Home, counted(&calls, "a"))
            .await
            .unwrap();
        queries
            .fetch(&token, QueryKey::Home, counted(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_current_user_never_goes_stale() {
        let queries = client(Duration::ZERO);
        let token = SessionToken::new("token");
        let calls = AtomicUsize::new(0);

        queries
            .fetch(&token, QueryKey::Me, counted(&calls, "a"))
            .await
            .unwrap();
        let second = queries
            .fetch(&token, QueryKey::Me, counted(&calls, "b"))
            .await
            .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(second, CacheValue::Me(ref u) if u.name == "a"));
    }

    #[tokio::test]
    async fn test_clear_scope_drops_session_entries() {
        let queries = client(Duration::from_secs(60));
        let token = SessionToken::new("token");
        let other = SessionToken::new("other");
        let calls = AtomicUsize::new(0);

        queries
            .fetch(&token, QueryKey::Me, counted(&calls, "a"))
            .await
            .unwrap();
        queries
            .fetch(&other, QueryKey::Me, counted(&calls, "b"))
            .await
            .unwrap();

        queries.clear_scope(&token);

        assert!(queries.peek(&token, &QueryKey::Me).await.is_none());
        assert!(queries.peek(&other, &QueryKey::Me).await.is_some());
    }

    #[tokio::test]
    async fn test_cached_vehicles_ignores_other_kinds() {
        let queries = client(Duration::from_secs(60));
        let token = SessionToken::new("token");
        let key = QueryKey::Vehicles {
            page: 1,
            q: String::new(),
        };
        queries
            .fetch(&token, key.clone(), async { Ok(CacheValue::Me(user("x"))) })
            .await
            .unwrap();

        assert!(queries.cached_vehicles(&token, &key).await.is_none());
    }
}
