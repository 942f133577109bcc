//! Application configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `VM_API_URL` - Base URL of the vehicle REST API
//!
//! ## Optional
//! - `VM_HOST` - Bind address (default: 127.0.0.1)
//! - `VM_PORT` - Listen port (default: 3000)
//! - `VM_BASE_URL` - Public URL of the panel (default: <http://localhost:3000>)
//! - `VM_CACHE_CAPACITY` - Maximum number of cached query results (default: 1000)
//! - `VM_CACHE_STALE_SECS` - How long list, details, and dashboard results stay
//!   fresh (default: 0, refetch on every navigation)
//! - `VM_LOG_JSON` - Emit JSON logs when set to `1` or `true`
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)
//!
//! ## Optional (TLS)
//! - `VM_TLS_CERT` - PEM-encoded certificate chain
//! - `VM_TLS_KEY` - PEM-encoded private key

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_PORT: u16 = 3000;
const DEFAULT_BASE_URL: &str = "http://localhost:3000";
const DEFAULT_CACHE_CAPACITY: u64 = 1000;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Base URL of the vehicle API, always ending in `/`
    pub api_url: Url,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL of the panel
    pub base_url: String,
    /// Query cache settings
    pub cache: CacheConfig,
    /// Emit JSON-formatted logs
    pub log_json: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
    /// TLS configuration for HTTPS (optional)
    pub tls: Option<TlsConfig>,
}

/// Query cache settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Maximum number of cached entries across all sessions
    pub capacity: u64,
    /// Freshness window for everything except the current user
    pub stale_after: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CACHE_CAPACITY,
            stale_after: Duration::ZERO,
        }
    }
}

/// TLS configuration for HTTPS.
#[derive(Clone)]
pub struct TlsConfig {
    /// PEM-encoded certificate chain
    pub cert_pem: String,
    /// PEM-encoded private key
    pub key_pem: SecretString,
}

impl std::fmt::Debug for TlsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TlsConfig")
            .field("cert_pem", &"[CERTIFICATE]")
            .field("key_pem", &"[REDACTED]")
            .finish()
    }
}

impl TlsConfig {
    fn from_lookup(env: &Lookup<'_>) -> Result<Option<Self>, ConfigError> {
        match (env("VM_TLS_CERT"), env("VM_TLS_KEY")) {
            (Some(cert), Some(key)) => Ok(Some(Self {
                cert_pem: cert,
                key_pem: SecretString::from(key),
            })),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "VM_TLS_*".to_string(),
                "Both VM_TLS_CERT and VM_TLS_KEY must be set together".to_string(),
            )),
        }
    }
}

type Lookup<'a> = dyn Fn(&str) -> Option<String> + 'a;

impl AppConfig {
    /// Configuration with defaults for everything but the API location.
    #[must_use]
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url: normalize_base_url(api_url),
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            base_url: DEFAULT_BASE_URL.to_string(),
            cache: CacheConfig::default(),
            log_json: false,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
            tls: None,
        }
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(env: &Lookup<'_>) -> Result<Self, ConfigError> {
        let required = |key: &str| env(key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()));
        let or_default =
            |key: &str, default: &str| env(key).unwrap_or_else(|| default.to_string());

        let api_url = required("VM_API_URL")?;
        let api_url = Url::parse(&api_url)
            .map_err(|e| ConfigError::InvalidEnvVar("VM_API_URL".to_string(), e.to_string()))?;
        if api_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "VM_API_URL".to_string(),
                "must be an absolute http(s) URL".to_string(),
            ));
        }

        let host = or_default("VM_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("VM_HOST".to_string(), e.to_string()))?;

        let port = or_default("VM_PORT", &DEFAULT_PORT.to_string())
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("VM_PORT".to_string(), e.to_string()))?;

        let base_url = or_default("VM_BASE_URL", DEFAULT_BASE_URL);

        let capacity = or_default("VM_CACHE_CAPACITY", &DEFAULT_CACHE_CAPACITY.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("VM_CACHE_CAPACITY".to_string(), e.to_string())
            })?;

        let stale_secs = or_default("VM_CACHE_STALE_SECS", "0")
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("VM_CACHE_STALE_SECS".to_string(), e.to_string())
            })?;

        let log_json = env("VM_LOG_JSON").is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true"));

        let sentry_dsn = env("SENTRY_DSN").filter(|dsn| !dsn.is_empty());
        let sentry_environment = env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        let tls = TlsConfig::from_lookup(env)?;

        Ok(Self {
            api_url: normalize_base_url(api_url),
            host,
            port,
            base_url,
            cache: CacheConfig {
                capacity,
                stale_after: Duration::from_secs(stale_secs),
            },
            log_json,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
            tls,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the panel is served over HTTPS (enables secure cookies).
    #[must_use]
    pub fn is_https(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

/// Ensure the path ends in `/` so relative joins append instead of replacing
/// the last segment.
fn normalize_base_url(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
