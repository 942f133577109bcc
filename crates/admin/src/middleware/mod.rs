//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. `TraceLayer` (request tracing)
//! 3. Security headers
//! 4. Session layer (tower-sessions, in-memory store)
//! 5. Auth gate ([`RequireSession`] extractor on private handlers)

pub mod auth;
pub mod security_headers;
pub mod session;

pub use auth::{
    AuthRejection, RequireSession, clear_session, login_url, safe_return_path, set_session_token,
};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
