//! Session-related types.
//!
//! Everything the panel keeps per browser session lives here.

use tower_sessions::Session;

/// Session keys.
pub mod keys {
    /// Key for the API session token.
    pub const TOKEN: &str = "token";

    /// Key for a one-shot notice shown on the next rendered page.
    pub const FLASH: &str = "flash";
}

/// Queue a notice for the next rendered page.
///
/// # Errors
///
/// Returns an error if the session store fails.
pub async fn set_flash(session: &Session, message: &str) -> Result<(), tower_sessions::session::Error> {
    session.insert(keys::FLASH, message).await
}

/// Take the queued notice, if any.
pub async fn take_flash(session: &Session) -> Option<String> {
    session.remove::<String>(keys::FLASH).await.ok().flatten()
}
