//! Session middleware configuration.
//!
//! Sets up in-memory sessions using tower-sessions. The session only holds
//! the desk id and the persisted backend session; the desk itself lives in
//! the [`DeskStore`](crate::store::DeskStore).

use tower_sessions::{Expiry, MemoryStore, SessionManagerLayer};

use crate::config::DeskConfig;

/// Session cookie name.
pub const SESSION_COOKIE_NAME: &str = "proxima_desk_session";

/// Session expiry time in seconds (24 hours).
const SESSION_EXPIRY_SECONDS: i64 = 24 * 60 * 60;

/// Keys used in the session record.
pub mod session_keys {
    pub const DESK_ID: &str = "desk_id";
    pub const AUTH: &str = "auth";
}

/// Create the session layer with the in-memory store.
#[must_use]
pub fn create_session_layer(config: &DeskConfig) -> SessionManagerLayer<MemoryStore> {
    SessionManagerLayer::new(MemoryStore::default())
        .with_name(SESSION_COOKIE_NAME)
        .with_expiry(Expiry::OnInactivity(
            tower_sessions::cookie::time::Duration::seconds(SESSION_EXPIRY_SECONDS),
        ))
        .with_secure(config.is_secure())
        .with_same_site(tower_sessions::cookie::SameSite::Lax)
        .with_http_only(true)
        .with_path("/")
}
