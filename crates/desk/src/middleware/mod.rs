//! HTTP middleware stack for the desk.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Session layer (tower-sessions with the in-memory store)
//! 4. Security headers
//!
//! Handlers then take a [`CurrentDesk`] to act on the browser's desk.

pub mod desk;
pub mod security_headers;
pub mod session;

pub use desk::CurrentDesk;
pub use security_headers::security_headers_middleware;
pub use session::{SESSION_COOKIE_NAME, create_session_layer, session_keys};
