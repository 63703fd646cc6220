//! Remote data gateway: auth plus generic table operations.
//!
//! This module provides:
//! - [`Gateway`], the object-safe interface every handler goes through
//! - [`SupabaseGateway`] for the hosted backend
//! - [`MemoryGateway`] for tests and local demos
//! - [`tables`], typed operations on the four tables
//!
//! The backend's row-level security is the trust boundary; nothing here
//! enforces permissions.

mod client;
mod error;
mod memory;
mod query;
pub mod tables;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use proxima_core::{Email, Identity, Role};

pub use client::SupabaseGateway;
pub use error::GatewayError;
pub use memory::{MemoryGateway, Operation};
pub use query::{EqFilter, Order, Table, TableQuery};

/// Seconds before expiry at which an access token is refreshed.
const REFRESH_MARGIN_SECONDS: i64 = 30;

/// An authenticated backend session.
#[derive(Clone)]
pub struct AuthSession {
    pub access_token: SecretString,
    pub refresh_token: SecretString,
    pub expires_at: DateTime<Utc>,
    pub identity: Identity,
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish()
    }
}

impl AuthSession {
    /// Whether the access token should be refreshed before use.
    #[must_use]
    pub fn needs_refresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(REFRESH_MARGIN_SECONDS) <= now
    }

    /// Session-store representation.
    #[must_use]
    pub fn persist(&self) -> PersistedSession {
        PersistedSession {
            access_token: self.access_token.expose_secret().to_string(),
            refresh_token: self.refresh_token.expose_secret().to_string(),
            expires_at: self.expires_at,
            identity: self.identity.clone(),
        }
    }
}

/// [`AuthSession`] as kept in the browser's server-side session record.
#[derive(Clone, Serialize, Deserialize)]
pub struct PersistedSession {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
    identity: Identity,
}

impl std::fmt::Debug for PersistedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PersistedSession")
            .field("expires_at", &self.expires_at)
            .field("identity", &self.identity)
            .finish_non_exhaustive()
    }
}

impl From<PersistedSession> for AuthSession {
    fn from(p: PersistedSession) -> Self {
        Self {
            access_token: SecretString::from(p.access_token),
            refresh_token: SecretString::from(p.refresh_token),
            expires_at: p.expires_at,
            identity: p.identity,
        }
    }
}

/// User metadata attached on sign-up; the backend turns it into a profile.
#[derive(Debug, Clone, Serialize)]
pub struct SignUpProfile {
    pub name: String,
    pub role: Role,
}

/// Backend operations used by the desk.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Password sign-in. Rejected credentials are [`GatewayError::Auth`].
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError>;

    /// Register a new account.
    ///
    /// Returns the new account's session, or `None` when the backend wants
    /// the address confirmed first.
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<Option<AuthSession>, GatewayError>;

    async fn sign_out(&self, session: &AuthSession) -> Result<(), GatewayError>;

    /// Validate a stored session, refreshing it if expired.
    ///
    /// `None` means the session is gone and the viewer must sign in again.
    async fn current_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError>;

    /// Exchange the refresh token for a new session, whatever the access
    /// token's state.
    ///
    /// `None` means the refresh token was rejected.
    async fn refresh_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError>;

    async fn select(
        &self,
        session: &AuthSession,
        query: &TableQuery,
    ) -> Result<Vec<Value>, GatewayError>;

    /// Insert rows and return them as stored.
    async fn insert(
        &self,
        session: &AuthSession,
        table: Table,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, GatewayError>;

    /// Merge `patch` into every row matching the query's filters.
    async fn update(
        &self,
        session: &AuthSession,
        query: &TableQuery,
        patch: Value,
    ) -> Result<(), GatewayError>;

    async fn delete(&self, session: &AuthSession, query: &TableQuery) -> Result<(), GatewayError>;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proxima_core::UserId;

    fn session(expires_at: DateTime<Utc>) -> AuthSession {
        AuthSession {
            access_token: SecretString::from("access-abc"),
            refresh_token: SecretString::from("refresh-def"),
            expires_at,
            identity: Identity {
                user_id: UserId::random(),
                email: "sam@proxima.services".to_string(),
            },
        }
    }

    #[test]
    fn test_needs_refresh_inside_margin() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap();
        assert!(session(now + Duration::seconds(10)).needs_refresh(now));
        assert!(session(now - Duration::hours(1)).needs_refresh(now));
        assert!(!session(now + Duration::hours(1)).needs_refresh(now));
    }

    #[test]
    fn test_persisted_session_round_trips_through_json() {
        let original = session(Utc::now());
        let json = serde_json::to_string(&original.persist()).unwrap();
        let restored: AuthSession = serde_json::from_str::<PersistedSession>(&json)
            .unwrap()
            .into();
        assert_eq!(restored.access_token.expose_secret(), "access-abc");
        assert_eq!(restored.identity, original.identity);
    }

    #[test]
    fn test_debug_redacts_tokens() {
        let s = session(Utc::now());
        assert!(!format!("{s:?}").contains("access-abc"));
        assert!(!format!("{:?}", s.persist()).contains("refresh-def"));
    }
}
