//! Extractor for the browser's desk.
//!
//! Looks up (or assigns) the desk id kept in the session, locks the desk for
//! the rest of the request and settles a `Loading` desk (or refreshes a
//! signed-in desk's expiring session) before the handler sees it.

use std::ops::{Deref, DerefMut};

use axum::{extract::FromRequestParts, http::request::Parts};
use tokio::sync::OwnedMutexGuard;
use tower_sessions::Session;
use uuid::Uuid;

use crate::error::{AppError, clear_sentry_user, set_sentry_user};
use crate::gateway::{AuthSession, PersistedSession};
use crate::middleware::session_keys;
use crate::state::AppState;
use crate::store::DeskEntry;

/// The locked desk of the requesting browser.
///
/// Call [`CurrentDesk::save`] before responding so the backend session
/// survives an evicted desk.
pub struct CurrentDesk {
    session: Session,
    id: Uuid,
    entry: OwnedMutexGuard<DeskEntry>,
}

impl std::fmt::Debug for CurrentDesk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CurrentDesk")
            .field("id", &self.id)
            .field("session", &self.entry.desk.session)
            .finish_non_exhaustive()
    }
}

impl CurrentDesk {
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    /// Write the backend session back into the browser session.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Session` if the session store fails.
    pub async fn save(&self) -> Result<(), AppError> {
        match &self.entry.auth {
            Some(auth) => {
                self.session
                    .insert(session_keys::AUTH, auth.persist())
                    .await?;
                set_sentry_user(&auth.identity.user_id, &auth.identity.email);
            }
            None => {
                self.session
                    .remove::<PersistedSession>(session_keys::AUTH)
                    .await?;
                clear_sentry_user();
            }
        }
        Ok(())
    }
}

impl Deref for CurrentDesk {
    type Target = DeskEntry;

    fn deref(&self) -> &Self::Target {
        &self.entry
    }
}

impl DerefMut for CurrentDesk {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.entry
    }
}

impl FromRequestParts<AppState> for CurrentDesk {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // Set by SessionManagerLayer
        let session = parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| AppError::Internal("session layer missing".to_string()))?;

        let id = match session.get::<Uuid>(session_keys::DESK_ID).await? {
            Some(id) => id,
            None => {
                let id = Uuid::new_v4();
                session.insert(session_keys::DESK_ID, id).await?;
                tracing::debug!(desk_id = %id, "Assigned new desk");
                id
            }
        };

        let persisted = session
            .get::<PersistedSession>(session_keys::AUTH)
            .await?
            .map(AuthSession::from);

        let mut entry = state
            .desks()
            .lock(id, move || DeskEntry::resuming(persisted))
            .await;
        state.service().resolve(&mut entry).await;

        Ok(Self { session, id, entry })
    }
}
