//! Intents that touch the backend.

use chrono::Utc;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, info, instrument, warn};

use proxima_core::desk::{DeskEvent, Modal, SessionData};
use proxima_core::{Email, NotificationId, Profile, Role, Ticket, TicketDraft, TicketId, TicketStatus};

use super::DeskError;
use crate::gateway::{AuthSession, Gateway, GatewayError, SignUpProfile, tables};
use crate::store::DeskEntry;

/// Create-account form.
#[derive(Deserialize)]
pub struct AccountForm {
    pub name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

impl std::fmt::Debug for AccountForm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountForm")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("role", &self.role)
            .finish()
    }
}

/// Profile settings form. An unchecked checkbox is simply absent.
#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    pub username: String,
    #[serde(default)]
    pub email_notifications: Option<String>,
}

/// Turns intents into gateway calls and desk events.
#[derive(Clone, Copy)]
pub struct DeskService<'a> {
    gateway: Option<&'a dyn Gateway>,
}

impl std::fmt::Debug for DeskService<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeskService")
            .field("configured", &self.gateway.is_some())
            .finish()
    }
}

/// Log a failed read and keep going without its result.
fn fetched<T>(result: Result<T, GatewayError>, what: &'static str) -> Option<T> {
    result
        .map_err(|e| warn!(error = %e, "Failed to fetch {what}"))
        .ok()
}

impl<'a> DeskService<'a> {
    /// `None` means the backend is not configured: sign-in is disabled and
    /// nothing else can happen.
    #[must_use]
    pub const fn new(gateway: Option<&'a dyn Gateway>) -> Self {
        Self { gateway }
    }

    #[must_use]
    pub const fn is_configured(&self) -> bool {
        self.gateway.is_some()
    }

    /// The gateway for a signed-in desk.
    fn signed_in(&self, entry: &DeskEntry) -> Result<&'a dyn Gateway, DeskError> {
        let gateway = self.gateway.ok_or(DeskError::NotSignedIn)?;
        if entry.desk.identity().is_none() || entry.auth.is_none() {
            return Err(DeskError::NotSignedIn);
        }
        Ok(gateway)
    }

    /// Run one backend call with the desk's session.
    ///
    /// A rejected access token is refreshed once and the call repeated. A
    /// rejected refresh token signs the desk out.
    async fn authorized<T, F, Fut>(
        gateway: &dyn Gateway,
        entry: &mut DeskEntry,
        action: &'static str,
        call: F,
    ) -> Result<T, DeskError>
    where
        F: Fn(AuthSession) -> Fut,
        Fut: Future<Output = Result<T, GatewayError>>,
    {
        let session = entry.auth.clone().ok_or(DeskError::NotSignedIn)?;
        let rejected = match call(session.clone()).await {
            Err(e) if e.is_unauthorized() => e,
            result => return result.map_err(DeskError::gateway(action)),
        };

        match gateway.refresh_session(&session).await {
            Ok(Some(refreshed)) => {
                debug!("Access token rejected; retrying with a refreshed session");
                entry.auth = Some(refreshed.clone());
                call(refreshed).await.map_err(DeskError::gateway(action))
            }
            Ok(None) => {
                Self::expire(entry);
                Err(DeskError::NotSignedIn)
            }
            Err(e) => {
                warn!(error = %e, "Session refresh failed");
                Err(DeskError::gateway(action)(rejected))
            }
        }
    }

    fn expire(entry: &mut DeskEntry) {
        if let Some(session) = entry.auth.take() {
            info!(user_id = %session.identity.user_id, "Session expired; signed out");
        }
        entry.desk.apply(DeskEvent::SignedOut);
    }

    // =========================================================================
    // Session
    // =========================================================================

    /// Settle a `Loading` desk: resume the stored session or fall back to the
    /// login view. A signed-in desk gets its session refreshed when it is
    /// close to expiry.
    ///
    /// When the check itself fails the stored session is kept and the desk
    /// stays `Loading`, so the next request tries again.
    #[instrument(skip_all)]
    pub async fn resolve(&self, entry: &mut DeskEntry) {
        if entry.desk.identity().is_some() {
            if let Some(gateway) = self.gateway {
                Self::keep_fresh(gateway, entry).await;
            }
            return;
        }
        if !entry.desk.is_loading() {
            return;
        }

        let (Some(gateway), Some(stored)) = (self.gateway, entry.auth.clone()) else {
            entry.auth = None;
            entry.desk.apply(DeskEvent::NoSession);
            return;
        };

        match gateway.current_session(&stored).await {
            Ok(Some(session)) => Self::enter(gateway, entry, session).await,
            Ok(None) => {
                debug!("Stored session is no longer valid");
                entry.auth = None;
                entry.desk.apply(DeskEvent::NoSession);
            }
            Err(e) => warn!(error = %e, "Session check failed; keeping stored session"),
        }
    }

    async fn keep_fresh(gateway: &dyn Gateway, entry: &mut DeskEntry) {
        let Some(stored) = entry
            .auth
            .clone()
            .filter(|session| session.needs_refresh(Utc::now()))
        else {
            return;
        };

        match gateway.refresh_session(&stored).await {
            Ok(Some(session)) => {
                debug!(user_id = %session.identity.user_id, "Session refreshed");
                entry.auth = Some(session);
            }
            Ok(None) => Self::expire(entry),
            Err(e) => warn!(error = %e, "Session refresh failed"),
        }
    }

    /// Load profile, tickets and notifications concurrently and enter.
    async fn enter(gateway: &dyn Gateway, entry: &mut DeskEntry, session: AuthSession) {
        let user_id = session.identity.user_id;
        let (profile, tickets, notifications) = tokio::join!(
            tables::fetch_profile(gateway, &session, user_id),
            tables::fetch_tickets(gateway, &session),
            tables::fetch_notifications(gateway, &session, user_id),
        );

        let profile = fetched(profile, "profile").flatten();
        if profile.is_none() {
            warn!(user_id = %user_id, "Signed in without a profile; desk is read-only");
        }
        let data = SessionData {
            identity: session.identity.clone(),
            profile,
            tickets: fetched(tickets, "tickets"),
            notifications: fetched(notifications, "notifications"),
        };

        entry.auth = Some(session);
        entry.desk.apply(DeskEvent::SessionEntered(Box::new(data)));
    }

    /// Password sign-in. Failures are shown inline on the login form.
    #[instrument(skip(self, entry, password))]
    pub async fn sign_in(&self, entry: &mut DeskEntry, email: &str, password: &SecretString) {
        let Some(gateway) = self.gateway else {
            debug!("Backend not configured; ignoring sign-in");
            return;
        };

        let email = match Email::parse(email) {
            Ok(email) => email,
            Err(e) => {
                entry.desk.apply(DeskEvent::SignInFailed(e.to_string()));
                return;
            }
        };
        if password.expose_secret().is_empty() {
            entry
                .desk
                .apply(DeskEvent::SignInFailed("Password is required".to_string()));
            return;
        }

        match gateway.sign_in(&email, password).await {
            Ok(session) => {
                info!(user_id = %session.identity.user_id, "Signed in");
                Self::enter(gateway, entry, session).await;
            }
            Err(GatewayError::Auth(message)) => {
                entry.desk.apply(DeskEvent::SignInFailed(message));
            }
            Err(e) => {
                warn!(error = %e, "Sign-in request failed");
                entry.desk.apply(DeskEvent::SignInFailed(e.user_message()));
            }
        }
    }

    /// Sign out locally, telling the backend when possible.
    #[instrument(skip_all)]
    pub async fn sign_out(&self, entry: &mut DeskEntry) {
        if let (Some(gateway), Some(session)) = (self.gateway, entry.auth.take()) {
            if let Err(e) = gateway.sign_out(&session).await {
                warn!(error = %e, "Backend sign-out failed");
            }
            info!(user_id = %session.identity.user_id, "Signed out");
        }
        entry.desk.apply(DeskEvent::SignedOut);
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// Create a ticket, then fan out one notification per profile.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a blank title or description and `Gateway` if
    /// the insert fails. Fan-out failures are only logged.
    #[instrument(skip(self, entry, draft), fields(title = %draft.title))]
    pub async fn create_ticket(
        &self,
        entry: &mut DeskEntry,
        draft: TicketDraft,
    ) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        if !entry.desk.capabilities().can_manage_tickets {
            return Err(DeskError::Forbidden("create tickets"));
        }

        entry.desk.apply(DeskEvent::DraftEdited(draft.clone()));
        draft
            .validate()
            .map_err(|e| DeskError::Invalid(e.to_string()))?;

        let draft = &draft;
        let ticket = Self::authorized(gateway, entry, "create ticket", |session| async move {
            tables::insert_ticket(gateway, &session, draft, session.identity.user_id).await
        })
        .await?;
        info!(ticket_id = %ticket.id, "Ticket created");
        entry.desk.apply(DeskEvent::TicketCreated(ticket.clone()));

        // The insert may have refreshed the session.
        let Some(session) = entry.auth.clone() else {
            return Ok(());
        };
        Self::fan_out(gateway, &session, &ticket).await;

        let user_id = session.identity.user_id;
        if let Some(list) = fetched(
            tables::fetch_notifications(gateway, &session, user_id).await,
            "notifications",
        ) {
            entry.desk.apply(DeskEvent::NotificationsRefreshed(list));
        }
        Ok(())
    }

    async fn fan_out(gateway: &dyn Gateway, session: &AuthSession, ticket: &Ticket) {
        let Some(recipients) = fetched(
            tables::fetch_profile_ids(gateway, session).await,
            "profile ids",
        ) else {
            return;
        };
        match tables::insert_notifications(gateway, session, &recipients, ticket).await {
            Ok(()) => debug!(recipients = recipients.len(), "Notifications fanned out"),
            Err(e) => warn!(error = %e, ticket_id = %ticket.id, "Notification fan-out failed"),
        }
    }

    /// Show a ticket on the detail tab, from cache or from the backend.
    #[instrument(skip(self, entry))]
    pub async fn open_ticket(&self, entry: &mut DeskEntry, id: TicketId) -> Result<(), DeskError> {
        if let Some(ticket) = entry.desk.ticket(id).cloned() {
            entry.desk.apply(DeskEvent::TicketOpened(ticket));
            return Ok(());
        }

        let gateway = self.signed_in(entry)?;
        let result = Self::authorized(gateway, entry, "open ticket", |session| async move {
            tables::fetch_ticket(gateway, &session, id).await
        })
        .await;
        match result {
            Ok(ticket) => entry.desk.apply(DeskEvent::TicketOpened(ticket)),
            Err(DeskError::NotSignedIn) => return Err(DeskError::NotSignedIn),
            Err(e) => {
                warn!(error = %e, "Failed to fetch ticket");
                entry.desk.apply(DeskEvent::CloseOverlay);
            }
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `Forbidden` for viewers who cannot manage tickets.
    #[instrument(skip(self, entry))]
    pub async fn change_status(
        &self,
        entry: &mut DeskEntry,
        id: TicketId,
        status: TicketStatus,
    ) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        if !entry.desk.capabilities().can_manage_tickets {
            return Err(DeskError::Forbidden("change ticket status"));
        }

        Self::authorized(gateway, entry, "update status", |session| async move {
            tables::update_ticket_status(gateway, &session, id, status).await
        })
        .await?;
        entry.desk.apply(DeskEvent::StatusChanged { id, status });
        Ok(())
    }

    /// First step of deletion: ask for confirmation.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for viewers who cannot delete tickets.
    pub fn request_delete(&self, entry: &mut DeskEntry, id: TicketId) -> Result<(), DeskError> {
        self.signed_in(entry)?;
        if !entry.desk.capabilities().can_delete_tickets {
            return Err(DeskError::Forbidden("delete tickets"));
        }
        entry.desk.apply(DeskEvent::DeleteRequested(id));
        Ok(())
    }

    /// Second step of deletion. Without a pending confirmation this does nothing.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for viewers who cannot delete tickets and `Gateway`
    /// if the delete fails.
    #[instrument(skip_all)]
    pub async fn confirm_delete(&self, entry: &mut DeskEntry) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        if !entry.desk.capabilities().can_delete_tickets {
            return Err(DeskError::Forbidden("delete tickets"));
        }
        let Some(id) = entry.desk.ui.modal.pending_delete() else {
            return Ok(());
        };

        Self::authorized(gateway, entry, "delete ticket", |session| async move {
            tables::delete_ticket(gateway, &session, id).await
        })
        .await?;
        info!(ticket_id = %id, "Ticket deleted");
        entry.desk.apply(DeskEvent::TicketDeleted(id));
        Ok(())
    }

    /// Append a reply as the viewer. Blank text is ignored.
    ///
    /// # Errors
    ///
    /// Returns `Gateway` if the insert fails.
    #[instrument(skip(self, entry, text))]
    pub async fn add_comment(
        &self,
        entry: &mut DeskEntry,
        ticket_id: TicketId,
        text: &str,
    ) -> Result<(), DeskError> {
        if text.trim().is_empty() {
            return Ok(());
        }
        let gateway = self.signed_in(entry)?;
        let user_name = entry
            .desk
            .profile
            .as_ref()
            .map_or("Unknown", Profile::reply_name)
            .to_string();

        let user_name = user_name.as_str();
        let comment = Self::authorized(gateway, entry, "add comment", |session| async move {
            tables::insert_comment(gateway, &session, ticket_id, user_name, text).await
        })
        .await?;
        entry.desk.apply(DeskEvent::CommentAdded(comment));
        Ok(())
    }

    /// Close every `Resolved` ticket.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-Admins and `Gateway` if the update fails.
    #[instrument(skip_all)]
    pub async fn archive_resolved(&self, entry: &mut DeskEntry) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        if !entry.desk.capabilities().can_manage_users {
            return Err(DeskError::Forbidden("archive tickets"));
        }

        Self::authorized(gateway, entry, "archive resolved tickets", |session| async move {
            tables::close_resolved_tickets(gateway, &session).await
        })
        .await?;
        entry.desk.apply(DeskEvent::ResolvedArchived);
        Ok(())
    }

    // =========================================================================
    // Notifications
    // =========================================================================

    /// Mark a notification read (if it is not already) and open its ticket.
    ///
    /// # Errors
    ///
    /// Returns `Gateway` if marking it read fails.
    #[instrument(skip(self, entry))]
    pub async fn open_notification(
        &self,
        entry: &mut DeskEntry,
        id: NotificationId,
    ) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        let Some(notification) = entry
            .desk
            .cache
            .notifications
            .iter()
            .find(|n| n.id == id)
            .cloned()
        else {
            entry.desk.apply(DeskEvent::CloseOverlay);
            return Ok(());
        };

        if !notification.is_read {
            Self::authorized(gateway, entry, "mark notification read", |session| async move {
                tables::mark_notification_read(gateway, &session, id).await
            })
            .await?;
            entry.desk.apply(DeskEvent::NotificationRead(id));
        }

        match notification.ticket_id {
            Some(ticket_id) => self.open_ticket(entry, ticket_id).await,
            None => {
                entry.desk.apply(DeskEvent::CloseOverlay);
                Ok(())
            }
        }
    }

    /// Mark every unread notification of the viewer as read.
    ///
    /// # Errors
    ///
    /// Returns `Gateway` if the update fails.
    #[instrument(skip_all)]
    pub async fn clear_notifications(&self, entry: &mut DeskEntry) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        Self::authorized(gateway, entry, "clear notifications", |session| async move {
            tables::mark_all_notifications_read(gateway, &session, session.identity.user_id).await
        })
        .await?;
        entry.desk.apply(DeskEvent::NotificationsCleared);
        Ok(())
    }

    // =========================================================================
    // Accounts and settings
    // =========================================================================

    /// Open a modal the viewer is allowed to see.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` when the role does not grant the modal.
    pub fn open_modal(&self, entry: &mut DeskEntry, modal: Modal) -> Result<(), DeskError> {
        self.signed_in(entry)?;
        if !entry.desk.allows(modal) {
            return Err(DeskError::Forbidden("open this dialog"));
        }
        entry.desk.apply(DeskEvent::OpenModal(modal));
        Ok(())
    }

    /// Register a new account (Admin only).
    ///
    /// The backend signs the new account in, so the desk switches to it and
    /// starts over from `Loading`.
    ///
    /// # Errors
    ///
    /// Returns `Forbidden` for non-Admins, `Invalid` for an incomplete form
    /// and `Gateway` if sign-up fails.
    #[instrument(skip(self, entry, form), fields(email = %form.email, role = %form.role))]
    pub async fn create_account(
        &self,
        entry: &mut DeskEntry,
        form: AccountForm,
    ) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        if !entry.desk.capabilities().can_manage_users {
            return Err(DeskError::Forbidden("create accounts"));
        }

        let name = form.name.trim().to_string();
        if name.is_empty() {
            return Err(DeskError::Invalid("A name is required".to_string()));
        }
        let email = Email::parse(&form.email).map_err(|e| DeskError::Invalid(e.to_string()))?;
        if form.password.is_empty() {
            return Err(DeskError::Invalid("A password is required".to_string()));
        }
        let password = SecretString::from(form.password);

        let profile = SignUpProfile {
            name: name.clone(),
            role: form.role,
        };
        let created = gateway
            .sign_up(&email, &password, &profile)
            .await
            .map_err(DeskError::gateway("create account"))?;

        match created {
            Some(session) => {
                info!(user_id = %session.identity.user_id, "Account created; session switched");
                entry.auth = Some(session);
                entry.desk.apply(DeskEvent::SessionSwitched {
                    notice: format!(
                        "Account created for {name}. NOTE: You have been switched to this new account."
                    ),
                });
            }
            None => {
                info!("Account created; awaiting email confirmation");
                entry.desk.apply(DeskEvent::AccountCreated {
                    notice: format!(
                        "Account created for {name}. A confirmation email was sent to {email}."
                    ),
                });
            }
        }
        Ok(())
    }

    /// Save the viewer's own username and notification preference.
    ///
    /// # Errors
    ///
    /// Returns `Invalid` for a blank username or a missing profile and
    /// `Gateway` if the update fails.
    #[instrument(skip(self, entry, form))]
    pub async fn update_profile(
        &self,
        entry: &mut DeskEntry,
        form: ProfileForm,
    ) -> Result<(), DeskError> {
        let gateway = self.signed_in(entry)?;
        let Some(current) = entry.desk.profile.clone() else {
            return Err(DeskError::Invalid("No profile to update".to_string()));
        };
        let username = form.username.trim().to_string();
        if username.is_empty() {
            return Err(DeskError::Invalid("A username is required".to_string()));
        }

        let updated = Profile {
            username,
            email_notifications: form.email_notifications.is_some(),
            ..current
        };
        let profile = &updated;
        Self::authorized(gateway, entry, "save settings", |session| async move {
            tables::update_profile(gateway, &session, profile).await
        })
        .await?;
        entry.desk.apply(DeskEvent::ProfileUpdated(updated));
        Ok(())
    }
}
