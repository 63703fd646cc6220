//! HTTP route handlers for the desk.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                     - Health check
//! GET  /                           - Render the desk
//! POST /desk/reload                - Start the desk over from Loading
//!
//! # Auth
//! POST /auth/login                 - Password sign-in
//! POST /auth/logout                - Sign out
//!
//! # UI state
//! POST /ui/tab                     - Navigate
//! POST /ui/overlay                 - Toggle a menu
//! POST /ui/overlay/close           - Close the open menu (backdrop)
//! POST /ui/modal                   - Open a modal
//! POST /ui/modal/close             - Close the modal
//! POST /ui/alert/dismiss           - Dismiss the alert
//! POST /ui/filters                 - Search, category, status or sort
//! POST /ui/filters/reset           - Clear category and status
//! POST /ui/date-range              - Dashboard range
//!
//! # Tickets
//! POST /tickets                    - Create
//! POST /tickets/{id}/open          - Show detail
//! POST /tickets/{id}/status        - Change status
//! POST /tickets/{id}/delete        - Ask for delete confirmation
//! POST /tickets/delete/confirm     - Delete the pending ticket
//! POST /tickets/{id}/comments      - Reply
//!
//! # Notifications
//! POST /notifications/{id}/open    - Mark read and open its ticket
//! POST /notifications/clear        - Mark all read
//!
//! # Accounts and settings
//! POST /accounts                   - Create account (Admin)
//! POST /settings/profile           - Update own profile
//! POST /settings/archive-resolved  - Close every resolved ticket (Admin)
//! ```
//!
//! Every POST redirects back to `/`; the desk remembers where the viewer is.

pub mod accounts;
pub mod auth;
pub mod desk;
pub mod notifications;
pub mod settings;
pub mod tickets;
pub mod ui;

use axum::{
    Router,
    response::Redirect,
    routing::{get, post},
};
use tracing::warn;

use proxima_core::desk::DeskEvent;

use crate::error::{AppError, Result};
use crate::middleware::CurrentDesk;
use crate::services::DeskError;
use crate::state::AppState;

/// Create the UI state routes router.
pub fn ui_routes() -> Router<AppState> {
    Router::new()
        .route("/tab", post(ui::navigate))
        .route("/overlay", post(ui::toggle_overlay))
        .route("/overlay/close", post(ui::close_overlay))
        .route("/modal", post(ui::open_modal))
        .route("/modal/close", post(ui::close_modal))
        .route("/alert/dismiss", post(ui::dismiss_alert))
        .route("/filters", post(ui::set_filters))
        .route("/filters/reset", post(ui::reset_filters))
        .route("/date-range", post(ui::set_date_range))
}

/// Create the ticket routes router.
pub fn ticket_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(tickets::create))
        .route("/{id}/open", post(tickets::open))
        .route("/{id}/status", post(tickets::change_status))
        .route("/{id}/delete", post(tickets::request_delete))
        .route("/delete/confirm", post(tickets::confirm_delete))
        .route("/{id}/comments", post(tickets::add_comment))
}

/// Create all routes for the desk.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(desk::show))
        .route("/desk/reload", post(desk::reload))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout))
        .nest("/ui", ui_routes())
        .nest("/tickets", ticket_routes())
        .route("/notifications/{id}/open", post(notifications::open))
        .route("/notifications/clear", post(notifications::clear))
        .route("/accounts", post(accounts::create))
        .route("/settings/profile", post(settings::update_profile))
        .route("/settings/archive-resolved", post(settings::archive_resolved))
}

/// Persist the desk and send the browser back to `/`.
async fn done(desk: &CurrentDesk) -> Result<Redirect> {
    desk.save().await?;
    Ok(Redirect::to("/"))
}

/// Fold a service outcome into the desk, then redirect.
///
/// Backend and validation failures become the blocking alert. A desk that
/// is not signed in just lands back on the login view. Forbidden intents
/// are answered with 403.
async fn settle(mut desk: CurrentDesk, result: std::result::Result<(), DeskError>) -> Result<Redirect> {
    match result {
        Ok(()) | Err(DeskError::NotSignedIn) => {}
        Err(err @ DeskError::Forbidden(_)) => {
            warn!(desk_id = %desk.id(), error = %err, "Rejected intent");
            return Err(AppError::from(err));
        }
        Err(err) => {
            warn!(desk_id = %desk.id(), error = %err, "Intent failed");
            desk.desk.apply(DeskEvent::MutationFailed(err.user_message()));
        }
    }
    done(&desk).await
}
