//! Unified error handling with Sentry integration.
//!
//! Most failures never reach here: services turn them into desk state (an
//! inline login error or a blocking alert) and the handler redirects. What
//! is left is rendering, session storage and crafted requests.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::services::DeskError;

/// Application-level error type for the desk.
#[derive(Debug, Error)]
pub enum AppError {
    /// The viewer's role does not allow the intent.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Malformed request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Session store failure.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Template rendering failed.
    #[error("Render error: {0}")]
    Render(#[from] askama::Error),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<DeskError> for AppError {
    fn from(err: DeskError) -> Self {
        match err {
            DeskError::Forbidden(action) => Self::Forbidden(format!("not allowed to {action}")),
            DeskError::Invalid(message) => Self::BadRequest(message),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl AppError {
    /// Whether the failure is ours rather than the request's.
    const fn is_server_error(&self) -> bool {
        matches!(self, Self::Session(_) | Self::Render(_) | Self::Internal(_))
    }

    const fn status(&self) -> StatusCode {
        match self {
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Session(_) | Self::Render(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if !self.is_server_error() {
            return (self.status(), self.to_string()).into_response();
        }

        let event_id = sentry::capture_error(&self);
        tracing::error!(error = %self, sentry_event_id = %event_id, "Request failed");
        // Details stay in the logs
        (self.status(), "Internal server error").into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the signed-in user.
pub fn set_sentry_user(user_id: &impl ToString, email: &str) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: Some(email.to_string()),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forbidden_message_names_the_action() {
        let err = AppError::from(DeskError::Forbidden("create accounts"));
        assert_eq!(err.to_string(), "Forbidden: not allowed to create accounts");
    }

    #[test]
    fn test_desk_errors_map_to_status() {
        let forbidden = AppError::from(DeskError::Forbidden("delete tickets"));
        assert_eq!(forbidden.into_response().status(), StatusCode::FORBIDDEN);

        let invalid = AppError::from(DeskError::Invalid("Title is required".to_string()));
        assert_eq!(invalid.into_response().status(), StatusCode::BAD_REQUEST);

        let internal = AppError::Internal("session layer missing".to_string());
        assert!(internal.is_server_error());
        assert_eq!(
            internal.into_response().status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
