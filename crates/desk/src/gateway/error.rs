//! Gateway errors.

use thiserror::Error;

/// Errors that can occur when talking to the backend.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// HTTP request failed (connection, timeout, URL).
    #[error("Gateway request failed: {0}")]
    Request(String),

    /// Response body could not be read or decoded.
    #[error("Gateway response error: {0}")]
    Response(String),

    /// Backend answered with an error status.
    #[error("Gateway API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Credentials were rejected.
    #[error("{0}")]
    Auth(String),

    /// The requested row does not exist or is not visible.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl GatewayError {
    /// Message suitable for showing to the signed-in user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api { message, .. } | Self::Auth(message) => message.clone(),
            Self::NotFound(what) => format!("{what} no longer exists"),
            Self::Request(_) | Self::Response(_) => "The backend could not be reached".to_string(),
        }
    }

    /// Whether the backend rejected the access or refresh token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401 | 403, .. } | Self::Auth(_))
    }
}
