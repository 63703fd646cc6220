//! Service layer: one method per user intent.
//!
//! Services call the gateway first and apply a desk event only once the
//! backend confirmed. Read failures are logged and leave the cache as it
//! was; write failures come back as [`DeskError`] for the route to surface.

mod desk;

pub use desk::{AccountForm, DeskService, ProfileForm};

use thiserror::Error;

use crate::gateway::GatewayError;

/// Why an intent could not be carried out.
#[derive(Debug, Error)]
pub enum DeskError {
    /// The backend rejected a write.
    #[error("Could not {action}: {source}")]
    Gateway {
        action: &'static str,
        #[source]
        source: GatewayError,
    },

    /// The viewer's role does not allow this intent.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// The intent needs a signed-in viewer.
    #[error("Not signed in")]
    NotSignedIn,

    /// The submitted form is incomplete or malformed.
    #[error("{0}")]
    Invalid(String),
}

impl DeskError {
    /// Wrap a gateway error with the action that failed.
    pub fn gateway(action: &'static str) -> impl FnOnce(GatewayError) -> Self {
        move |source| Self::Gateway { action, source }
    }

    /// Text for the blocking alert.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Gateway { action, source } => {
                format!("Could not {action}: {}", source.user_message())
            }
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message() {
        let err = DeskError::gateway("create ticket")(GatewayError::Api {
            status: 400,
            message: "new row violates row-level security policy".to_string(),
        });
        assert_eq!(
            err.user_message(),
            "Could not create ticket: new row violates row-level security policy"
        );
        assert_eq!(
            DeskError::Invalid("A ticket needs a title".to_string()).user_message(),
            "A ticket needs a title"
        );
    }
}
