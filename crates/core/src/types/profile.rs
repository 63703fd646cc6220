//! Staff profiles and the signed-in identity.

use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// A `profiles` row. One per authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: UserId,
    #[serde(default)]
    pub username: String,
    pub role: Role,
    #[serde(default = "default_email_notifications")]
    pub email_notifications: bool,
}

const fn default_email_notifications() -> bool {
    true
}

impl Profile {
    /// First character of the username, upper-cased, for the avatar.
    #[must_use]
    pub fn initial(&self) -> Option<char> {
        self.username.chars().next().map(|c| c.to_ascii_uppercase())
    }

    /// Name used when replying to a ticket.
    #[must_use]
    pub fn reply_name(&self) -> &str {
        if self.username.trim().is_empty() {
            "Unknown"
        } else {
            &self.username
        }
    }
}

/// Local mirror of the gateway session: who is signed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: UserId,
    pub email: String,
}
