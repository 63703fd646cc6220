//! Per-user notifications.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{NotificationId, TicketId, UserId};

/// A notification row, owned by `user_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub user_id: UserId,
    pub ticket_id: Option<TicketId>,
    pub text: String,
    #[serde(default)]
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Text of the notification fanned out for a newly created ticket.
    #[must_use]
    pub fn new_ticket_text(title: &str) -> String {
        format!("New Ticket: {title}")
    }
}

/// Count the notifications that have not been read yet.
#[must_use]
pub fn unread_count(notifications: &[Notification]) -> usize {
    notifications.iter().filter(|n| !n.is_read).count()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_unread_count() {
        let user = UserId::random();
        let make = |id: i64, is_read: bool| Notification {
            id: NotificationId::new(id),
            user_id: user,
            ticket_id: None,
            text: Notification::new_ticket_text("VPN down"),
            is_read,
            created_at: Utc::now(),
        };
        let list = vec![make(1, false), make(2, true), make(3, false)];
        assert_eq!(unread_count(&list), 2);
        assert_eq!(list[0].text, "New Ticket: VPN down");
    }
}
