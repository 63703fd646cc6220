//! Tickets and their comment threads.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, CommentId, TicketId, TicketPriority, TicketStatus, TicketType, UserId};

/// A ticket row, optionally with its embedded comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ticket {
    pub id: TicketId,
    pub title: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub category: Category,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    #[serde(default)]
    pub description: String,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    /// Replies in insertion order.
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl Ticket {
    /// Put the comment thread in insertion order.
    ///
    /// Embedded rows come back in whatever order the backend chooses; the
    /// thread is append-only, so creation time and then id is insertion order.
    pub fn order_comments(&mut self) {
        self.comments.sort_by_key(|c| (c.created_at, c.id));
    }
}

/// A reply on a ticket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub ticket_id: TicketId,
    pub user_name: String,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Why a [`TicketDraft`] cannot be submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum DraftError {
    #[error("A ticket needs a title")]
    MissingTitle,
    #[error("A ticket needs a description")]
    MissingDescription,
}

/// Input of the create-ticket form.
///
/// Carries no status field: every new ticket starts `Open`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketDraft {
    pub title: String,
    #[serde(rename = "type")]
    pub ticket_type: TicketType,
    pub category: Category,
    pub priority: TicketPriority,
    pub description: String,
}

impl TicketDraft {
    /// Check the required fields.
    ///
    /// # Errors
    ///
    /// Returns the first blank required field.
    pub fn validate(&self) -> Result<(), DraftError> {
        if self.title.trim().is_empty() {
            return Err(DraftError::MissingTitle);
        }
        if self.description.trim().is_empty() {
            return Err(DraftError::MissingDescription);
        }
        Ok(())
    }

    /// Status every ticket created from a draft starts with.
    #[must_use]
    pub const fn initial_status() -> TicketStatus {
        TicketStatus::Open
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_deserializes_backend_row() {
        let row = serde_json::json!({
            "id": 12,
            "title": "VPN down",
            "type": "Outage",
            "category": "Server Setup",
            "priority": "Critical",
            "status": "In Progress",
            "description": "Nobody can connect",
            "created_by": "0b9f3f0e-7a55-4c1e-9d42-2f1c7b1d9a10",
            "created_at": "2026-03-04T09:15:00.123456+00:00",
            "comments": [
                {
                    "id": 2,
                    "ticket_id": 12,
                    "user_name": "kai",
                    "text": "second",
                    "created_at": "2026-03-04T10:00:00+00:00"
                },
                {
                    "id": 1,
                    "ticket_id": 12,
                    "user_name": "mo",
                    "text": "first",
                    "created_at": "2026-03-04T09:30:00+00:00"
                }
            ]
        });

        let mut ticket: Ticket = serde_json::from_value(row).unwrap();
        assert_eq!(ticket.ticket_type, TicketType::Outage);
        assert_eq!(ticket.status, TicketStatus::InProgress);

        ticket.order_comments();
        let texts: Vec<&str> = ticket.comments.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[test]
    fn test_ticket_without_comments_defaults_empty() {
        let row = serde_json::json!({
            "id": 3,
            "title": "Billing page blank",
            "type": "Bug",
            "category": "Billing",
            "priority": "Low",
            "status": "Open",
            "description": "White screen after login",
            "created_by": null,
            "created_at": "2026-03-04T09:15:00Z"
        });
        let ticket: Ticket = serde_json::from_value(row).unwrap();
        assert!(ticket.comments.is_empty());
        assert!(ticket.created_by.is_none());
    }

    #[test]
    fn test_ticket_rejects_unknown_status() {
        let row = serde_json::json!({
            "id": 4,
            "title": "Old",
            "type": "Bug",
            "category": "Billing",
            "priority": "Low",
            "status": "Archived",
            "description": "",
            "created_by": null,
            "created_at": "2026-03-04T09:15:00Z"
        });
        assert!(serde_json::from_value::<Ticket>(row).is_err());
    }

    #[test]
    fn test_draft_validation() {
        let mut draft = TicketDraft::default();
        assert_eq!(draft.validate(), Err(DraftError::MissingTitle));

        draft.title = "  VPN down ".to_string();
        assert_eq!(draft.validate(), Err(DraftError::MissingDescription));

        draft.description = "Nobody can connect".to_string();
        assert_eq!(draft.validate(), Ok(()));
        assert_eq!(TicketDraft::initial_status(), TicketStatus::Open);
    }
}
