//! Typed operations on the four backend tables.
//!
//! Thin wrappers over [`Gateway`]: each builds one [`TableQuery`] or row
//! payload and decodes the answer into core types. A row that fails to
//! decode (for example a status outside the closed enumeration) fails the
//! whole call.

use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::instrument;

use proxima_core::{
    Comment, Notification, NotificationId, Profile, Ticket, TicketDraft, TicketId, TicketStatus,
    UserId,
};

use super::{AuthSession, Gateway, GatewayError, Table, TableQuery};

/// Size of the notification feed.
pub const NOTIFICATION_FEED_LIMIT: usize = 20;

fn decode<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, GatewayError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| GatewayError::Response(e.to_string())))
        .collect()
}

fn decode_one<T: DeserializeOwned>(rows: Vec<Value>, what: &str) -> Result<T, GatewayError> {
    decode(rows)?
        .into_iter()
        .next()
        .ok_or_else(|| GatewayError::NotFound(what.to_string()))
}

// =============================================================================
// Profiles
// =============================================================================

/// The profile of `user_id`, or `None` if it has no row yet.
#[instrument(skip(gateway, session))]
pub async fn fetch_profile(
    gateway: &dyn Gateway,
    session: &AuthSession,
    user_id: UserId,
) -> Result<Option<Profile>, GatewayError> {
    let query = TableQuery::from(Table::Profiles).eq("id", user_id);
    let rows = gateway.select(session, &query).await?;
    Ok(decode(rows)?.into_iter().next())
}

/// Ids of every profile, used for notification fan-out.
#[instrument(skip(gateway, session))]
pub async fn fetch_profile_ids(
    gateway: &dyn Gateway,
    session: &AuthSession,
) -> Result<Vec<UserId>, GatewayError> {
    #[derive(Deserialize)]
    struct IdRow {
        id: UserId,
    }

    let query = TableQuery::from(Table::Profiles).select("id");
    let rows: Vec<IdRow> = decode(gateway.select(session, &query).await?)?;
    Ok(rows.into_iter().map(|r| r.id).collect())
}

/// Save the editable profile fields.
#[instrument(skip(gateway, session, profile), fields(user_id = %profile.id))]
pub async fn update_profile(
    gateway: &dyn Gateway,
    session: &AuthSession,
    profile: &Profile,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Profiles).eq("id", profile.id);
    let patch = json!({
        "username": profile.username,
        "email_notifications": profile.email_notifications,
    });
    gateway.update(session, &query, patch).await
}

// =============================================================================
// Tickets
// =============================================================================

/// Every ticket with its comments, newest first.
#[instrument(skip(gateway, session))]
pub async fn fetch_tickets(
    gateway: &dyn Gateway,
    session: &AuthSession,
) -> Result<Vec<Ticket>, GatewayError> {
    let query = TableQuery::from(Table::Tickets)
        .select("*, comments(*)")
        .order("created_at", false);
    let mut tickets: Vec<Ticket> = decode(gateway.select(session, &query).await?)?;
    for ticket in &mut tickets {
        ticket.order_comments();
    }
    Ok(tickets)
}

/// One ticket with its comments.
#[instrument(skip(gateway, session))]
pub async fn fetch_ticket(
    gateway: &dyn Gateway,
    session: &AuthSession,
    id: TicketId,
) -> Result<Ticket, GatewayError> {
    let query = TableQuery::from(Table::Tickets)
        .select("*, comments(*)")
        .eq("id", id);
    let mut ticket: Ticket = decode_one(
        gateway.select(session, &query).await?,
        &format!("Ticket #{id}"),
    )?;
    ticket.order_comments();
    Ok(ticket)
}

/// Insert a ticket from a draft. The stored status is always the initial one.
#[instrument(skip(gateway, session, draft), fields(title = %draft.title))]
pub async fn insert_ticket(
    gateway: &dyn Gateway,
    session: &AuthSession,
    draft: &TicketDraft,
    created_by: UserId,
) -> Result<Ticket, GatewayError> {
    let mut row = serde_json::to_value(draft).map_err(|e| GatewayError::Request(e.to_string()))?;
    if let Value::Object(fields) = &mut row {
        fields.insert("created_by".to_string(), json!(created_by));
        fields.insert("status".to_string(), json!(TicketDraft::initial_status()));
    }

    let rows = gateway.insert(session, Table::Tickets, vec![row]).await?;
    decode_one(rows, "Inserted ticket")
}

#[instrument(skip(gateway, session))]
pub async fn update_ticket_status(
    gateway: &dyn Gateway,
    session: &AuthSession,
    id: TicketId,
    status: TicketStatus,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Tickets).eq("id", id);
    gateway.update(session, &query, json!({ "status": status })).await
}

/// Move every `Resolved` ticket to `Closed` in one update.
#[instrument(skip(gateway, session))]
pub async fn close_resolved_tickets(
    gateway: &dyn Gateway,
    session: &AuthSession,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Tickets).eq("status", TicketStatus::Resolved);
    gateway
        .update(session, &query, json!({ "status": TicketStatus::Closed }))
        .await
}

#[instrument(skip(gateway, session))]
pub async fn delete_ticket(
    gateway: &dyn Gateway,
    session: &AuthSession,
    id: TicketId,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Tickets).eq("id", id);
    gateway.delete(session, &query).await
}

// =============================================================================
// Comments
// =============================================================================

#[instrument(skip(gateway, session, text))]
pub async fn insert_comment(
    gateway: &dyn Gateway,
    session: &AuthSession,
    ticket_id: TicketId,
    user_name: &str,
    text: &str,
) -> Result<Comment, GatewayError> {
    let row = json!({
        "ticket_id": ticket_id,
        "user_name": user_name,
        "text": text,
    });
    let rows = gateway.insert(session, Table::Comments, vec![row]).await?;
    decode_one(rows, "Inserted comment")
}

// =============================================================================
// Notifications
// =============================================================================

/// The newest notifications addressed to `user_id`.
#[instrument(skip(gateway, session))]
pub async fn fetch_notifications(
    gateway: &dyn Gateway,
    session: &AuthSession,
    user_id: UserId,
) -> Result<Vec<Notification>, GatewayError> {
    let query = TableQuery::from(Table::Notifications)
        .eq("user_id", user_id)
        .order("created_at", false)
        .limit(NOTIFICATION_FEED_LIMIT);
    decode(gateway.select(session, &query).await?)
}

/// One unread "New Ticket" notification per recipient, as a single insert.
#[instrument(skip(gateway, session, recipients, ticket), fields(ticket_id = %ticket.id, recipients = recipients.len()))]
pub async fn insert_notifications(
    gateway: &dyn Gateway,
    session: &AuthSession,
    recipients: &[UserId],
    ticket: &Ticket,
) -> Result<(), GatewayError> {
    if recipients.is_empty() {
        return Ok(());
    }

    let text = Notification::new_ticket_text(&ticket.title);
    let rows = recipients
        .iter()
        .map(|user_id| {
            json!({
                "user_id": user_id,
                "ticket_id": ticket.id,
                "text": text,
                "is_read": false,
            })
        })
        .collect();
    gateway
        .insert(session, Table::Notifications, rows)
        .await
        .map(|_| ())
}

#[instrument(skip(gateway, session))]
pub async fn mark_notification_read(
    gateway: &dyn Gateway,
    session: &AuthSession,
    id: NotificationId,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Notifications).eq("id", id);
    gateway.update(session, &query, json!({ "is_read": true })).await
}

/// Mark every unread notification of `user_id` as read.
#[instrument(skip(gateway, session))]
pub async fn mark_all_notifications_read(
    gateway: &dyn Gateway,
    session: &AuthSession,
    user_id: UserId,
) -> Result<(), GatewayError> {
    let query = TableQuery::from(Table::Notifications)
        .eq("user_id", user_id)
        .eq("is_read", false);
    gateway.update(session, &query, json!({ "is_read": true })).await
}
