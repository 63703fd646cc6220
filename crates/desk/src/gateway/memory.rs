//! In-process [`Gateway`] backed by JSON rows.
//!
//! Evaluates the same [`TableQuery`] subset the desk issues: equality
//! filters, a single order column, a limit, `id`-only projections and the
//! embedded `comments(*)` relation on tickets. Sign-up mirrors the backend
//! trigger by creating a `profiles` row from the sign-up metadata.

use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;
use uuid::Uuid;

use proxima_core::{Email, Identity, Role, UserId};

use super::{AuthSession, Gateway, GatewayError, SignUpProfile, Table, TableQuery};

/// Access token lifetime handed out by [`MemoryGateway`].
const TOKEN_LIFETIME_MINUTES: i64 = 60;

/// Table operations that can be made to fail on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Select,
    Insert,
    Update,
    Delete,
}

#[derive(Debug)]
struct MemoryUser {
    id: UserId,
    email: String,
    password: String,
}

#[derive(Debug, Default)]
struct MemoryState {
    users: Vec<MemoryUser>,
    access_tokens: HashMap<String, UserId>,
    refresh_tokens: HashMap<String, UserId>,
    tables: HashMap<Table, Vec<Value>>,
    next_id: i64,
    clock: Option<DateTime<Utc>>,
    failures: HashSet<(Table, Operation)>,
    session_checks_fail: bool,
}

impl MemoryState {
    fn issue_session(&mut self, user_id: UserId, email: &str) -> AuthSession {
        let access = Uuid::new_v4().to_string();
        let refresh = Uuid::new_v4().to_string();
        self.access_tokens.insert(access.clone(), user_id);
        self.refresh_tokens.insert(refresh.clone(), user_id);

        AuthSession {
            access_token: SecretString::from(access),
            refresh_token: SecretString::from(refresh),
            expires_at: Utc::now() + Duration::minutes(TOKEN_LIFETIME_MINUTES),
            identity: Identity {
                user_id,
                email: email.to_string(),
            },
        }
    }

    fn authorize(&self, session: &AuthSession) -> Result<UserId, GatewayError> {
        self.access_tokens
            .get(session.access_token.expose_secret())
            .copied()
            .ok_or_else(|| GatewayError::Api {
                status: 401,
                message: "JWT expired".to_string(),
            })
    }

    fn check_session_service(&self) -> Result<(), GatewayError> {
        if self.session_checks_fail {
            return Err(GatewayError::Api {
                status: 503,
                message: "Auth service unavailable".to_string(),
            });
        }
        Ok(())
    }

    /// Trade the refresh token for a fresh pair; the old pair stops working.
    fn rotate(&mut self, session: &AuthSession) -> Option<AuthSession> {
        let user_id = self
            .refresh_tokens
            .remove(session.refresh_token.expose_secret())?;
        self.access_tokens
            .remove(session.access_token.expose_secret());
        Some(self.issue_session(user_id, &session.identity.email))
    }

    fn check(&self, table: Table, op: Operation) -> Result<(), GatewayError> {
        if self.failures.contains(&(table, op)) {
            return Err(GatewayError::Api {
                status: 500,
                message: format!("{op:?} on {table} failed"),
            });
        }
        Ok(())
    }

    /// Strictly increasing timestamps so `created_at` ordering is total.
    fn tick(&mut self) -> String {
        let now = Utc::now();
        let next = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(next);
        next.to_rfc3339_opts(SecondsFormat::Micros, true)
    }

    fn rows(&self, table: Table) -> &[Value] {
        self.tables.get(&table).map_or(&[], Vec::as_slice)
    }

    fn rows_mut(&mut self, table: Table) -> &mut Vec<Value> {
        self.tables.entry(table).or_default()
    }
}

/// Column value as it appears after `eq.` in a filter.
fn filter_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

fn matches(row: &Value, query: &TableQuery) -> bool {
    query
        .filters
        .iter()
        .all(|f| filter_text(row.get(&f.column)) == f.value)
}

fn compare(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        (None | Some(Value::Null), None | Some(Value::Null)) => Ordering::Equal,
        (None | Some(Value::Null), _) => Ordering::Greater,
        (_, None | Some(Value::Null)) => Ordering::Less,
        _ => Ordering::Equal,
    }
}

/// Whether a row for `table` gets a generated numeric id.
const fn has_serial_id(table: Table) -> bool {
    !matches!(table, Table::Profiles)
}

/// In-memory backend for tests and local demos.
#[derive(Debug, Default)]
pub struct MemoryGateway {
    state: Mutex<MemoryState>,
}

impl MemoryGateway {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with a profile row and return their id.
    pub async fn add_user(&self, email: &str, password: &str, username: &str, role: Role) -> UserId {
        let mut state = self.state.lock().await;
        let id = UserId::random();
        state.users.push(MemoryUser {
            id,
            email: email.to_string(),
            password: password.to_string(),
        });
        state.rows_mut(Table::Profiles).push(json!({
            "id": id,
            "username": username,
            "role": role,
            "email_notifications": true,
        }));
        id
    }

    /// Snapshot of every row in `table`, in insertion order.
    pub async fn rows(&self, table: Table) -> Vec<Value> {
        self.state.lock().await.rows(table).to_vec()
    }

    /// Make every later `op` on `table` fail with a 500.
    pub async fn fail(&self, table: Table, op: Operation) {
        self.state.lock().await.failures.insert((table, op));
    }

    /// Make session checks and refreshes fail with a 503.
    pub async fn fail_session_checks(&self) {
        self.state.lock().await.session_checks_fail = true;
    }

    pub async fn clear_failures(&self) {
        let mut state = self.state.lock().await;
        state.failures.clear();
        state.session_checks_fail = false;
    }

    /// Invalidate all access tokens; refresh tokens stay valid.
    pub async fn expire_access_tokens(&self) {
        self.state.lock().await.access_tokens.clear();
    }

    /// Invalidate every token, as if all sessions were revoked.
    pub async fn revoke_all(&self) {
        let mut state = self.state.lock().await;
        state.access_tokens.clear();
        state.refresh_tokens.clear();
    }

    fn project(state: &MemoryState, table: Table, row: &Value, columns: &[String]) -> Value {
        let Value::Object(fields) = row else {
            return row.clone();
        };

        let mut out = Map::new();
        for column in columns {
            if column == "*" {
                out.extend(fields.clone());
            } else if let Some(relation) = column.strip_suffix("(*)") {
                if table == Table::Tickets && relation == "comments" {
                    let id = fields.get("id").cloned().unwrap_or(Value::Null);
                    let comments: Vec<Value> = state
                        .rows(Table::Comments)
                        .iter()
                        .filter(|c| c.get("ticket_id") == Some(&id))
                        .cloned()
                        .collect();
                    out.insert(relation.to_string(), Value::Array(comments));
                }
            } else if let Some(value) = fields.get(column) {
                out.insert(column.clone(), value.clone());
            }
        }
        Value::Object(out)
    }

    fn check_foreign_keys(state: &MemoryState, table: Table, row: &Value) -> Result<(), GatewayError> {
        if table != Table::Comments {
            return Ok(());
        }
        let ticket_id = row.get("ticket_id");
        let exists = state
            .rows(Table::Tickets)
            .iter()
            .any(|t| t.get("id") == ticket_id);
        if exists {
            Ok(())
        } else {
            Err(GatewayError::Api {
                status: 409,
                message: "insert or update on table \"comments\" violates foreign key constraint"
                    .to_string(),
            })
        }
    }
}

#[async_trait]
impl Gateway for MemoryGateway {
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let mut state = self.state.lock().await;
        let user = state
            .users
            .iter()
            .find(|u| {
                u.email.eq_ignore_ascii_case(email.as_str())
                    && u.password == password.expose_secret()
            })
            .map(|u| (u.id, u.email.clone()));

        match user {
            Some((id, email)) => Ok(state.issue_session(id, &email)),
            None => Err(GatewayError::Auth("Invalid login credentials".to_string())),
        }
    }

    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let mut state = self.state.lock().await;
        if state
            .users
            .iter()
            .any(|u| u.email.eq_ignore_ascii_case(email.as_str()))
        {
            return Err(GatewayError::Api {
                status: 422,
                message: "User already registered".to_string(),
            });
        }

        let id = UserId::random();
        state.users.push(MemoryUser {
            id,
            email: email.as_str().to_string(),
            password: password.expose_secret().to_string(),
        });
        state.rows_mut(Table::Profiles).push(json!({
            "id": id,
            "username": profile.name,
            "role": profile.role,
            "email_notifications": true,
        }));
        Ok(Some(state.issue_session(id, email.as_str())))
    }

    async fn sign_out(&self, session: &AuthSession) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state
            .access_tokens
            .remove(session.access_token.expose_secret());
        state
            .refresh_tokens
            .remove(session.refresh_token.expose_secret());
        Ok(())
    }

    async fn current_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_session_service()?;
        if state.authorize(session).is_ok() && !session.needs_refresh(Utc::now()) {
            return Ok(Some(session.clone()));
        }
        Ok(state.rotate(session))
    }

    async fn refresh_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let mut state = self.state.lock().await;
        state.check_session_service()?;
        Ok(state.rotate(session))
    }

    async fn select(
        &self,
        session: &AuthSession,
        query: &TableQuery,
    ) -> Result<Vec<Value>, GatewayError> {
        let state = self.state.lock().await;
        state.authorize(session)?;
        state.check(query.table, Operation::Select)?;

        let mut selected: Vec<&Value> = state
            .rows(query.table)
            .iter()
            .filter(|row| matches(row, query))
            .collect();
        if let Some(order) = &query.order {
            selected.sort_by(|a, b| {
                let ord = compare(a.get(&order.column), b.get(&order.column));
                if order.ascending { ord } else { ord.reverse() }
            });
        }
        if let Some(limit) = query.limit {
            selected.truncate(limit);
        }

        let columns = query.column_list();
        Ok(selected
            .into_iter()
            .map(|row| Self::project(&state, query.table, row, &columns))
            .collect())
    }

    async fn insert(
        &self,
        session: &AuthSession,
        table: Table,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, GatewayError> {
        let mut state = self.state.lock().await;
        state.authorize(session)?;
        state.check(table, Operation::Insert)?;
        for row in &rows {
            Self::check_foreign_keys(&state, table, row)?;
        }

        let mut inserted = Vec::with_capacity(rows.len());
        for row in rows {
            let Value::Object(mut fields) = row else {
                return Err(GatewayError::Api {
                    status: 400,
                    message: "row must be a JSON object".to_string(),
                });
            };
            if has_serial_id(table) && !fields.contains_key("id") {
                state.next_id += 1;
                fields.insert("id".to_string(), json!(state.next_id));
            }
            if !fields.contains_key("created_at") {
                let at = state.tick();
                fields.insert("created_at".to_string(), json!(at));
            }
            if table == Table::Notifications && !fields.contains_key("is_read") {
                fields.insert("is_read".to_string(), json!(false));
            }
            inserted.push(Value::Object(fields));
        }

        state.rows_mut(table).extend(inserted.iter().cloned());
        Ok(inserted)
    }

    async fn update(
        &self,
        session: &AuthSession,
        query: &TableQuery,
        patch: Value,
    ) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.authorize(session)?;
        state.check(query.table, Operation::Update)?;

        let Value::Object(patch) = patch else {
            return Err(GatewayError::Api {
                status: 400,
                message: "patch must be a JSON object".to_string(),
            });
        };
        for row in state
            .rows_mut(query.table)
            .iter_mut()
            .filter(|row| matches(row, query))
        {
            if let Value::Object(fields) = row {
                fields.extend(patch.clone());
            }
        }
        Ok(())
    }

    async fn delete(&self, session: &AuthSession, query: &TableQuery) -> Result<(), GatewayError> {
        let mut state = self.state.lock().await;
        state.authorize(session)?;
        state.check(query.table, Operation::Delete)?;

        let removed: Vec<Value> = state
            .rows(query.table)
            .iter()
            .filter(|row| matches(row, query))
            .filter_map(|row| row.get("id").cloned())
            .collect();
        state.rows_mut(query.table).retain(|row| !matches(row, query));

        // Comments cascade with their ticket.
        if query.table == Table::Tickets {
            state
                .rows_mut(Table::Comments)
                .retain(|c| c.get("ticket_id").is_none_or(|id| !removed.contains(id)));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    async fn signed_in(gateway: &MemoryGateway) -> AuthSession {
        gateway
            .add_user("sam@proxima.services", "pw-123456", "sam", Role::Admin)
            .await;
        gateway
            .sign_in(
                &"sam@proxima.services".parse().unwrap(),
                &SecretString::from("pw-123456"),
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_sign_in_rejects_bad_password() {
        let gateway = MemoryGateway::new();
        gateway
            .add_user("sam@proxima.services", "pw-123456", "sam", Role::Helper)
            .await;
        let err = gateway
            .sign_in(
                &"sam@proxima.services".parse().unwrap(),
                &SecretString::from("nope"),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Auth(ref m) if m == "Invalid login credentials"));
    }

    #[tokio::test]
    async fn test_select_filters_orders_and_limits() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        let rows = (1..=5)
            .map(|i| {
                let status = if i % 2 == 0 { "Open" } else { "Closed" };
                json!({ "title": format!("T{i}"), "status": status })
            })
            .collect();
        gateway.insert(&session, Table::Tickets, rows).await.unwrap();

        let query = TableQuery::from(Table::Tickets)
            .eq("status", "Closed")
            .order("created_at", false)
            .limit(2);
        let titles: Vec<String> = gateway
            .select(&session, &query)
            .await
            .unwrap()
            .iter()
            .map(|r| r["title"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(titles, vec!["T5", "T3"]);
    }

    #[tokio::test]
    async fn test_embedded_comments_and_cascade() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        let ticket = gateway
            .insert(&session, Table::Tickets, vec![json!({ "title": "VPN" })])
            .await
            .unwrap()
            .remove(0);
        gateway
            .insert(
                &session,
                Table::Comments,
                vec![json!({ "ticket_id": ticket["id"], "user_name": "sam", "text": "On it" })],
            )
            .await
            .unwrap();

        let query = TableQuery::from(Table::Tickets).select("*, comments(*)");
        let rows = gateway.select(&session, &query).await.unwrap();
        assert_eq!(rows[0]["comments"][0]["text"], "On it");

        gateway
            .delete(&session, &TableQuery::from(Table::Tickets).eq("id", &ticket["id"]))
            .await
            .unwrap();
        assert!(gateway.rows(Table::Comments).await.is_empty());
    }

    #[tokio::test]
    async fn test_comment_requires_existing_ticket() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        let err = gateway
            .insert(
                &session,
                Table::Comments,
                vec![json!({ "ticket_id": 99, "user_name": "sam", "text": "?" })],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 409, .. }));
    }

    #[tokio::test]
    async fn test_id_projection() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        let rows = gateway
            .select(&session, &TableQuery::from(Table::Profiles).select("id"))
            .await
            .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].as_object().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_access_token_is_refreshed() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        gateway.expire_access_tokens().await;

        let refreshed = gateway.current_session(&session).await.unwrap().unwrap();
        assert_eq!(refreshed.identity, session.identity);
        assert!(
            gateway
                .select(&refreshed, &TableQuery::from(Table::Profiles))
                .await
                .is_ok()
        );

        gateway.revoke_all().await;
        assert!(gateway.current_session(&refreshed).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_rotates_a_live_session() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;

        let refreshed = gateway.refresh_session(&session).await.unwrap().unwrap();
        assert_ne!(
            refreshed.access_token.expose_secret(),
            session.access_token.expose_secret()
        );
        let query = TableQuery::from(Table::Profiles);
        assert!(gateway.select(&session, &query).await.is_err());
        assert!(gateway.select(&refreshed, &query).await.is_ok());

        // The old refresh token was spent.
        assert!(gateway.refresh_session(&session).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_session_check_outage() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        gateway.fail_session_checks().await;

        let err = gateway.current_session(&session).await.unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 503, .. }));
        assert!(gateway.refresh_session(&session).await.is_err());

        gateway.clear_failures().await;
        assert!(gateway.current_session(&session).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let gateway = MemoryGateway::new();
        let session = signed_in(&gateway).await;
        gateway.fail(Table::Tickets, Operation::Select).await;
        assert!(
            gateway
                .select(&session, &TableQuery::from(Table::Tickets))
                .await
                .is_err()
        );
        gateway.clear_failures().await;
        assert!(
            gateway
                .select(&session, &TableQuery::from(Table::Tickets))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_sign_up_creates_profile_and_rejects_duplicates() {
        let gateway = MemoryGateway::new();
        let profile = SignUpProfile {
            name: "Ana".to_string(),
            role: Role::Helper,
        };
        let email: Email = "ana@proxima.services".parse().unwrap();
        let session = gateway
            .sign_up(&email, &SecretString::from("pw-123456"), &profile)
            .await
            .unwrap()
            .unwrap();
        let profiles = gateway.rows(Table::Profiles).await;
        assert_eq!(profiles[0]["username"], "Ana");
        assert_eq!(profiles[0]["role"], "Helper");
        assert_eq!(session.identity.email, "ana@proxima.services");

        let err = gateway
            .sign_up(&email, &SecretString::from("pw-123456"), &profile)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Api { status: 422, .. }));
    }
}
