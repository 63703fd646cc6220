//! Supabase implementation of [`Gateway`].
//!
//! Auth goes through GoTrue (`/auth/v1`), tables through PostgREST
//! (`/rest/v1`). Every request carries the public anon key as `apikey`.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::{Duration, Utc};
use reqwest::{Client, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};
use url::Url;

use proxima_core::{Email, Identity, UserId};

use super::{AuthSession, Gateway, GatewayError, SignUpProfile, Table, TableQuery};
use crate::config::GatewayConfig;

/// Request timeout for every backend call.
const REQUEST_TIMEOUT: StdDuration = StdDuration::from_secs(30);

/// Supabase project client.
#[derive(Clone)]
pub struct SupabaseGateway {
    /// HTTP client.
    client: Client,
    /// Project URL.
    base_url: Url,
    /// Public anon key.
    anon_key: SecretString,
}

impl std::fmt::Debug for SupabaseGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SupabaseGateway")
            .field("base_url", &self.base_url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: AuthUser,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: UserId,
    #[serde(default)]
    email: Option<String>,
}

impl From<TokenResponse> for AuthSession {
    fn from(token: TokenResponse) -> Self {
        Self {
            access_token: SecretString::from(token.access_token),
            refresh_token: SecretString::from(token.refresh_token),
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
            identity: Identity {
                user_id: token.user.id,
                email: token.user.email.unwrap_or_default(),
            },
        }
    }
}

/// Error bodies differ between GoTrue versions and PostgREST.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.message
            .or(self.msg)
            .or(self.error_description)
            .or(self.error)
    }
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a SignUpProfile,
}

impl SupabaseGateway {
    /// Create a client for the configured project.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.url.clone(),
            anon_key: config.anon_key.clone(),
        })
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        self.base_url
            .join(path)
            .map_err(|e| GatewayError::Request(format!("invalid endpoint {path}: {e}")))
    }

    fn table_url(&self, table: Table) -> Result<Url, GatewayError> {
        self.endpoint(&format!("rest/v1/{table}"))
    }

    /// Attach `apikey` and a bearer token (the anon key when signed out).
    fn authorize(&self, builder: RequestBuilder, session: Option<&AuthSession>) -> RequestBuilder {
        let bearer = session.map_or_else(
            || self.anon_key.expose_secret(),
            |s| s.access_token.expose_secret(),
        );
        builder
            .header("apikey", self.anon_key.expose_secret())
            .bearer_auth(bearer)
    }

    async fn send(builder: RequestBuilder) -> Result<Response, GatewayError> {
        let response = builder
            .send()
            .await
            .map_err(|e| GatewayError::Request(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let text = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&text)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("Unknown error")
                    .to_string()
            });

        error!(status = status.as_u16(), message = %message, "Supabase API error");
        Err(GatewayError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn json<T: serde::de::DeserializeOwned>(response: Response) -> Result<T, GatewayError> {
        response
            .json()
            .await
            .map_err(|e| GatewayError::Response(e.to_string()))
    }

    async fn refresh(&self, session: &AuthSession) -> Result<AuthSession, GatewayError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "refresh_token");

        let body = serde_json::json!({
            "refresh_token": session.refresh_token.expose_secret(),
        });
        let response = Self::send(self.authorize(self.client.post(url), None).json(&body)).await?;
        let token: TokenResponse = Self::json(response).await?;

        debug!(user_id = %token.user.id, "Session refreshed");
        Ok(token.into())
    }
}

#[async_trait]
impl Gateway for SupabaseGateway {
    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<AuthSession, GatewayError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let grant = PasswordGrant {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let response = match Self::send(self.authorize(self.client.post(url), None).json(&grant))
            .await
        {
            Ok(response) => response,
            Err(GatewayError::Api { status, message }) if status == 400 || status == 401 => {
                return Err(GatewayError::Auth(message));
            }
            Err(e) => return Err(e),
        };

        let token: TokenResponse = Self::json(response).await?;
        debug!(user_id = %token.user.id, "Signed in");
        Ok(token.into())
    }

    #[instrument(skip(self, password, profile), fields(email = %email, role = %profile.role))]
    async fn sign_up(
        &self,
        email: &Email,
        password: &SecretString,
        profile: &SignUpProfile,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let request = SignUpRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            data: profile,
        };
        let url = self.endpoint("auth/v1/signup")?;
        let response = Self::send(self.authorize(self.client.post(url), None).json(&request)).await?;

        // With email confirmation on, GoTrue answers with the bare user.
        let body: Value = Self::json(response).await?;
        if body.get("access_token").is_none() {
            debug!("Sign-up pending email confirmation");
            return Ok(None);
        }

        let token: TokenResponse =
            serde_json::from_value(body).map_err(|e| GatewayError::Response(e.to_string()))?;
        debug!(user_id = %token.user.id, "Signed up");
        Ok(Some(token.into()))
    }

    #[instrument(skip(self, session), fields(user_id = %session.identity.user_id))]
    async fn sign_out(&self, session: &AuthSession) -> Result<(), GatewayError> {
        let url = self.endpoint("auth/v1/logout")?;
        Self::send(self.authorize(self.client.post(url), Some(session))).await?;
        Ok(())
    }

    #[instrument(skip(self, session), fields(user_id = %session.identity.user_id))]
    async fn current_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError> {
        let session = if session.needs_refresh(Utc::now()) {
            match self.refresh_session(session).await? {
                Some(refreshed) => refreshed,
                None => return Ok(None),
            }
        } else {
            session.clone()
        };

        let url = self.endpoint("auth/v1/user")?;
        match Self::send(self.authorize(self.client.get(url), Some(&session))).await {
            Ok(_) => Ok(Some(session)),
            Err(e) if e.is_unauthorized() => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, session), fields(user_id = %session.identity.user_id))]
    async fn refresh_session(
        &self,
        session: &AuthSession,
    ) -> Result<Option<AuthSession>, GatewayError> {
        match self.refresh(session).await {
            Ok(refreshed) => Ok(Some(refreshed)),
            Err(e) if e.is_unauthorized() || matches!(e, GatewayError::Api { status: 400, .. }) => {
                debug!("Refresh token rejected");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    #[instrument(skip(self, session, query), fields(table = %query.table))]
    async fn select(
        &self,
        session: &AuthSession,
        query: &TableQuery,
    ) -> Result<Vec<Value>, GatewayError> {
        let url = self.table_url(query.table)?;
        let builder = self.client.get(url).query(&query.to_params());
        let response = Self::send(self.authorize(builder, Some(session))).await?;
        let rows: Vec<Value> = Self::json(response).await?;

        debug!(rows = rows.len(), "Selected rows");
        Ok(rows)
    }

    #[instrument(skip(self, session, rows), fields(table = %table, rows = rows.len()))]
    async fn insert(
        &self,
        session: &AuthSession,
        table: Table,
        rows: Vec<Value>,
    ) -> Result<Vec<Value>, GatewayError> {
        let url = self.table_url(table)?;
        let builder = self
            .client
            .post(url)
            .header("Prefer", "return=representation")
            .json(&rows);
        let response = Self::send(self.authorize(builder, Some(session))).await?;
        Self::json(response).await
    }

    #[instrument(skip(self, session, query, patch), fields(table = %query.table))]
    async fn update(
        &self,
        session: &AuthSession,
        query: &TableQuery,
        patch: Value,
    ) -> Result<(), GatewayError> {
        let url = self.table_url(query.table)?;
        let builder = self
            .client
            .patch(url)
            .query(&query.filter_params())
            .json(&patch);
        Self::send(self.authorize(builder, Some(session))).await?;
        Ok(())
    }

    #[instrument(skip(self, session, query), fields(table = %query.table))]
    async fn delete(&self, session: &AuthSession, query: &TableQuery) -> Result<(), GatewayError> {
        let url = self.table_url(query.table)?;
        let builder = self.client.delete(url).query(&query.filter_params());
        Self::send(self.authorize(builder, Some(session))).await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn gateway(url: &str) -> SupabaseGateway {
        SupabaseGateway::new(&GatewayConfig {
            url: Url::parse(url).unwrap(),
            anon_key: SecretString::from("anon-key"),
        })
        .unwrap()
    }

    #[test]
    fn test_table_url() {
        let gw = gateway("https://abc.supabase.co");
        assert_eq!(
            gw.table_url(Table::Notifications).unwrap().as_str(),
            "https://abc.supabase.co/rest/v1/notifications"
        );
        assert_eq!(
            gw.endpoint("auth/v1/signup").unwrap().as_str(),
            "https://abc.supabase.co/auth/v1/signup"
        );
    }

    #[test]
    fn test_error_body_message_precedence() {
        let body: ErrorBody = serde_json::from_str(
            r#"{"error":"invalid_grant","error_description":"Invalid login credentials"}"#,
        )
        .unwrap();
        assert_eq!(body.into_message().as_deref(), Some("Invalid login credentials"));

        let body: ErrorBody =
            serde_json::from_str(r#"{"code":"23505","message":"duplicate key value"}"#).unwrap();
        assert_eq!(body.into_message().as_deref(), Some("duplicate key value"));

        assert!(ErrorBody::default().into_message().is_none());
    }

    #[test]
    fn test_token_response_into_session() {
        let token: TokenResponse = serde_json::from_value(serde_json::json!({
            "access_token": "jwt",
            "token_type": "bearer",
            "expires_in": 3600,
            "refresh_token": "r1",
            "user": {
                "id": "0b9f3f0e-7a55-4c1e-9d42-2f1c7b1d9a10",
                "email": "sam@proxima.services"
            }
        }))
        .unwrap();
        let session: AuthSession = token.into();
        assert_eq!(session.identity.email, "sam@proxima.services");
        assert!(!session.needs_refresh(Utc::now()));
    }

    #[test]
    fn test_debug_redacts_key() {
        let gw = gateway("https://abc.supabase.co");
        assert!(!format!("{gw:?}").contains("anon-key"));
    }
}
