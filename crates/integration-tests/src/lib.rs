//! Integration test harness for the ProximaGo desk.
//!
//! Everything runs in-process against [`MemoryGateway`]; no backend or
//! listener is needed.
//!
//! - [`Harness`] drives the service layer directly
//! - [`Browser`] drives the router with a session cookie, like a real browser

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    http::{Request, Response, StatusCode, header},
};
use secrecy::SecretString;
use tower::ServiceExt;

use proxima_core::{Role, TicketDraft, UserId};
use proxima_desk::config::DeskConfig;
use proxima_desk::gateway::{Gateway, MemoryGateway};
use proxima_desk::services::DeskService;
use proxima_desk::state::AppState;
use proxima_desk::store::DeskEntry;

/// Password every seeded user signs in with.
pub const PASSWORD: &str = "correct-horse";

/// Upper bound on response bodies read by tests.
const BODY_LIMIT: usize = 1024 * 1024;

/// A shared in-memory backend plus helpers to seed it.
#[derive(Clone, Default)]
pub struct Harness {
    pub gateway: Arc<MemoryGateway>,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user whose username is the local part of `email`.
    pub async fn user(&self, email: &str, role: Role) -> UserId {
        let username = email.split('@').next().unwrap_or(email);
        self.gateway.add_user(email, PASSWORD, username, role).await
    }

    #[must_use]
    pub fn service(&self) -> DeskService<'_> {
        DeskService::new(Some(self.gateway.as_ref()))
    }

    /// A desk signed in as `email`.
    pub async fn signed_in(&self, email: &str) -> DeskEntry {
        let mut entry = DeskEntry::default();
        let service = self.service();
        service.resolve(&mut entry).await;
        service
            .sign_in(&mut entry, email, &SecretString::from(PASSWORD))
            .await;
        assert!(
            entry.desk.identity().is_some(),
            "sign-in failed: {:?}",
            entry.desk.ui.auth_error
        );
        entry
    }

    /// Application state backed by this harness's gateway.
    #[must_use]
    pub fn state(&self) -> AppState {
        let gateway: Arc<dyn Gateway> = self.gateway.clone();
        AppState::with_gateway(DeskConfig::local(), Some(gateway))
    }
}

/// A draft with the given title and a one-line description.
#[must_use]
pub fn draft(title: &str) -> TicketDraft {
    TicketDraft {
        title: title.to_string(),
        description: format!("{title} since this morning"),
        ..TicketDraft::default()
    }
}

/// One browser: a router plus the session cookie it was handed.
pub struct Browser {
    app: Router,
    cookie: Option<String>,
}

impl Browser {
    #[must_use]
    pub fn new(state: AppState) -> Self {
        Self {
            app: proxima_desk::app(state),
            cookie: None,
        }
    }

    /// A browser on a desk with no backend configured.
    #[must_use]
    pub fn unconfigured() -> Self {
        Self::new(AppState::with_gateway(DeskConfig::local(), None))
    }

    async fn send(&mut self, request: Request<Body>) -> Response<Body> {
        let response = self
            .app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        if let Some(value) = response.headers().get(header::SET_COOKIE) {
            let cookie = value
                .to_str()
                .expect("cookie is ascii")
                .split(';')
                .next()
                .unwrap_or_default()
                .to_string();
            self.cookie = Some(cookie);
        }
        response
    }

    fn request(&self, method: &str, path: &str) -> axum::http::request::Builder {
        let builder = Request::builder().method(method).uri(path);
        match &self.cookie {
            Some(cookie) => builder.header(header::COOKIE, cookie),
            None => builder,
        }
    }

    pub async fn get(&mut self, path: &str) -> Response<Body> {
        let request = self
            .request("GET", path)
            .body(Body::empty())
            .expect("valid request");
        self.send(request).await
    }

    /// GET a page and return its status and body.
    pub async fn page(&mut self, path: &str) -> (StatusCode, String) {
        let response = self.get(path).await;
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), BODY_LIMIT)
            .await
            .expect("readable body");
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    /// POST a urlencoded form.
    pub async fn post(&mut self, path: &str, fields: &[(&str, &str)]) -> Response<Body> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields)
            .finish();
        let request = self
            .request("POST", path)
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(body))
            .expect("valid request");
        self.send(request).await
    }

    pub async fn sign_in(&mut self, email: &str) -> Response<Body> {
        self.post("/auth/login", &[("email", email), ("password", PASSWORD)])
            .await
    }
}
