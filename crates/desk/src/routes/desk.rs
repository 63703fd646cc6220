//! Rendering the desk.
//!
//! `GET /` renders the login view or the signed-in shell with whichever tab,
//! menu and modal the desk has open.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::State,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;

use proxima_core::desk::{Desk, DeskEvent, Modal};
use proxima_core::views::{DashboardSummary, DateRange, SortOrder};
use proxima_core::{
    Capabilities, Category, Notification, Profile, Role, Ticket, TicketDraft, TicketPriority,
    TicketStatus, TicketType,
};

use crate::error::Result;
use crate::filters;
use crate::middleware::CurrentDesk;
use crate::state::AppState;

use super::done;

// =============================================================================
// View Types
// =============================================================================

/// One option of a menu or select.
#[derive(Debug, Clone)]
pub struct Choice {
    pub value: &'static str,
    pub label: &'static str,
    pub selected: bool,
}

impl Choice {
    fn list<T: Copy + PartialEq>(
        all: &[T],
        current: Option<T>,
        value: impl Fn(T) -> &'static str,
        label: impl Fn(T) -> &'static str,
    ) -> Vec<Self> {
        all.iter()
            .map(|&item| Self {
                value: value(item),
                label: label(item),
                selected: current == Some(item),
            })
            .collect()
    }

    /// Options labelled with their wire value.
    fn labels<T: Copy + PartialEq>(
        all: &[T],
        current: Option<T>,
        name: fn(T) -> &'static str,
    ) -> Vec<Self> {
        Self::list(all, current, name, name)
    }
}

/// One histogram column.
#[derive(Debug, Clone)]
pub struct Bar {
    pub label: String,
    pub count: usize,
    /// Height relative to the busiest day, in percent.
    pub height: usize,
}

impl Bar {
    fn from_summary(summary: &DashboardSummary) -> Vec<Self> {
        let peak = summary.peak().max(1);
        summary
            .buckets
            .iter()
            .map(|b| Self {
                label: b.label.clone(),
                count: b.count,
                height: b.count * 100 / peak,
            })
            .collect()
    }
}

// =============================================================================
// Templates
// =============================================================================

/// Login view.
#[derive(Template, WebTemplate)]
#[template(path = "desk/login.html")]
pub struct LoginTemplate {
    /// False when no backend is configured: the form is disabled.
    pub configured: bool,
    pub auth_error: Option<String>,
    pub alert: Option<String>,
}

/// The signed-in shell.
#[derive(Template)]
#[template(path = "desk/app.html")]
pub struct AppTemplate<'a> {
    pub tab: &'static str,
    pub overlay: &'static str,
    pub has_overlay: bool,
    /// `none`, `create-ticket`, `create-account` or `confirm-delete`.
    pub modal: &'static str,
    pub caps: Capabilities,
    pub read_only: bool,
    pub profile: Option<&'a Profile>,
    pub email: &'a str,
    pub display_name: &'a str,
    pub initial: String,
    pub unread: usize,
    pub notifications: &'a [Notification],
    pub alert: Option<&'a str>,
    // Tickets tab
    pub registry: Vec<&'a Ticket>,
    pub search: &'a str,
    pub has_filters: bool,
    pub category_label: &'static str,
    pub status_label: &'static str,
    pub sort_label: &'static str,
    pub category_choices: Vec<Choice>,
    pub status_choices: Vec<Choice>,
    pub sort_choices: Vec<Choice>,
    // Dashboard tab
    pub today: String,
    pub summary: DashboardSummary,
    pub completion_rate: u32,
    pub bars: Vec<Bar>,
    pub range_choices: Vec<Choice>,
    // Detail tab
    pub detail: Option<&'a Ticket>,
    pub detail_status_choices: Vec<Choice>,
    // Modals
    pub draft: &'a TicketDraft,
    pub type_choices: Vec<Choice>,
    pub priority_choices: Vec<Choice>,
    pub draft_category_choices: Vec<Choice>,
    pub role_choices: Vec<Choice>,
}

impl<'a> AppTemplate<'a> {
    fn new(desk: &'a Desk, email: &'a str) -> Self {
        let now = Utc::now();
        let caps = desk.capabilities();
        let query = &desk.filters.registry;
        let summary = desk.dashboard(now);
        let display_name = desk.profile.as_ref().map_or(email, Profile::reply_name);
        let initial = desk
            .profile
            .as_ref()
            .and_then(Profile::initial)
            .or_else(|| email.chars().next().map(|c| c.to_ascii_uppercase()))
            .map(String::from)
            .unwrap_or_default();
        let detail = desk.ui.detail.as_ref();

        Self {
            tab: desk.ui.active_tab.as_str(),
            overlay: desk.ui.overlay.as_str(),
            has_overlay: desk.ui.overlay.is_open(),
            modal: modal_name(desk.ui.modal),
            caps,
            read_only: caps.is_read_only(),
            profile: desk.profile.as_ref(),
            email,
            display_name,
            initial,
            unread: desk.unread_count(),
            notifications: &desk.cache.notifications,
            alert: desk.ui.alert.as_deref(),
            registry: desk.registry(),
            search: &query.search,
            has_filters: query.has_filters(),
            category_label: query.category.map_or("Category", Category::as_str),
            status_label: query.status.map_or("Status", TicketStatus::as_str),
            sort_label: query.sort.label(),
            category_choices: Choice::labels(Category::ALL, query.category, Category::as_str),
            status_choices: Choice::labels(TicketStatus::ALL, query.status, TicketStatus::as_str),
            sort_choices: Choice::list(
                SortOrder::ALL,
                Some(query.sort),
                SortOrder::as_str,
                SortOrder::label,
            ),
            today: now.format("%A, %B %-d").to_string(),
            completion_rate: summary.completion_rate(),
            bars: Bar::from_summary(&summary),
            summary,
            range_choices: Choice::list(
                DateRange::ALL,
                Some(desk.filters.date_range),
                DateRange::as_str,
                DateRange::label,
            ),
            detail,
            detail_status_choices: Choice::labels(
                TicketStatus::ALL,
                detail.map(|t| t.status),
                TicketStatus::as_str,
            ),
            draft: &desk.ui.draft,
            type_choices: Choice::labels(
                TicketType::ALL,
                Some(desk.ui.draft.ticket_type),
                TicketType::as_str,
            ),
            priority_choices: Choice::labels(
                TicketPriority::ALL,
                Some(desk.ui.draft.priority),
                TicketPriority::as_str,
            ),
            draft_category_choices: Choice::labels(
                Category::ALL,
                Some(desk.ui.draft.category),
                Category::as_str,
            ),
            role_choices: Choice::labels(Role::ALL, Some(Role::default()), Role::as_str),
        }
    }
}

const fn modal_name(modal: Modal) -> &'static str {
    match modal {
        Modal::None => "none",
        Modal::CreateTicket => "create-ticket",
        Modal::CreateAccount => "create-account",
        Modal::ConfirmDelete(_) => "confirm-delete",
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Render the desk.
pub async fn show(State(state): State<AppState>, desk: CurrentDesk) -> Result<Response> {
    desk.save().await?;

    let Some(identity) = desk.desk.identity() else {
        let login = LoginTemplate {
            configured: state.gateway().is_some(),
            auth_error: desk.desk.ui.auth_error.clone(),
            alert: desk.desk.ui.alert.clone(),
        };
        return Ok(login.into_response());
    };

    let html = AppTemplate::new(&desk.desk, &identity.email).render()?;
    Ok(Html(html).into_response())
}

/// Drop the cache and fetch everything again.
pub async fn reload(mut desk: CurrentDesk) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::Reload);
    done(&desk).await
}
