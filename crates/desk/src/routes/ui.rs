//! Pure UI transitions: navigation, menus, modals, filters.
//!
//! None of these touch the backend.

use axum::{Form, extract::State, response::Redirect};
use serde::Deserialize;

use proxima_core::desk::{ActiveOverlay, DeskEvent, Modal, Tab};
use proxima_core::views::{DateRange, SortOrder};
use proxima_core::{Category, TicketStatus};

use crate::error::{AppError, Result};
use crate::middleware::CurrentDesk;
use crate::state::AppState;

use super::{done, settle};

/// Value posted by a filter menu to clear that filter.
const ALL: &str = "all";

#[derive(Debug, Deserialize)]
pub struct TabForm {
    pub tab: Tab,
}

#[derive(Debug, Deserialize)]
pub struct OverlayForm {
    pub overlay: ActiveOverlay,
}

#[derive(Debug, Deserialize)]
pub struct ModalForm {
    pub modal: String,
}

/// Any subset of the registry inputs.
#[derive(Debug, Default, Deserialize)]
pub struct FilterForm {
    pub search: Option<String>,
    pub category: Option<String>,
    pub status: Option<String>,
    pub sort: Option<SortOrder>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeForm {
    pub range: DateRange,
}

/// Parse a filter value; blank or `all` clears the filter.
fn filter_value<T>(raw: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let raw = raw.trim();
    if raw.is_empty() || raw == ALL {
        return Ok(None);
    }
    raw.parse()
        .map(Some)
        .map_err(|e: T::Err| AppError::BadRequest(e.to_string()))
}

pub async fn navigate(mut desk: CurrentDesk, Form(form): Form<TabForm>) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::Navigate(form.tab));
    done(&desk).await
}

pub async fn toggle_overlay(
    mut desk: CurrentDesk,
    Form(form): Form<OverlayForm>,
) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::ToggleOverlay(form.overlay));
    done(&desk).await
}

pub async fn close_overlay(mut desk: CurrentDesk) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::CloseOverlay);
    done(&desk).await
}

/// Open the create-ticket or create-account modal.
///
/// The delete confirmation has its own route.
pub async fn open_modal(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
    Form(form): Form<ModalForm>,
) -> Result<Redirect> {
    let modal = match form.modal.as_str() {
        "create-ticket" => Modal::CreateTicket,
        "create-account" => Modal::CreateAccount,
        other => return Err(AppError::BadRequest(format!("unknown modal: {other}"))),
    };
    let result = state.service().open_modal(&mut desk, modal);
    settle(desk, result).await
}

pub async fn close_modal(mut desk: CurrentDesk) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::CloseModal);
    done(&desk).await
}

pub async fn dismiss_alert(mut desk: CurrentDesk) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::DismissAlert);
    done(&desk).await
}

/// Apply whichever registry inputs the form carries.
pub async fn set_filters(mut desk: CurrentDesk, Form(form): Form<FilterForm>) -> Result<Redirect> {
    if let Some(search) = form.search {
        desk.desk.apply(DeskEvent::SearchChanged(search));
    }
    if let Some(category) = form.category {
        let category = filter_value::<Category>(&category)?;
        desk.desk.apply(DeskEvent::CategoryFilterChanged(category));
    }
    if let Some(status) = form.status {
        let status = filter_value::<TicketStatus>(&status)?;
        desk.desk.apply(DeskEvent::StatusFilterChanged(status));
    }
    if let Some(sort) = form.sort {
        desk.desk.apply(DeskEvent::SortChanged(sort));
    }
    done(&desk).await
}

pub async fn reset_filters(mut desk: CurrentDesk) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::FiltersReset);
    done(&desk).await
}

pub async fn set_date_range(
    mut desk: CurrentDesk,
    Form(form): Form<DateRangeForm>,
) -> Result<Redirect> {
    desk.desk.apply(DeskEvent::DateRangeChanged(form.range));
    done(&desk).await
}
