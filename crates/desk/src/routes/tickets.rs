//! Ticket intents.

use axum::{
    Form,
    extract::{Path, State},
    response::Redirect,
};
use serde::Deserialize;

use proxima_core::{TicketDraft, TicketId, TicketStatus};

use crate::error::Result;
use crate::middleware::CurrentDesk;
use crate::state::AppState;

use super::settle;

#[derive(Debug, Deserialize)]
pub struct StatusForm {
    pub status: TicketStatus,
}

#[derive(Debug, Deserialize)]
pub struct CommentForm {
    pub text: String,
}

pub async fn create(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
    Form(draft): Form<TicketDraft>,
) -> Result<Redirect> {
    let result = state.service().create_ticket(&mut desk, draft).await;
    settle(desk, result).await
}

pub async fn open(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    mut desk: CurrentDesk,
) -> Result<Redirect> {
    let result = state.service().open_ticket(&mut desk, id).await;
    settle(desk, result).await
}

pub async fn change_status(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    mut desk: CurrentDesk,
    Form(form): Form<StatusForm>,
) -> Result<Redirect> {
    let result = state
        .service()
        .change_status(&mut desk, id, form.status)
        .await;
    settle(desk, result).await
}

pub async fn request_delete(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    mut desk: CurrentDesk,
) -> Result<Redirect> {
    let result = state.service().request_delete(&mut desk, id);
    settle(desk, result).await
}

pub async fn confirm_delete(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
) -> Result<Redirect> {
    let result = state.service().confirm_delete(&mut desk).await;
    settle(desk, result).await
}

pub async fn add_comment(
    State(state): State<AppState>,
    Path(id): Path<TicketId>,
    mut desk: CurrentDesk,
    Form(form): Form<CommentForm>,
) -> Result<Redirect> {
    let result = state.service().add_comment(&mut desk, id, &form.text).await;
    settle(desk, result).await
}
