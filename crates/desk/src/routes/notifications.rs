//! Notification intents.

use axum::{
    extract::{Path, State},
    response::Redirect,
};

use proxima_core::NotificationId;

use crate::error::Result;
use crate::middleware::CurrentDesk;
use crate::state::AppState;

use super::settle;

pub async fn open(
    State(state): State<AppState>,
    Path(id): Path<NotificationId>,
    mut desk: CurrentDesk,
) -> Result<Redirect> {
    let result = state.service().open_notification(&mut desk, id).await;
    settle(desk, result).await
}

pub async fn clear(State(state): State<AppState>, mut desk: CurrentDesk) -> Result<Redirect> {
    let result = state.service().clear_notifications(&mut desk).await;
    settle(desk, result).await
}
