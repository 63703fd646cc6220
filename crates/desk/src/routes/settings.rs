//! Settings tab intents.

use axum::{Form, extract::State, response::Redirect};

use crate::error::Result;
use crate::middleware::CurrentDesk;
use crate::services::ProfileForm;
use crate::state::AppState;

use super::settle;

pub async fn update_profile(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
    Form(form): Form<ProfileForm>,
) -> Result<Redirect> {
    let result = state.service().update_profile(&mut desk, form).await;
    settle(desk, result).await
}

pub async fn archive_resolved(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
) -> Result<Redirect> {
    let result = state.service().archive_resolved(&mut desk).await;
    settle(desk, result).await
}
