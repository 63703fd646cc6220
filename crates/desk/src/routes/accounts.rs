//! Account creation (Admin only).

use axum::{Form, extract::State, response::Redirect};

use crate::error::Result;
use crate::middleware::CurrentDesk;
use crate::services::AccountForm;
use crate::state::AppState;

use super::settle;

/// Create an account. On success the backend may switch the session to
/// the new account; the desk then reloads as that user.
pub async fn create(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
    Form(form): Form<AccountForm>,
) -> Result<Redirect> {
    let result = state.service().create_account(&mut desk, form).await;
    settle(desk, result).await
}
