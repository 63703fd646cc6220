//! Sign-in and sign-out.

use axum::{Form, extract::State, response::Redirect};
use secrecy::SecretString;
use serde::Deserialize;

use crate::error::Result;
use crate::middleware::CurrentDesk;
use crate::state::AppState;

use super::done;

/// Login form data.
#[derive(Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Sign in. Rejections show up inline on the login form.
pub async fn login(
    State(state): State<AppState>,
    mut desk: CurrentDesk,
    Form(form): Form<LoginForm>,
) -> Result<Redirect> {
    let password = SecretString::from(form.password);
    state
        .service()
        .sign_in(&mut desk, &form.email, &password)
        .await;
    done(&desk).await
}

pub async fn logout(State(state): State<AppState>, mut desk: CurrentDesk) -> Result<Redirect> {
    state.service().sign_out(&mut desk).await;
    done(&desk).await
}
