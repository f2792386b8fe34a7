//! Auth handlers

use crate::config::AppState;
use crate::error::Result;
use crate::models::UserInfo;
use axum::{extract::State, http::StatusCode, Form, Json};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Deserialize)]
pub struct CredentialsForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub flash: &'static str,
    pub user: UserInfo,
}

/// POST /signup
pub async fn signup(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<(StatusCode, Json<AuthResponse>)> {
    info!("POST /signup - {}", form.username);

    let user = state.auth.signup(&form.username, &form.password).await?;

    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            flash: "Signed up!",
            user: user.into(),
        }),
    ))
}

/// POST /auth
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<CredentialsForm>,
) -> Result<Json<AuthResponse>> {
    info!("POST /auth - {}", form.username);

    let user = state.auth.login(&form.username, &form.password).await?;

    Ok(Json(AuthResponse {
        flash: "Logged in!",
        user: user.into(),
    }))
}
