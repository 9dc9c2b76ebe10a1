//! Registration and login handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use stockroom_core::UserRole;

use super::JsonBody;
use crate::error::Result;
use crate::middleware::{Guard, OptionalAuth, authorize};
use crate::models::User;
use crate::services::auth::Registration;
use crate::state::AppState;

/// Login form data.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Successful login.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub user: User,
}

/// Handle registration.
///
/// Creating an admin needs an admin bearer token unless open admin signup
/// is configured.
pub async fn register(
    State(state): State<AppState>,
    OptionalAuth(claims): OptionalAuth,
    JsonBody(registration): JsonBody<Registration>,
) -> Result<(StatusCode, Json<User>)> {
    let wants_admin = registration
        .role
        .as_deref()
        .is_some_and(|role| role.trim().parse::<UserRole>().is_ok_and(UserRole::is_admin));

    if wants_admin && !state.allow_admin_signup() {
        authorize(claims.as_ref(), &[Guard::Admin])?;
    }

    let user = state.auth().register(registration).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handle login.
pub async fn login(
    State(state): State<AppState>,
    JsonBody(form): JsonBody<LoginRequest>,
) -> Result<Json<LoginResponse>> {
    let (token, user) = state.auth().login(&form.username, &form.password).await?;
    tracing::info!(user_id = %user.id, "User logged in");
    Ok(Json(LoginResponse { token, user }))
}
