//! User management handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};

use stockroom_core::UserId;

use super::{JsonBody, MessageResponse, PageQuery, PathParam, QueryParams};
use crate::error::Result;
use crate::middleware::{Guard, RequireAuth, authorize};
use crate::models::{Pagination, User};
use crate::services::auth::ProfileUpdate;
use crate::state::AppState;

/// Body of `POST /users/change-password`.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub old_password: String,
    pub new_password: String,
}

/// Paginated user listing.
#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub limit: i64,
    pub offset: i64,
}

/// The caller's own profile.
pub async fn profile(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
) -> Result<Json<User>> {
    Ok(Json(state.auth().get_user(claims.user_id).await?))
}

/// Change the caller's password.
pub async fn change_password(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    JsonBody(body): JsonBody<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>> {
    state
        .auth()
        .change_password(claims.user_id, &body.old_password, &body.new_password)
        .await?;

    Ok(Json(MessageResponse {
        message: "Password changed successfully",
    }))
}

/// List users. Admin only.
pub async fn index(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    QueryParams(query): QueryParams<PageQuery>,
) -> Result<Json<UserList>> {
    authorize(Some(&claims), &[Guard::Admin])?;

    let page = Pagination::from(query);
    let users = state.auth().list_users(page).await?;
    Ok(Json(UserList {
        users,
        limit: page.limit,
        offset: page.offset,
    }))
}

/// Show a user. Owner or admin.
pub async fn show(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<UserId>,
) -> Result<Json<User>> {
    authorize(Some(&claims), &[Guard::OwnerOrAdmin(id)])?;
    Ok(Json(state.auth().get_user(id).await?))
}

/// Update a user's profile. Owner or admin; only admins may change roles.
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<UserId>,
    JsonBody(update): JsonBody<ProfileUpdate>,
) -> Result<Json<User>> {
    authorize(Some(&claims), &[Guard::OwnerOrAdmin(id)])?;
    if update.role.is_some() {
        authorize(Some(&claims), &[Guard::Admin])?;
    }

    Ok(Json(state.auth().update_profile(id, update).await?))
}

/// Delete a user. Admin only, and never the caller's own account.
pub async fn destroy(
    State(state): State<AppState>,
    RequireAuth(claims): RequireAuth,
    PathParam(id): PathParam<UserId>,
) -> Result<StatusCode> {
    authorize(Some(&claims), &[Guard::Admin, Guard::NotSelf(id)])?;
    state.auth().delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
