//! User profile handlers
//!
//! Both routes sit behind the request gate. The gate only establishes who is
//! calling; it does not restrict which profile may be read.

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::models::UserProfile;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    Extension, Json,
};
use std::sync::Arc;

/// Get the caller's own profile
#[utoipa::path(
    get,
    path = "/api/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
        (status = 404, description = "User no longer exists", body = crate::error::ApiError),
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> Result<impl IntoResponse, AppError> {
    find_profile(&state, user.user_id).await.map(Json)
}

/// Get a user's profile by id
#[utoipa::path(
    get,
    path = "/api/users/{id}",
    tag = "users",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User profile", body = UserProfile),
        (status = 401, description = "Not authenticated", body = crate::error::ApiError),
        (status = 404, description = "User not found", body = crate::error::ApiError),
    )
)]
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    Path(id): Path<u64>,
) -> Result<impl IntoResponse, AppError> {
    tracing::debug!(caller = user.user_id, target_id = id, "profile lookup");
    find_profile(&state, id).await.map(Json)
}

async fn find_profile(state: &AppState, id: u64) -> Result<UserProfile, AppError> {
    state
        .directory
        .find_by_id(id)
        .await?
        .map(UserProfile::from)
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))
}
