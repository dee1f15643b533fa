//! User management endpoints

use axum::{extract::State, http::StatusCode, Json};

use crate::{
    error::AppResult,
    models::{user::CreateUser, Panel, UserInfo},
};

use super::AuthenticatedUser;

/// Create an account with any role
#[utoipa::path(
    post,
    path = "/users",
    tag = "users",
    security(("bearer_auth" = [])),
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = UserInfo),
        (status = 400, description = "Invalid input", body = crate::error::ErrorResponse),
        (status = 403, description = "Admin only", body = crate::error::ErrorResponse),
        (status = 409, description = "Email already exists", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_user(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(user): Json<CreateUser>,
) -> AppResult<(StatusCode, Json<UserInfo>)> {
    claims.require_panel(Panel::Admin)?;

    let created = state.services.users.create_user(user).await?;
    Ok((StatusCode::CREATED, Json(UserInfo::from(&created))))
}
