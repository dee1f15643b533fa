//! Borrow request endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        request::{CreateBorrowRequest, UpdateRequestStatus},
        BorrowRequest, Panel, RequestFilter, RequestStatus,
    },
};

use super::AuthenticatedUser;

/// List all requests (staff)
#[utoipa::path(
    get,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(RequestFilter),
    responses(
        (status = 200, description = "Matching requests, oldest first", body = Vec<BorrowRequest>),
        (status = 403, description = "Approvals panel required", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(filter): Query<RequestFilter>,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_panel(Panel::Approvals)?;
    let requests = state.services.requests.list(&filter).await?;
    Ok(Json(requests))
}

/// The caller's own requests
#[utoipa::path(
    get,
    path = "/requests/mine",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Caller's requests", body = Vec<BorrowRequest>)
    )
)]
pub async fn my_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_panel(Panel::MyRequests)?;
    let requests = state
        .services
        .requests
        .list_for_user(claims.user_id())
        .await?;
    Ok(Json(requests))
}

/// Requests waiting for a staff decision
#[utoipa::path(
    get,
    path = "/requests/pending",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Pending requests, oldest first", body = Vec<BorrowRequest>),
        (status = 403, description = "Approvals panel required", body = crate::error::ErrorResponse)
    )
)]
pub async fn pending_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_panel(Panel::Approvals)?;
    let requests = state.services.requests.pending().await?;
    Ok(Json(requests))
}

/// Approved loans not yet returned
#[utoipa::path(
    get,
    path = "/requests/active",
    tag = "requests",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Active loans, oldest first", body = Vec<BorrowRequest>),
        (status = 403, description = "Approvals panel required", body = crate::error::ErrorResponse)
    )
)]
pub async fn active_requests(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
) -> AppResult<Json<Vec<BorrowRequest>>> {
    claims.require_panel(Panel::Approvals)?;
    let requests = state.services.requests.active_loans().await?;
    Ok(Json(requests))
}

/// Submit a borrow request
#[utoipa::path(
    post,
    path = "/requests",
    tag = "requests",
    security(("bearer_auth" = [])),
    request_body = CreateBorrowRequest,
    responses(
        (status = 201, description = "Request created as pending", body = BorrowRequest),
        (status = 400, description = "Invalid quantity", body = crate::error::ErrorResponse),
        (status = 404, description = "Equipment not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Not enough available", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(data): Json<CreateBorrowRequest>,
) -> AppResult<(StatusCode, Json<BorrowRequest>)> {
    claims.require_panel(Panel::Catalog)?;
    let request = state
        .services
        .requests
        .create(claims.user_id(), &claims.name, data)
        .await?;
    Ok((StatusCode::CREATED, Json(request)))
}

/// Get one request; staff see all, others only their own
#[utoipa::path(
    get,
    path = "/requests/{id}",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Request ID")),
    responses(
        (status = 200, description = "Request details", body = BorrowRequest),
        (status = 403, description = "Not the owner", body = crate::error::ErrorResponse),
        (status = 404, description = "Request not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_request(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<BorrowRequest>> {
    let request = state.services.requests.get(id).await?;
    if request.user_id != claims.user_id() {
        claims.require_panel(Panel::Approvals)?;
    }
    Ok(Json(request))
}

/// Approve, reject or mark a request returned
#[utoipa::path(
    patch,
    path = "/requests/{id}/status",
    tag = "requests",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Request ID")),
    request_body = UpdateRequestStatus,
    responses(
        (status = 200, description = "Request updated", body = BorrowRequest),
        (status = 400, description = "Unknown status", body = crate::error::ErrorResponse),
        (status = 403, description = "Approvals panel required", body = crate::error::ErrorResponse),
        (status = 409, description = "Transition or stock refused", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_request_status(
    State(state): State<crate::AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateRequestStatus>,
) -> AppResult<Json<BorrowRequest>> {
    claims.require_panel(Panel::Approvals)?;

    let status: RequestStatus = body.status.parse().map_err(AppError::BadRequest)?;
    let approver = body
        .approved_by
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .unwrap_or(claims.name.as_str());

    let request = state
        .services
        .requests
        .update_status(id, status, approver)
        .await?;
    Ok(Json(request))
}
