use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use common::document::collections;
use common::summary::DailySummary;
use tracing::instrument;

use crate::access::Permission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::admin::*;
use crate::models::shared::LimitQuery;
use crate::services;
use crate::state::AppState;

#[utoipa::path(
    get,
    path = "/users",
    tag = "Admin",
    operation_id = "listUsers",
    summary = "List all users",
    description = "Ordered by first name. Requires `user:manage` permission.",
    responses(
        (status = 200, description = "All users", body = UserListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_users(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<UserListResponse>, AppError> {
    auth_user.require_permission(Permission::UserManage)?;

    let users = services::admin::list_users(&state.db)
        .await?
        .into_iter()
        .map(UserItem::from)
        .collect();
    Ok(Json(UserListResponse { users }))
}

#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    tag = "Admin",
    operation_id = "updateUserRole",
    summary = "Change a user's role",
    description = "The committee position is kept only for the committee role. Admins cannot change their own role. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Role updated", body = UserItem),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(role = %payload.role))]
pub async fn update_role(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<UpdateRoleRequest>,
) -> Result<Json<UserItem>, AppError> {
    auth_user.require_permission(Permission::UserManage)?;

    let user = services::admin::update_role(
        &state,
        &auth_user,
        id,
        payload.role,
        payload.committee_position.as_deref(),
    )
    .await?;
    Ok(Json(UserItem::from(user)))
}

#[utoipa::path(
    delete,
    path = "/users/{id}",
    tag = "Admin",
    operation_id = "deleteUser",
    summary = "Delete a user",
    description = "Removes the user with their RSVPs and feedback. Refused while the user still owns events. Requires `user:manage` permission.",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User deleted"),
        (status = 400, description = "Self-deletion (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "User not found (NOT_FOUND)", body = ErrorBody),
        (status = 409, description = "User still owns events (CONFLICT)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn delete_user(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(Permission::UserManage)?;

    services::admin::delete_user(&state, &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/logs",
    tag = "Admin",
    operation_id = "listActivityLogs",
    summary = "Recent activity logs",
    description = "Newest first. Entries may lag behind the actions that produced them. Requires `log:view` permission.",
    params(LimitQuery),
    responses(
        (status = 200, description = "Activity log entries", body = LogListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_logs(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<LogListResponse>, AppError> {
    auth_user.require_permission(Permission::LogView)?;

    let entries = services::admin::recent(&state, collections::ACTIVITY_LOGS, query.resolve())
        .await?
        .into_iter()
        .map(LogEntry::from)
        .collect();
    Ok(Json(LogListResponse { entries }))
}

#[utoipa::path(
    get,
    path = "/audit",
    tag = "Admin",
    operation_id = "listAuditRecords",
    summary = "Recent admin audit records",
    description = "Role changes and user deletions, newest first. Requires `log:view` permission.",
    params(LimitQuery),
    responses(
        (status = 200, description = "Audit records", body = LogListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, query))]
pub async fn list_audit(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Query(query): Query<LimitQuery>,
) -> Result<Json<LogListResponse>, AppError> {
    auth_user.require_permission(Permission::LogView)?;

    let entries = services::admin::recent(&state, collections::AUDIT_RECORDS, query.resolve())
        .await?
        .into_iter()
        .map(LogEntry::from)
        .collect();
    Ok(Json(LogListResponse { entries }))
}

#[utoipa::path(
    post,
    path = "/summaries",
    tag = "Admin",
    operation_id = "generateDailySummary",
    summary = "Generate today's summary now",
    description = "Ranks upcoming events by attendance and stores the result under today's UTC date. Requires `summary:manage` permission.",
    responses(
        (status = 200, description = "Generated summary", body = DailySummary),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn generate_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<DailySummary>, AppError> {
    auth_user.require_permission(Permission::SummaryManage)?;

    Ok(Json(services::admin::generate_summary(&state).await?))
}

#[utoipa::path(
    get,
    path = "/summaries/{date}",
    tag = "Admin",
    operation_id = "getDailySummary",
    summary = "Fetch a stored summary",
    description = "Requires `summary:manage` permission.",
    params(("date" = String, Path, description = "UTC date, YYYY-MM-DD")),
    responses(
        (status = 200, description = "Stored summary", body = DailySummary),
        (status = 400, description = "Malformed date (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "No summary for that date (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn get_summary(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(date): Path<String>,
) -> Result<Json<DailySummary>, AppError> {
    auth_user.require_permission(Permission::SummaryManage)?;

    Ok(Json(services::admin::get_summary(&state, &date).await?))
}
