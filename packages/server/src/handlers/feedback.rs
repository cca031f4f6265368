use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::access::Permission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::extractors::json::AppJson;
use crate::models::feedback::*;
use crate::services;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/feedback",
    tag = "Feedback",
    operation_id = "submitFeedback",
    summary = "Leave feedback on an event",
    description = "Appends a rating (1-5) and optional comment. Requires `feedback:submit` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = FeedbackRequest,
    responses(
        (status = 201, description = "Feedback stored", body = FeedbackItem),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, payload), fields(rating = payload.rating))]
pub async fn submit_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    AppJson(payload): AppJson<FeedbackRequest>,
) -> Result<impl IntoResponse, AppError> {
    auth_user.require_permission(Permission::FeedbackSubmit)?;

    let model =
        services::feedback::submit(&state, &auth_user, id, payload.rating, &payload.comment)
            .await?;
    Ok((
        StatusCode::CREATED,
        Json(FeedbackItem {
            id: model.id,
            user_id: model.user_id,
            author: auth_user.full_name(),
            rating: model.rating,
            comment: model.comment,
            created_at: model.created_at,
        }),
    ))
}

#[utoipa::path(
    get,
    path = "/{id}/feedback",
    tag = "Feedback",
    operation_id = "listFeedback",
    summary = "List feedback for an event",
    description = "Newest first, with the average rating. Requires `feedback:view_all` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Feedback", body = FeedbackListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_feedback(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<FeedbackListResponse>, AppError> {
    auth_user.require_permission(Permission::FeedbackViewAll)?;

    Ok(Json(services::feedback::list(&state.db, id).await?))
}
