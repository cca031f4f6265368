use axum::Json;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use tracing::instrument;

use crate::access::Permission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::rsvp::*;
use crate::services;
use crate::state::AppState;

#[utoipa::path(
    post,
    path = "/{id}/rsvp",
    tag = "RSVPs",
    operation_id = "setRsvp",
    summary = "RSVP to an event",
    description = "Creates or overwrites the caller's RSVP: a truthy `going` records `going`, anything else (including a missing or non-JSON body) `cancelled`. Requires `rsvp:own` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body = RsvpRequest,
    responses(
        (status = 200, description = "RSVP stored", body = RsvpResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, body), fields(user_id = auth_user.user_id))]
pub async fn set_rsvp(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    body: Bytes,
) -> Result<Json<RsvpResponse>, AppError> {
    auth_user.require_permission(Permission::RsvpOwn)?;

    let payload = RsvpRequest::from_body(&body);
    let status = services::rsvps::set_rsvp(&state, &auth_user, id, payload.going).await?;
    Ok(Json(RsvpResponse {
        message: "RSVP updated".into(),
        event_id: id,
        status,
    }))
}

#[utoipa::path(
    delete,
    path = "/{id}/rsvp",
    tag = "RSVPs",
    operation_id = "removeRsvp",
    summary = "Withdraw an RSVP",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 204, description = "RSVP removed"),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 404, description = "Event or RSVP not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn remove_rsvp(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<StatusCode, AppError> {
    auth_user.require_permission(Permission::RsvpOwn)?;

    services::rsvps::remove_rsvp(&state, &auth_user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/{id}/rsvps",
    tag = "RSVPs",
    operation_id = "listAttendees",
    summary = "List attendees of an event",
    description = "Users whose RSVP is `going`, ordered by name. Requires `rsvp:view_all` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Attendees", body = AttendeeListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user))]
pub async fn list_attendees(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Json<AttendeeListResponse>, AppError> {
    auth_user.require_permission(Permission::RsvpViewAll)?;

    let attendees = services::rsvps::attendees(&state.db, id).await?;
    Ok(Json(AttendeeListResponse {
        event_id: id,
        total: attendees.len() as u64,
        attendees,
    }))
}

#[utoipa::path(
    get,
    path = "/rsvps",
    tag = "RSVPs",
    operation_id = "listMyRsvps",
    summary = "List my RSVPs",
    description = "The caller's `going` RSVPs, soonest event first.",
    responses(
        (status = 200, description = "The caller's RSVPs", body = MyRsvpListResponse),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user), fields(user_id = auth_user.user_id))]
pub async fn my_rsvps(
    auth_user: AuthUser,
    State(state): State<AppState>,
) -> Result<Json<MyRsvpListResponse>, AppError> {
    auth_user.require_permission(Permission::RsvpOwn)?;

    let rsvps = services::rsvps::my_rsvps(&state.db, auth_user.user_id).await?;
    Ok(Json(MyRsvpListResponse { rsvps }))
}
