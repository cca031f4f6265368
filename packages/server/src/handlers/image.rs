use axum::Json;
use axum::extract::{DefaultBodyLimit, Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use tracing::instrument;

use crate::access::Permission;
use crate::error::{AppError, ErrorBody};
use crate::extractors::auth::AuthUser;
use crate::models::event::EventResponse;
use crate::services;
use crate::state::AppState;

/// Room for the multipart framing around the largest accepted image.
pub fn image_upload_body_limit(max_image_size: u64) -> DefaultBodyLimit {
    DefaultBodyLimit::max(max_image_size as usize + 64 * 1024)
}

#[utoipa::path(
    put,
    path = "/{id}/image",
    tag = "Event Images",
    operation_id = "uploadEventImage",
    summary = "Upload or replace an event image",
    description = "Multipart field `image` (png, jpg, jpeg or webp). Requires `event:edit` permission.",
    params(("id" = i32, Path, description = "Event ID")),
    request_body(content_type = "multipart/form-data", description = "Image upload"),
    responses(
        (status = 200, description = "Image stored", body = EventResponse),
        (status = 400, description = "Validation error (VALIDATION_ERROR)", body = ErrorBody),
        (status = 401, description = "Unauthorized (TOKEN_MISSING, TOKEN_INVALID)", body = ErrorBody),
        (status = 403, description = "Forbidden (PERMISSION_DENIED)", body = ErrorBody),
        (status = 404, description = "Event not found (NOT_FOUND)", body = ErrorBody),
        (status = 413, description = "Image too large (PAYLOAD_TOO_LARGE)", body = ErrorBody),
    ),
    security(("jwt" = [])),
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn upload_image(
    auth_user: AuthUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    mut multipart: Multipart,
) -> Result<Json<EventResponse>, AppError> {
    auth_user.require_permission(Permission::EventEdit)?;

    let mut upload: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Multipart error: {e}")))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| AppError::Validation("Image field must have a filename".into()))?;
        let data = field.bytes().await.map_err(|e| {
            if e.status() == axum::http::StatusCode::PAYLOAD_TOO_LARGE {
                AppError::PayloadTooLarge("Image is too large".into())
            } else {
                AppError::Validation(format!("Failed to read image: {e}"))
            }
        })?;
        upload = Some((file_name, data.to_vec()));
    }

    let (file_name, data) =
        upload.ok_or_else(|| AppError::Validation("Missing 'image' field".into()))?;

    let model = services::events::set_image(&state, &auth_user, id, &file_name, &data).await?;
    let going = services::events::going_count(&state.db, id).await?;
    Ok(Json(EventResponse::new(model, going, None)))
}

#[utoipa::path(
    get,
    path = "/{id}/image",
    tag = "Event Images",
    operation_id = "getEventImage",
    summary = "Download an event image",
    description = "Public.",
    params(("id" = i32, Path, description = "Event ID")),
    responses(
        (status = 200, description = "Image bytes", content_type = "application/octet-stream"),
        (status = 404, description = "Event or image not found (NOT_FOUND)", body = ErrorBody),
    ),
)]
#[instrument(skip(state))]
pub async fn get_image(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<impl IntoResponse, AppError> {
    let (data, content_type) = services::events::load_image(&state, id).await?;
    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CACHE_CONTROL, "public, max-age=3600".to_string()),
        ],
        data,
    ))
}
