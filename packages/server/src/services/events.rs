use std::collections::HashMap;

use chrono::Utc;
use common::RsvpStatus;
use common::activity::{ActivityKind, ActivityMessage, EventSnapshot};
use common::storage::ContentHash;
use sea_orm::*;
use tracing::{info, warn};

use crate::entity::{event, feedback, rsvp};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::event::{EventInput, UpdateEventRequest};
use crate::state::AppState;
use crate::utils::filename::{image_content_type, image_extension};

pub async fn find_event<C: ConnectionTrait>(db: &C, id: i32) -> Result<event::Model, AppError> {
    event::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("Event not found".into()))
}

/// `going` RSVP counts keyed by event id. Events without any are absent.
pub async fn going_counts<C: ConnectionTrait>(db: &C) -> Result<HashMap<i32, u64>, AppError> {
    let rows: Vec<(i32, i64)> = rsvp::Entity::find()
        .filter(rsvp::Column::Status.eq(RsvpStatus::Going))
        .select_only()
        .column(rsvp::Column::EventId)
        .column_as(rsvp::Column::UserId.count(), "going")
        .group_by(rsvp::Column::EventId)
        .into_tuple()
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .map(|(event_id, n)| (event_id, u64::try_from(n).unwrap_or(0)))
        .collect())
}

pub async fn going_count<C: ConnectionTrait>(db: &C, event_id: i32) -> Result<u64, AppError> {
    Ok(rsvp::Entity::find()
        .filter(rsvp::Column::EventId.eq(event_id))
        .filter(rsvp::Column::Status.eq(RsvpStatus::Going))
        .count(db)
        .await?)
}

/// All events, soonest first, with their attendance.
pub async fn list_events(db: &DatabaseConnection) -> Result<Vec<(event::Model, u64)>, AppError> {
    let events = event::Entity::find()
        .order_by_asc(event::Column::StartTime)
        .order_by_asc(event::Column::Id)
        .all(db)
        .await?;
    let counts = going_counts(db).await?;

    Ok(events
        .into_iter()
        .map(|e| {
            let going = counts.get(&e.id).copied().unwrap_or(0);
            (e, going)
        })
        .collect())
}

pub struct EventDetail {
    pub event: event::Model,
    pub going_count: u64,
    pub my_rsvp: Option<RsvpStatus>,
}

pub async fn event_detail(
    db: &DatabaseConnection,
    id: i32,
    viewer: Option<&AuthUser>,
) -> Result<EventDetail, AppError> {
    let event = find_event(db, id).await?;
    let going_count = going_count(db, id).await?;
    let my_rsvp = match viewer {
        Some(user) => rsvp::Entity::find_by_id((user.user_id, id))
            .one(db)
            .await?
            .map(|r| r.status),
        None => None,
    };

    Ok(EventDetail {
        event,
        going_count,
        my_rsvp,
    })
}

fn snapshot(model: &event::Model) -> EventSnapshot {
    EventSnapshot {
        event_id: model.id,
        title: model.title.clone(),
        location: model.location.clone(),
        start_time: model.start_time,
        end_time: model.end_time,
    }
}

fn announce(state: &AppState, user: &AuthUser, model: &event::Model, created: bool) {
    state.activity.dispatch(ActivityMessage::new(
        Some(user.actor()),
        ActivityKind::EventUpserted {
            event: snapshot(model),
            created,
        },
    ));
}

pub async fn create_event(
    state: &AppState,
    user: &AuthUser,
    input: EventInput,
) -> Result<event::Model, AppError> {
    input.validate()?;

    let now = Utc::now();
    let model = event::ActiveModel {
        title: Set(input.title.trim().to_string()),
        description: Set(input.description),
        location: Set(input.location.trim().to_string()),
        start_time: Set(input.start_time),
        end_time: Set(input.end_time),
        created_by: Set(user.user_id),
        image_hash: Set(None),
        image_content_type: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    info!(event_id = model.id, user_id = user.user_id, "Event created");
    announce(state, user, &model, true);
    Ok(model)
}

pub async fn update_event(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    patch: UpdateEventRequest,
) -> Result<event::Model, AppError> {
    let txn = state.db.begin().await?;
    let existing = find_event(&txn, id).await?;

    let input = EventInput::merged(&existing, patch);
    input.validate()?;

    let mut active: event::ActiveModel = existing.into();
    active.title = Set(input.title.trim().to_string());
    active.description = Set(input.description);
    active.location = Set(input.location.trim().to_string());
    active.start_time = Set(input.start_time);
    active.end_time = Set(input.end_time);
    active.updated_at = Set(Utc::now());
    let model = active.update(&txn).await?;
    txn.commit().await?;

    announce(state, user, &model, false);
    Ok(model)
}

/// Delete an event together with its RSVPs and feedback.
pub async fn delete_event(state: &AppState, user: &AuthUser, id: i32) -> Result<(), AppError> {
    let txn = state.db.begin().await?;
    let existing = find_event(&txn, id).await?;

    let rsvps = rsvp::Entity::delete_many()
        .filter(rsvp::Column::EventId.eq(id))
        .exec(&txn)
        .await?;
    let feedback = feedback::Entity::delete_many()
        .filter(feedback::Column::EventId.eq(id))
        .exec(&txn)
        .await?;
    event::Entity::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    info!(
        event_id = id,
        rsvps = rsvps.rows_affected,
        feedback = feedback.rows_affected,
        "Event deleted"
    );

    if let Some(hash) = existing.image_hash.as_deref() {
        release_image(state, hash).await;
    }

    state.activity.dispatch(ActivityMessage::new(
        Some(user.actor()),
        ActivityKind::EventRemoved {
            event_id: id,
            title: existing.title,
        },
    ));
    Ok(())
}

/// Store an uploaded image and attach it to the event.
pub async fn set_image(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    filename: &str,
    data: &[u8],
) -> Result<event::Model, AppError> {
    let ext = image_extension(filename).map_err(|e| AppError::Validation(e.message().into()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Image must not be empty".into()));
    }
    let content_type = image_content_type(&ext);

    let existing = find_event(&state.db, id).await?;
    let hash = state.blobs.put(data, Some(&content_type)).await?;

    let previous = existing.image_hash.clone();
    let mut active: event::ActiveModel = existing.into();
    active.image_hash = Set(Some(hash.to_hex()));
    active.image_content_type = Set(Some(content_type));
    active.updated_at = Set(Utc::now());
    let model = active.update(&state.db).await?;

    if let Some(old) = previous.filter(|old| *old != hash.to_hex()) {
        release_image(state, &old).await;
    }

    info!(event_id = id, hash = %hash, "Event image stored");
    announce(state, user, &model, false);
    Ok(model)
}

/// Image bytes and content type for an event.
pub async fn load_image(state: &AppState, id: i32) -> Result<(Vec<u8>, String), AppError> {
    let event = find_event(&state.db, id).await?;
    let hex = event
        .image_hash
        .ok_or_else(|| AppError::NotFound("Event has no image".into()))?;
    let hash = ContentHash::from_hex(&hex)
        .map_err(|e| AppError::Internal(format!("Stored image hash is invalid: {e}")))?;

    let data = state.blobs.get(&hash).await?;
    let content_type = event
        .image_content_type
        .unwrap_or_else(|| "application/octet-stream".to_string());
    Ok((data, content_type))
}

/// Delete a blob once no event references it. Failures only leave an orphan.
async fn release_image(state: &AppState, hex: &str) {
    let still_used = event::Entity::find()
        .filter(event::Column::ImageHash.eq(hex))
        .count(&state.db)
        .await;
    match still_used {
        Ok(0) => {}
        Ok(_) => return,
        Err(e) => {
            warn!(hash = hex, error = %e, "Could not check image references");
            return;
        }
    }

    match ContentHash::from_hex(hex) {
        Ok(hash) => {
            if let Err(e) = state.blobs.delete(&hash).await {
                warn!(hash = hex, error = %e, "Failed to delete unused image");
            }
        }
        Err(e) => warn!(hash = hex, error = %e, "Skipping invalid image hash"),
    }
}
