use chrono::Utc;
use common::RsvpStatus;
use common::activity::{ActivityKind, ActivityMessage};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use tracing::info;

use crate::entity::{event, rsvp, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::rsvp::{AttendeeItem, MyRsvpItem};
use crate::services::events::find_event;
use crate::state::AppState;

fn announce(
    state: &AppState,
    user: &AuthUser,
    event: &event::Model,
    previous_status: Option<RsvpStatus>,
    new_status: Option<RsvpStatus>,
) {
    state.activity.dispatch(ActivityMessage::new(
        Some(user.actor()),
        ActivityKind::RsvpChanged {
            user_id: user.user_id,
            user_email: user.email.clone(),
            event_id: event.id,
            event_title: event.title.clone(),
            previous_status,
            new_status,
        },
    ));
}

/// Create or overwrite the caller's RSVP. Last write wins.
pub async fn set_rsvp(
    state: &AppState,
    user: &AuthUser,
    event_id: i32,
    going: bool,
) -> Result<RsvpStatus, AppError> {
    let status = RsvpStatus::from_going(going);
    let now = Utc::now();

    let txn = state.db.begin().await?;
    let event = find_event(&txn, event_id).await?;
    let previous = rsvp::Entity::find_by_id((user.user_id, event_id))
        .one(&txn)
        .await?
        .map(|r| r.status);

    let row = rsvp::ActiveModel {
        user_id: Set(user.user_id),
        event_id: Set(event_id),
        status: Set(status),
        created_at: Set(now),
        updated_at: Set(now),
    };
    rsvp::Entity::insert(row)
        .on_conflict(
            OnConflict::columns([rsvp::Column::UserId, rsvp::Column::EventId])
                .update_columns([rsvp::Column::Status, rsvp::Column::UpdatedAt])
                .to_owned(),
        )
        .exec_without_returning(&txn)
        .await?;
    txn.commit().await?;

    info!(user_id = user.user_id, event_id, %status, "RSVP updated");
    announce(state, user, &event, previous, Some(status));
    Ok(status)
}

/// Remove the caller's RSVP; `NotFound` if there was none.
pub async fn remove_rsvp(state: &AppState, user: &AuthUser, event_id: i32) -> Result<(), AppError> {
    let txn = state.db.begin().await?;
    let event = find_event(&txn, event_id).await?;
    let existing = rsvp::Entity::find_by_id((user.user_id, event_id))
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::NotFound("RSVP not found".into()))?;

    rsvp::Entity::delete_by_id((user.user_id, event_id))
        .exec(&txn)
        .await?;
    txn.commit().await?;

    info!(user_id = user.user_id, event_id, "RSVP removed");
    announce(state, user, &event, Some(existing.status), None);
    Ok(())
}

/// The user's `going` RSVPs, soonest event first.
pub async fn my_rsvps<C: ConnectionTrait>(db: &C, user_id: i32) -> Result<Vec<MyRsvpItem>, AppError> {
    let rows = rsvp::Entity::find()
        .filter(rsvp::Column::UserId.eq(user_id))
        .filter(rsvp::Column::Status.eq(RsvpStatus::Going))
        .find_also_related(event::Entity)
        .order_by_asc(event::Column::StartTime)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(r, e)| {
            e.map(|e| MyRsvpItem {
                event_id: e.id,
                title: e.title,
                location: e.location,
                start_time: e.start_time,
                end_time: e.end_time,
                status: r.status,
            })
        })
        .collect())
}

/// Users going to an event, ordered by first then last name.
pub async fn attendees<C: ConnectionTrait>(
    db: &C,
    event_id: i32,
) -> Result<Vec<AttendeeItem>, AppError> {
    find_event(db, event_id).await?;

    let rows = rsvp::Entity::find()
        .filter(rsvp::Column::EventId.eq(event_id))
        .filter(rsvp::Column::Status.eq(RsvpStatus::Going))
        .find_also_related(user::Entity)
        .order_by_asc(user::Column::FirstName)
        .order_by_asc(user::Column::LastName)
        .all(db)
        .await?;

    Ok(rows
        .into_iter()
        .filter_map(|(r, u)| {
            u.map(|u| AttendeeItem {
                user_id: u.id,
                first_name: u.first_name,
                last_name: u.last_name,
                email: u.email,
                responded_at: r.updated_at,
            })
        })
        .collect())
}
