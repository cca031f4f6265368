use chrono::{NaiveDate, Utc};
use common::Role;
use common::RsvpStatus;
use common::activity::{ActivityKind, ActivityMessage, actions};
use common::document::{Document, collections};
use common::summary::{self, DailySummary, SummaryOptions};
use sea_orm::*;
use serde_json::{Map, json};
use tracing::info;

use crate::entity::{event, feedback, rsvp, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::admin::resolve_position;
use crate::state::AppState;

pub async fn list_users<C: ConnectionTrait>(db: &C) -> Result<Vec<user::Model>, AppError> {
    Ok(user::Entity::find()
        .order_by_asc(user::Column::FirstName)
        .order_by_asc(user::Column::LastName)
        .order_by_asc(user::Column::Id)
        .all(db)
        .await?)
}

async fn find_user<C: ConnectionTrait>(db: &C, id: i32) -> Result<user::Model, AppError> {
    user::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))
}

fn audit(
    state: &AppState,
    admin: &AuthUser,
    action: &str,
    target: &user::Model,
    details: serde_json::Value,
) {
    let details = match details {
        serde_json::Value::Object(map) => map,
        _ => Map::new(),
    };
    state.activity.dispatch(ActivityMessage::new(
        Some(admin.actor()),
        ActivityKind::Audit {
            action: action.to_string(),
            target_user_id: target.id,
            target_email: target.email.clone(),
            details,
        },
    ));
}

pub async fn update_role(
    state: &AppState,
    admin: &AuthUser,
    target_id: i32,
    role: Role,
    committee_position: Option<&str>,
) -> Result<user::Model, AppError> {
    if target_id == admin.user_id {
        return Err(AppError::Validation("You cannot change your own role".into()));
    }
    let position = resolve_position(role, committee_position)?;

    let target = find_user(&state.db, target_id).await?;
    let previous_role = target.role;

    let mut active: user::ActiveModel = target.into();
    active.role = Set(role);
    active.committee_position = Set(position.clone());
    let updated = active.update(&state.db).await?;

    info!(target_id, %previous_role, new_role = %role, "Role updated");
    audit(
        state,
        admin,
        actions::ROLE_UPDATED,
        &updated,
        json!({
            "previous_role": previous_role,
            "new_role": role,
            "committee_position": position,
        }),
    );
    Ok(updated)
}

/// Delete a user with their RSVPs and feedback. Users who still own events
/// are refused so that events never lose their creator.
pub async fn delete_user(state: &AppState, admin: &AuthUser, target_id: i32) -> Result<(), AppError> {
    if target_id == admin.user_id {
        return Err(AppError::Validation("You cannot delete your own account".into()));
    }

    let txn = state.db.begin().await?;
    let target = find_user(&txn, target_id).await?;

    let owned = event::Entity::find()
        .filter(event::Column::CreatedBy.eq(target_id))
        .count(&txn)
        .await?;
    if owned > 0 {
        return Err(AppError::Conflict(format!(
            "User still owns {owned} event(s); delete or reassign them first"
        )));
    }

    let going: Vec<(rsvp::Model, Option<event::Model>)> = rsvp::Entity::find()
        .filter(rsvp::Column::UserId.eq(target_id))
        .filter(rsvp::Column::Status.eq(RsvpStatus::Going))
        .find_also_related(event::Entity)
        .all(&txn)
        .await?;

    rsvp::Entity::delete_many()
        .filter(rsvp::Column::UserId.eq(target_id))
        .exec(&txn)
        .await?;
    feedback::Entity::delete_many()
        .filter(feedback::Column::UserId.eq(target_id))
        .exec(&txn)
        .await?;
    user::Entity::delete_by_id(target_id).exec(&txn).await?;
    txn.commit().await?;

    info!(target_id, "User deleted");

    // Keep attendance statistics in line with the removed RSVPs.
    for (row, event) in going {
        state.activity.dispatch(ActivityMessage::new(
            Some(admin.actor()),
            ActivityKind::RsvpChanged {
                user_id: target.id,
                user_email: target.email.clone(),
                event_id: row.event_id,
                event_title: event.map(|e| e.title).unwrap_or_default(),
                previous_status: Some(row.status),
                new_status: None,
            },
        ));
    }
    audit(
        state,
        admin,
        actions::USER_DELETED,
        &target,
        json!({ "name": target.full_name(), "role": target.role }),
    );
    Ok(())
}

/// Newest documents of a log collection.
pub async fn recent(state: &AppState, collection: &str, limit: u64) -> Result<Vec<Document>, AppError> {
    Ok(state.documents.latest(collection, limit).await?)
}

pub async fn generate_summary(state: &AppState) -> Result<DailySummary, AppError> {
    Ok(summary::generate_daily_summary(
        state.documents.as_ref(),
        Utc::now(),
        &SummaryOptions::default(),
    )
    .await?)
}

pub async fn get_summary(state: &AppState, date: &str) -> Result<DailySummary, AppError> {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map_err(|_| AppError::Validation("Date must be formatted YYYY-MM-DD".into()))?;

    let doc = state
        .documents
        .get(collections::DAILY_SUMMARIES, date)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No summary for {date}")))?;

    serde_json::from_value(doc.data)
        .map_err(|e| AppError::Internal(format!("Stored summary is malformed: {e}")))
}
