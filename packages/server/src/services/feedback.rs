use chrono::Utc;
use common::activity::{ActivityMessage, actions};
use sea_orm::*;
use serde_json::json;

use crate::entity::{feedback, user};
use crate::error::AppError;
use crate::extractors::auth::AuthUser;
use crate::models::feedback::{FeedbackItem, FeedbackListResponse, validate_feedback};
use crate::services::events::find_event;
use crate::state::AppState;

/// Append a feedback entry. Members cannot edit or delete it afterwards.
pub async fn submit(
    state: &AppState,
    user: &AuthUser,
    event_id: i32,
    rating: i16,
    comment: &str,
) -> Result<feedback::Model, AppError> {
    validate_feedback(rating, comment)?;
    let event = find_event(&state.db, event_id).await?;

    let model = feedback::ActiveModel {
        event_id: Set(event_id),
        user_id: Set(user.user_id),
        rating: Set(rating),
        comment: Set(comment.trim().to_string()),
        created_at: Set(Utc::now()),
        ..Default::default()
    }
    .insert(&state.db)
    .await?;

    state.activity.dispatch(ActivityMessage::action(
        Some(user.actor()),
        actions::FEEDBACK_SUBMITTED,
        json!({
            "event_id": event_id,
            "event_title": event.title,
            "rating": rating,
        }),
    ));
    Ok(model)
}

/// Newest first, with author names and the mean rating.
pub async fn list<C: ConnectionTrait>(db: &C, event_id: i32) -> Result<FeedbackListResponse, AppError> {
    find_event(db, event_id).await?;

    let rows = feedback::Entity::find()
        .filter(feedback::Column::EventId.eq(event_id))
        .find_also_related(user::Entity)
        .order_by_desc(feedback::Column::CreatedAt)
        .order_by_desc(feedback::Column::Id)
        .all(db)
        .await?;

    let items: Vec<FeedbackItem> = rows
        .into_iter()
        .map(|(f, u)| FeedbackItem {
            id: f.id,
            user_id: f.user_id,
            author: u.map(|u| u.full_name()).unwrap_or_default(),
            rating: f.rating,
            comment: f.comment,
            created_at: f.created_at,
        })
        .collect();

    Ok(FeedbackListResponse {
        event_id,
        average_rating: average(&items),
        feedback: items,
    })
}

fn average(items: &[FeedbackItem]) -> Option<f64> {
    if items.is_empty() {
        return None;
    }
    let total: f64 = items.iter().map(|i| f64::from(i.rating)).sum();
    Some((total / items.len() as f64 * 100.0).round() / 100.0)
}
