use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::shared::validate_max;

#[derive(Deserialize, utoipa::ToSchema)]
pub struct FeedbackRequest {
    /// 1-5.
    #[schema(example = 4)]
    pub rating: i16,
    /// Up to 2000 characters.
    #[serde(default)]
    #[schema(example = "Great venue, too short!")]
    pub comment: String,
}

pub fn validate_feedback(rating: i16, comment: &str) -> Result<(), AppError> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::Validation("Rating must be between 1 and 5".into()));
    }
    validate_max("Comment", comment, 2000)
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedbackItem {
    pub id: i32,
    pub user_id: i32,
    pub author: String,
    pub rating: i16,
    pub comment: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct FeedbackListResponse {
    pub event_id: i32,
    pub feedback: Vec<FeedbackItem>,
    /// `null` when there is no feedback yet.
    pub average_rating: Option<f64>,
}
