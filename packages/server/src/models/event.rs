use chrono::{DateTime, Utc};
use common::RsvpStatus;
use serde::{Deserialize, Serialize};

use crate::entity::event;
use crate::error::AppError;
use crate::models::shared::{validate_max, validate_required};

/// Request body for creating an event.
#[derive(Deserialize, utoipa::ToSchema)]
pub struct CreateEventRequest {
    /// 1-200 characters.
    #[schema(example = "Spring Picnic")]
    pub title: String,
    /// Up to 5000 characters.
    #[serde(default)]
    pub description: String,
    /// Up to 200 characters.
    #[serde(default)]
    #[schema(example = "Riverside Park")]
    pub location: String,
    pub start_time: DateTime<Utc>,
    /// Must be after `start_time`.
    pub end_time: DateTime<Utc>,
}

/// Partial update; absent fields are left unchanged.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct UpdateEventRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
}

/// Fully-specified event fields, validated together.
#[derive(Debug, Clone)]
pub struct EventInput {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

impl EventInput {
    pub fn validate(&self) -> Result<(), AppError> {
        validate_required("Title", &self.title, 200)?;
        validate_max("Description", &self.description, 5000)?;
        validate_max("Location", &self.location, 200)?;
        if self.end_time <= self.start_time {
            return Err(AppError::Validation(
                "End time must be after start time".into(),
            ));
        }
        Ok(())
    }

    /// Overlay a partial update on an existing event.
    pub fn merged(existing: &event::Model, patch: UpdateEventRequest) -> Self {
        Self {
            title: patch.title.unwrap_or_else(|| existing.title.clone()),
            description: patch
                .description
                .unwrap_or_else(|| existing.description.clone()),
            location: patch.location.unwrap_or_else(|| existing.location.clone()),
            start_time: patch.start_time.unwrap_or(existing.start_time),
            end_time: patch.end_time.unwrap_or(existing.end_time),
        }
    }
}

impl From<CreateEventRequest> for EventInput {
    fn from(req: CreateEventRequest) -> Self {
        Self {
            title: req.title,
            description: req.description,
            location: req.location,
            start_time: req.start_time,
            end_time: req.end_time,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventResponse {
    #[schema(example = 1)]
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub created_by: i32,
    /// Present when the event has an image.
    #[schema(example = "/api/v1/events/1/image")]
    pub image_url: Option<String>,
    /// Number of `going` RSVPs.
    pub going_count: u64,
    /// The caller's own RSVP, when authenticated and one exists.
    pub my_rsvp: Option<RsvpStatus>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EventResponse {
    pub fn new(model: event::Model, going_count: u64, my_rsvp: Option<RsvpStatus>) -> Self {
        Self {
            image_url: image_url(&model),
            id: model.id,
            title: model.title,
            description: model.description,
            location: model.location,
            start_time: model.start_time,
            end_time: model.end_time,
            created_by: model.created_by,
            going_count,
            my_rsvp,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

pub fn image_url(model: &event::Model) -> Option<String> {
    model
        .image_hash
        .as_ref()
        .map(|_| format!("/api/v1/events/{}/image", model.id))
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct EventListResponse {
    pub events: Vec<EventResponse>,
}
