use chrono::{DateTime, Utc};
use common::RsvpStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request body for `POST /events/{id}/rsvp`. A missing `going` counts as `false`.
#[derive(Deserialize, Default, utoipa::ToSchema)]
pub struct RsvpRequest {
    #[serde(default)]
    #[schema(example = true)]
    pub going: bool,
}

impl RsvpRequest {
    /// Lenient parse: an empty or non-JSON body is an empty request, and
    /// `going` is read by truthiness (`1`, `"yes"` and `[0]` all count).
    pub fn from_body(body: &[u8]) -> Self {
        let going = serde_json::from_slice::<Value>(body)
            .ok()
            .and_then(|v| v.get("going").map(truthy))
            .unwrap_or(false);
        Self { going }
    }
}

fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(fields) => !fields.is_empty(),
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct RsvpResponse {
    #[schema(example = "RSVP updated")]
    pub message: String,
    pub event_id: i32,
    pub status: RsvpStatus,
}

/// One of the caller's upcoming commitments.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MyRsvpItem {
    pub event_id: i32,
    pub title: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub status: RsvpStatus,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct MyRsvpListResponse {
    pub rsvps: Vec<MyRsvpItem>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttendeeItem {
    pub user_id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub responded_at: DateTime<Utc>,
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct AttendeeListResponse {
    pub event_id: i32,
    pub attendees: Vec<AttendeeItem>,
    pub total: u64,
}
