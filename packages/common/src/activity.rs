//! Activity messages produced by the server and applied to the document store.
//!
//! The server hands an [`ActivityMessage`] to its dispatcher without waiting
//! for it; either the logger process (queue mode) or the server itself
//! (inline mode) later calls [`apply`]. Every write is keyed by the message id
//! or by an entity id, so applying the same message twice is harmless.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;
use uuid::Uuid;

use crate::document::{DocumentError, DocumentStore, collections};
use crate::role::Role;
use crate::rsvp_status::RsvpStatus;

/// Action names written to `activity_logs` and `audit_records`.
pub mod actions {
    pub const LOGIN: &str = "LOGIN";
    pub const REGISTERED: &str = "REGISTERED";
    pub const RSVP_UPDATED: &str = "RSVP_UPDATED";
    pub const RSVP_REMOVED: &str = "RSVP_REMOVED";
    pub const FEEDBACK_SUBMITTED: &str = "FEEDBACK_SUBMITTED";
    pub const EVENT_CREATED: &str = "EVENT_CREATED";
    pub const EVENT_UPDATED: &str = "EVENT_UPDATED";
    pub const EVENT_DELETED: &str = "EVENT_DELETED";
    pub const ROLE_UPDATED: &str = "ROLE_UPDATED";
    pub const USER_DELETED: &str = "USER_DELETED";
}

/// The authenticated user on whose behalf something happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: i32,
    pub email: String,
    pub role: Role,
}

/// Event fields mirrored into the document store for the daily summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSnapshot {
    pub event_id: i32,
    pub title: String,
    pub location: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActivityKind {
    /// A plain activity-log entry (login, registration, feedback...).
    Action {
        action: String,
        #[serde(default)]
        details: Map<String, Value>,
    },
    /// A user's RSVP changed. `new_status: None` means the RSVP was removed.
    RsvpChanged {
        user_id: i32,
        user_email: String,
        event_id: i32,
        event_title: String,
        previous_status: Option<RsvpStatus>,
        new_status: Option<RsvpStatus>,
    },
    EventUpserted {
        event: EventSnapshot,
        created: bool,
    },
    EventRemoved {
        event_id: i32,
        title: String,
    },
    /// An administrative action on another user.
    Audit {
        action: String,
        target_user_id: i32,
        target_email: String,
        #[serde(default)]
        details: Map<String, Value>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityMessage {
    /// Time-ordered id; also the id of the resulting log document.
    pub id: String,
    pub occurred_at: DateTime<Utc>,
    pub actor: Option<Actor>,
    pub kind: ActivityKind,
}

impl ActivityMessage {
    pub fn new(actor: Option<Actor>, kind: ActivityKind) -> Self {
        Self {
            id: Uuid::now_v7().to_string(),
            occurred_at: Utc::now(),
            actor,
            kind,
        }
    }

    /// Shorthand for an [`ActivityKind::Action`] message.
    pub fn action(actor: Option<Actor>, action: &str, details: Value) -> Self {
        let details = match details {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => Map::from_iter([("value".to_string(), other)]),
        };
        Self::new(
            actor,
            ActivityKind::Action {
                action: action.to_string(),
                details,
            },
        )
    }

    /// Short label used in log lines.
    pub fn label(&self) -> &str {
        match &self.kind {
            ActivityKind::Action { action, .. } | ActivityKind::Audit { action, .. } => action,
            ActivityKind::RsvpChanged { new_status, .. } => match new_status {
                Some(_) => actions::RSVP_UPDATED,
                None => actions::RSVP_REMOVED,
            },
            ActivityKind::EventUpserted { created: true, .. } => actions::EVENT_CREATED,
            ActivityKind::EventUpserted { created: false, .. } => actions::EVENT_UPDATED,
            ActivityKind::EventRemoved { .. } => actions::EVENT_DELETED,
        }
    }

    /// Common fields of every log document: action, timestamp and actor.
    fn log_entry(&self, action: &str) -> Map<String, Value> {
        let mut entry = Map::new();
        entry.insert("action".into(), json!(action));
        entry.insert(
            "timestamp".into(),
            json!(self.occurred_at.to_rfc3339_opts(SecondsFormat::Millis, true)),
        );
        if let Some(actor) = &self.actor {
            entry.insert("user".into(), json!(actor.email));
            entry.insert("user_id".into(), json!(actor.user_id));
            entry.insert("role".into(), json!(actor.role));
        }
        entry
    }
}

/// Apply one activity message to the document store.
pub async fn apply(store: &dyn DocumentStore, message: &ActivityMessage) -> Result<(), DocumentError> {
    debug!(id = %message.id, action = message.label(), "Applying activity message");

    match &message.kind {
        ActivityKind::Action { action, details } => {
            let mut entry = message.log_entry(action);
            for (key, value) in details {
                entry.entry(key.clone()).or_insert_with(|| value.clone());
            }
            write_log(store, message, entry).await
        }
        ActivityKind::RsvpChanged {
            user_id,
            user_email,
            event_id,
            event_title,
            previous_status,
            new_status,
        } => {
            update_event_stats(store, *event_id, *user_id, *new_status).await?;

            let mut entry = message.log_entry(message.label());
            entry.insert("user".into(), json!(user_email));
            entry.insert("user_id".into(), json!(user_id));
            entry.insert("event_id".into(), json!(event_id));
            entry.insert("event_title".into(), json!(event_title));
            entry.insert("previous_status".into(), json!(previous_status));
            entry.insert("new_status".into(), json!(new_status));
            write_log(store, message, entry).await
        }
        ActivityKind::EventUpserted { event, .. } => {
            store
                .set(
                    collections::EVENTS_MIRROR,
                    &event.event_id.to_string(),
                    json!({
                        "event_id": event.event_id,
                        "title": event.title,
                        "location": event.location,
                        "start_time": event.start_time.to_rfc3339(),
                        "end_time": event.end_time.to_rfc3339(),
                    }),
                    true,
                )
                .await?;

            let mut entry = message.log_entry(message.label());
            entry.insert("event_id".into(), json!(event.event_id));
            entry.insert("event_title".into(), json!(event.title));
            write_log(store, message, entry).await
        }
        ActivityKind::EventRemoved { event_id, title } => {
            let key = event_id.to_string();
            store.delete(collections::EVENTS_MIRROR, &key).await?;
            store.delete(collections::EVENT_STATS, &key).await?;

            let mut entry = message.log_entry(message.label());
            entry.insert("event_id".into(), json!(event_id));
            entry.insert("event_title".into(), json!(title));
            write_log(store, message, entry).await
        }
        ActivityKind::Audit {
            action,
            target_user_id,
            target_email,
            details,
        } => {
            let mut entry = message.log_entry(action);
            entry.insert("target_user_id".into(), json!(target_user_id));
            entry.insert("target_email".into(), json!(target_email));
            entry.insert("details".into(), Value::Object(details.clone()));
            store
                .set(
                    collections::AUDIT_RECORDS,
                    &message.id,
                    Value::Object(entry),
                    false,
                )
                .await
        }
    }
}

async fn write_log(
    store: &dyn DocumentStore,
    message: &ActivityMessage,
    entry: Map<String, Value>,
) -> Result<(), DocumentError> {
    store
        .set(
            collections::ACTIVITY_LOGS,
            &message.id,
            Value::Object(entry),
            false,
        )
        .await
}

/// Record `status` for `user_id` in `event_stats/{event_id}` and recount.
async fn update_event_stats(
    store: &dyn DocumentStore,
    event_id: i32,
    user_id: i32,
    status: Option<RsvpStatus>,
) -> Result<(), DocumentError> {
    store
        .update(
            collections::EVENT_STATS,
            &event_id.to_string(),
            Box::new(move |current| {
                let mut attendees = current
                    .as_ref()
                    .and_then(|doc| doc.get("attendees"))
                    .and_then(Value::as_object)
                    .cloned()
                    .unwrap_or_default();
                match status {
                    Some(status) => {
                        attendees.insert(user_id.to_string(), json!(status));
                    }
                    None => {
                        attendees.remove(&user_id.to_string());
                    }
                }
                let going_count = attendees
                    .values()
                    .filter(|s| s.as_str() == Some(RsvpStatus::Going.as_str()))
                    .count();
                json!({
                    "event_id": event_id,
                    "going_count": going_count,
                    "attendees": attendees,
                })
            }),
        )
        .await?;
    Ok(())
}
