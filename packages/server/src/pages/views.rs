//! Template contexts. Everything is pre-formatted for display so the
//! templates stay free of logic.

use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use chrono::{DateTime, Utc};
use common::Role;
use common::document::Document;
use serde_json::Value;

use crate::access::Permission;
use crate::entity::{event, user};
use crate::extractors::auth::AuthUser;
use crate::models::event::image_url;
use crate::models::feedback::FeedbackItem;
use crate::models::rsvp::{AttendeeItem, MyRsvpItem};
use crate::pages::error::PageError;

pub fn render<T: Template>(page: &T) -> Result<Html<String>, PageError> {
    Ok(Html(page.render()?))
}

/// Render with a non-200 status, e.g. a form re-shown after a failed submit.
pub fn render_with_status<T: Template>(status: StatusCode, page: &T) -> Result<Response, PageError> {
    Ok((status, render(page)?).into_response())
}

pub fn display_time(ts: &DateTime<Utc>) -> String {
    ts.format("%a %d %b %Y, %H:%M UTC").to_string()
}

/// Value for an `<input type="datetime-local">`.
pub fn input_time(ts: &DateTime<Utc>) -> String {
    ts.format("%Y-%m-%dT%H:%M").to_string()
}

pub struct Nav {
    pub user: Option<String>,
    pub is_staff: bool,
    pub is_admin: bool,
}

impl Nav {
    pub fn anonymous() -> Self {
        Self {
            user: None,
            is_staff: false,
            is_admin: false,
        }
    }

    pub fn for_user(user: Option<&AuthUser>) -> Self {
        match user {
            Some(u) => Self {
                user: Some(u.full_name()),
                is_staff: u.has_permission(Permission::EventCreate),
                is_admin: u.has_permission(Permission::UserManage),
            },
            None => Self::anonymous(),
        }
    }
}

pub struct EventView {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: String,
    pub end: String,
    pub image_url: Option<String>,
    pub going_count: u64,
}

impl EventView {
    pub fn new(model: &event::Model, going_count: u64) -> Self {
        Self {
            id: model.id,
            title: model.title.clone(),
            description: model.description.clone(),
            location: model.location.clone(),
            start: display_time(&model.start_time),
            end: display_time(&model.end_time),
            image_url: image_url(model),
            going_count,
        }
    }
}

#[derive(Template)]
#[template(path = "home.html")]
pub struct HomeTemplate {
    pub nav: Nav,
    pub upcoming: Vec<EventView>,
}

#[derive(Template)]
#[template(path = "login.html")]
pub struct LoginTemplate {
    pub nav: Nav,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "register.html")]
pub struct RegisterTemplate {
    pub nav: Nav,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "events.html")]
pub struct EventsTemplate {
    pub nav: Nav,
    pub events: Vec<EventView>,
}

#[derive(Template)]
#[template(path = "event_detail.html")]
pub struct EventDetailTemplate {
    pub nav: Nav,
    pub event: EventView,
    pub signed_in: bool,
    pub is_going: bool,
    pub has_rsvp: bool,
    pub can_manage: bool,
    pub can_view_attendees: bool,
    pub feedback: Vec<FeedbackItem>,
    pub average_rating: Option<String>,
}

/// Raw form values, echoed back when validation fails.
#[derive(Default)]
pub struct EventFormValues {
    pub title: String,
    pub description: String,
    pub location: String,
    pub start: String,
    pub end: String,
}

impl From<&event::Model> for EventFormValues {
    fn from(model: &event::Model) -> Self {
        Self {
            title: model.title.clone(),
            description: model.description.clone(),
            location: model.location.clone(),
            start: input_time(&model.start_time),
            end: input_time(&model.end_time),
        }
    }
}

#[derive(Template)]
#[template(path = "event_form.html")]
pub struct EventFormTemplate {
    pub nav: Nav,
    pub heading: String,
    pub action: String,
    pub form: EventFormValues,
    pub error: Option<String>,
}

#[derive(Template)]
#[template(path = "attendees.html")]
pub struct AttendeesTemplate {
    pub nav: Nav,
    pub event: EventView,
    pub attendees: Vec<AttendeeItem>,
}

pub struct MyRsvpView {
    pub event_id: i32,
    pub title: String,
    pub location: String,
    pub start: String,
}

impl From<MyRsvpItem> for MyRsvpView {
    fn from(item: MyRsvpItem) -> Self {
        Self {
            start: display_time(&item.start_time),
            event_id: item.event_id,
            title: item.title,
            location: item.location,
        }
    }
}

#[derive(Template)]
#[template(path = "my_rsvps.html")]
pub struct MyRsvpsTemplate {
    pub nav: Nav,
    pub rsvps: Vec<MyRsvpView>,
}

pub struct RoleOption {
    pub value: &'static str,
    pub selected: bool,
}

pub struct UserRow {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: String,
    pub position: String,
    pub is_self: bool,
    pub options: Vec<RoleOption>,
}

impl UserRow {
    pub fn new(model: user::Model, viewer_id: i32) -> Self {
        Self {
            id: model.id,
            name: model.full_name(),
            role: model.role.to_string(),
            position: model.committee_position.clone().unwrap_or_default(),
            is_self: model.id == viewer_id,
            options: Role::ALL
                .iter()
                .map(|r| RoleOption {
                    value: r.as_str(),
                    selected: *r == model.role,
                })
                .collect(),
            email: model.email,
        }
    }
}

#[derive(Template)]
#[template(path = "admin_users.html")]
pub struct AdminUsersTemplate {
    pub nav: Nav,
    pub users: Vec<UserRow>,
}

pub struct LogRow {
    pub timestamp: String,
    pub action: String,
    pub user: String,
    pub detail: String,
}

impl From<Document> for LogRow {
    fn from(doc: Document) -> Self {
        let text = |key: &str| {
            doc.data
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };
        let detail = ["event_title", "target_email", "new_status", "new_role"]
            .iter()
            .filter_map(|key| match doc.data.get(*key) {
                Some(Value::String(s)) => Some(format!("{key}: {s}")),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", ");
        Self {
            timestamp: display_time(&doc.created_at),
            action: text("action"),
            user: text("user"),
            detail,
        }
    }
}

#[derive(Template)]
#[template(path = "admin_logs.html")]
pub struct AdminLogsTemplate {
    pub nav: Nav,
    pub logs: Vec<LogRow>,
    pub audits: Vec<LogRow>,
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub nav: Nav,
    pub status: u16,
    pub message: String,
}
