//! Server-rendered HTML pages. They share the services and the access
//! table with the JSON API and authenticate through the session cookie.

mod admin;
mod auth;
pub mod error;
mod events;
pub mod views;

use axum::Router;
use axum::routing::{get, post};

use crate::access::{self, Permission};
use crate::config::AppConfig;
use crate::extractors::auth::AuthUser;
use crate::handlers::image::image_upload_body_limit;
use crate::state::AppState;

pub use error::PageError;

pub fn routes(config: &AppConfig) -> Router<AppState> {
    let event_forms = Router::new()
        .route(
            "/admin/events/new",
            get(events::new_event_page).post(events::create_event_submit),
        )
        .route(
            "/admin/events/{id}/edit",
            get(events::edit_event_page).post(events::edit_event_submit),
        )
        .layer(image_upload_body_limit(config.storage.max_image_size));

    Router::new()
        .route("/", get(events::home))
        .route("/register", get(auth::register_page).post(auth::register_submit))
        .route("/login", get(auth::login_page).post(auth::login_submit))
        .route("/logout", get(auth::logout).post(auth::logout))
        .route("/events", get(events::events_page))
        .route("/events/{id}", get(events::event_page))
        .route("/events/{id}/rsvp", post(events::rsvp_submit))
        .route("/events/{id}/feedback", post(events::feedback_submit))
        .route("/events/{id}/rsvps", get(events::attendees_page))
        .route("/my-rsvps", get(events::my_rsvps_page))
        .route("/admin/events/{id}/delete", post(events::delete_event_submit))
        .route("/admin/users", get(admin::users_page))
        .route("/admin/users/{id}/role", post(admin::role_submit))
        .route("/admin/users/{id}/delete", post(admin::delete_user_submit))
        .route("/admin/logs", get(admin::logs_page))
        .merge(event_forms)
}

/// Page-side gate: anonymous visitors are redirected to the login page,
/// signed-in users without the permission get a 403 page.
pub(crate) fn require(user: Option<AuthUser>, permission: Permission) -> Result<AuthUser, PageError> {
    access::check_access(user.as_ref().map(|u| u.role), permission)?;
    user.ok_or(PageError::Login)
}
