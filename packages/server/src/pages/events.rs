use axum::Form;
use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use axum_typed_multipart::{FieldData, TryFromMultipart, TypedMultipart};
use chrono::{DateTime, Utc};
use common::summary::parse_timestamp;
use serde::Deserialize;
use tracing::{instrument, warn};

use crate::access::Permission;
use crate::error::AppError;
use crate::extractors::auth::{AuthUser, MaybeUser};
use crate::models::event::{EventInput, UpdateEventRequest};
use crate::pages::error::PageError;
use crate::pages::require;
use crate::pages::views::*;
use crate::services;
use crate::state::AppState;
use crate::utils::filename::image_extension;

const HOME_UPCOMING: usize = 5;

pub async fn home(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let now = Utc::now();
    let upcoming = services::events::list_events(&state.db)
        .await?
        .into_iter()
        .filter(|(e, _)| e.start_time >= now)
        .take(HOME_UPCOMING)
        .map(|(e, going)| EventView::new(&e, going))
        .collect();

    render(&HomeTemplate {
        nav: Nav::for_user(user.as_ref()),
        upcoming,
    })
}

pub async fn events_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let events = services::events::list_events(&state.db)
        .await?
        .into_iter()
        .map(|(e, going)| EventView::new(&e, going))
        .collect();

    render(&EventsTemplate {
        nav: Nav::for_user(user.as_ref()),
        events,
    })
}

pub async fn event_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Html<String>, PageError> {
    let detail = services::events::event_detail(&state.db, id, user.as_ref()).await?;
    let can_view_attendees = user
        .as_ref()
        .is_some_and(|u| u.has_permission(Permission::RsvpViewAll));

    let (feedback, average_rating) = if user
        .as_ref()
        .is_some_and(|u| u.has_permission(Permission::FeedbackViewAll))
    {
        let list = services::feedback::list(&state.db, id).await?;
        (list.feedback, list.average_rating.map(|avg| format!("{avg:.2}")))
    } else {
        (Vec::new(), None)
    };

    render(&EventDetailTemplate {
        nav: Nav::for_user(user.as_ref()),
        event: EventView::new(&detail.event, detail.going_count),
        signed_in: user.is_some(),
        is_going: detail.my_rsvp.is_some_and(|s| s.is_going()),
        has_rsvp: detail.my_rsvp.is_some(),
        can_manage: user
            .as_ref()
            .is_some_and(|u| u.has_permission(Permission::EventEdit)),
        can_view_attendees,
        feedback,
        average_rating,
    })
}

#[derive(Deserialize)]
pub struct RsvpForm {
    action: String,
}

#[instrument(skip(state, user, form))]
pub async fn rsvp_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RsvpForm>,
) -> Result<Redirect, PageError> {
    let user = require(user, Permission::RsvpOwn)?;
    let going = match form.action.as_str() {
        "going" => true,
        "cancel" => false,
        other => return Err(PageError::BadRequest(format!("Unknown RSVP action '{other}'"))),
    };

    services::rsvps::set_rsvp(&state, &user, id, going).await?;
    Ok(Redirect::to(&format!("/events/{id}")))
}

#[derive(Deserialize)]
pub struct FeedbackForm {
    rating: i16,
    #[serde(default)]
    comment: String,
}

#[instrument(skip(state, user, form))]
pub async fn feedback_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<FeedbackForm>,
) -> Result<Redirect, PageError> {
    let user = require(user, Permission::FeedbackSubmit)?;

    services::feedback::submit(&state, &user, id, form.rating, &form.comment).await?;
    Ok(Redirect::to(&format!("/events/{id}")))
}

pub async fn attendees_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Html<String>, PageError> {
    let user = require(user, Permission::RsvpViewAll)?;

    let event = services::events::find_event(&state.db, id).await?;
    let attendees = services::rsvps::attendees(&state.db, id).await?;
    render(&AttendeesTemplate {
        nav: Nav::for_user(Some(&user)),
        event: EventView::new(&event, attendees.len() as u64),
        attendees,
    })
}

pub async fn my_rsvps_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let user = require(user, Permission::RsvpOwn)?;

    let rsvps = services::rsvps::my_rsvps(&state.db, user.user_id)
        .await?
        .into_iter()
        .map(MyRsvpView::from)
        .collect();
    render(&MyRsvpsTemplate {
        nav: Nav::for_user(Some(&user)),
        rsvps,
    })
}

/// Multipart event form; the image is optional.
#[derive(TryFromMultipart)]
pub struct EventForm {
    title: String,
    description: Option<String>,
    location: Option<String>,
    start_time: String,
    end_time: String,
    #[form_data(limit = "unlimited")]
    image: Option<FieldData<Bytes>>,
}

impl EventForm {
    fn values(&self) -> EventFormValues {
        EventFormValues {
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            start: self.start_time.clone(),
            end: self.end_time.clone(),
        }
    }

    fn input(&self) -> Result<EventInput, AppError> {
        Ok(EventInput {
            title: self.title.clone(),
            description: self.description.clone().unwrap_or_default(),
            location: self.location.clone().unwrap_or_default(),
            start_time: form_time("Start time", &self.start_time)?,
            end_time: form_time("End time", &self.end_time)?,
        })
    }

    /// A browser submits an empty file part when no image was chosen.
    fn image(&self, max_size: u64) -> Result<Option<(String, Bytes)>, AppError> {
        let Some(field) = &self.image else {
            return Ok(None);
        };
        let name = field.metadata.file_name.clone().unwrap_or_default();
        if name.trim().is_empty() && field.contents.is_empty() {
            return Ok(None);
        }
        image_extension(&name).map_err(|e| AppError::Validation(e.message().into()))?;
        if field.contents.len() as u64 > max_size {
            return Err(AppError::PayloadTooLarge(format!(
                "Image must be at most {max_size} bytes"
            )));
        }
        Ok(Some((name, field.contents.clone())))
    }
}

fn form_time(label: &str, raw: &str) -> Result<DateTime<Utc>, AppError> {
    parse_timestamp(raw.trim())
        .ok_or_else(|| AppError::Validation(format!("{label} is not a valid date and time")))
}

/// Validation problems re-show the form; anything else becomes an error page.
fn form_error(err: AppError) -> Result<(StatusCode, String), PageError> {
    match err {
        AppError::Validation(_) | AppError::PayloadTooLarge(_) => {
            Ok((err.status(), err.public_message()))
        }
        other => Err(PageError::from(other)),
    }
}

fn form_page(
    user: &AuthUser,
    heading: &str,
    action: String,
    form: EventFormValues,
    error: Option<String>,
) -> EventFormTemplate {
    EventFormTemplate {
        nav: Nav::for_user(Some(user)),
        heading: heading.to_string(),
        action,
        form,
        error,
    }
}

pub async fn new_event_page(MaybeUser(user): MaybeUser) -> Result<Html<String>, PageError> {
    let user = require(user, Permission::EventCreate)?;
    render(&form_page(
        &user,
        "New event",
        "/admin/events/new".into(),
        EventFormValues::default(),
        None,
    ))
}

#[instrument(skip(state, user, form))]
pub async fn create_event_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    TypedMultipart(form): TypedMultipart<EventForm>,
) -> Result<Response, PageError> {
    let user = require(user, Permission::EventCreate)?;

    let created = async {
        let input = form.input()?;
        let image = form.image(state.blobs.max_size())?;
        let model = services::events::create_event(&state, &user, input).await?;
        Ok::<_, AppError>((model.id, image))
    }
    .await;

    let (id, image) = match created {
        Ok(created) => created,
        Err(e) => {
            let (status, message) = form_error(e)?;
            return render_with_status(
                status,
                &form_page(
                    &user,
                    "New event",
                    "/admin/events/new".into(),
                    form.values(),
                    Some(message),
                ),
            );
        }
    };

    // The event exists from here on, so a failed image goes back to its edit form.
    if let Some((name, data)) = image
        && let Err(e) = services::events::set_image(&state, &user, id, &name, &data).await
    {
        warn!(event_id = id, error = ?e, "Event created without its image");
        return render_with_status(
            e.status(),
            &form_page(
                &user,
                "Edit event",
                format!("/admin/events/{id}/edit"),
                form.values(),
                Some(format!(
                    "Event created, but the image was not saved: {}",
                    e.public_message()
                )),
            ),
        );
    }

    Ok(Redirect::to(&format!("/events/{id}")).into_response())
}

pub async fn edit_event_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Html<String>, PageError> {
    let user = require(user, Permission::EventEdit)?;

    let event = services::events::find_event(&state.db, id).await?;
    render(&form_page(
        &user,
        "Edit event",
        format!("/admin/events/{id}/edit"),
        EventFormValues::from(&event),
        None,
    ))
}

#[instrument(skip(state, user, form))]
pub async fn edit_event_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    TypedMultipart(form): TypedMultipart<EventForm>,
) -> Result<Response, PageError> {
    let user = require(user, Permission::EventEdit)?;

    let result = async {
        let input = form.input()?;
        let image = form.image(state.blobs.max_size())?;
        let patch = UpdateEventRequest {
            title: Some(input.title),
            description: Some(input.description),
            location: Some(input.location),
            start_time: Some(input.start_time),
            end_time: Some(input.end_time),
        };
        services::events::update_event(&state, &user, id, patch).await?;
        if let Some((name, data)) = image {
            services::events::set_image(&state, &user, id, &name, &data).await?;
        }
        Ok::<_, AppError>(())
    }
    .await;

    match result {
        Ok(()) => Ok(Redirect::to(&format!("/events/{id}")).into_response()),
        Err(e) => {
            let (status, message) = form_error(e)?;
            render_with_status(
                status,
                &form_page(
                    &user,
                    "Edit event",
                    format!("/admin/events/{id}/edit"),
                    form.values(),
                    Some(message),
                ),
            )
        }
    }
}

#[instrument(skip(state, user))]
pub async fn delete_event_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, PageError> {
    let user = require(user, Permission::EventDelete)?;

    services::events::delete_event(&state, &user, id).await?;
    Ok(Redirect::to("/events"))
}
