use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

use crate::config::AppConfig;
use crate::handlers;
use crate::state::AppState;

pub fn routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .nest("/auth", auth_routes())
        .nest("/events", event_routes(config))
        .nest("/me", me_routes())
        .nest("/admin", admin_routes())
}

fn auth_routes() -> OpenApiRouter<AppState> {
    use handlers::auth::*;

    OpenApiRouter::new()
        .routes(routes!(register))
        .routes(routes!(login))
        .routes(routes!(logout))
        .routes(routes!(me))
}

fn event_routes(config: &AppConfig) -> OpenApiRouter<AppState> {
    use handlers::event::*;
    use handlers::feedback::*;
    use handlers::image::*;
    use handlers::rsvp::*;

    let images = OpenApiRouter::new()
        .routes(routes!(upload_image, get_image))
        .layer(image_upload_body_limit(config.storage.max_image_size));

    OpenApiRouter::new()
        .routes(routes!(list_events, create_event))
        .routes(routes!(get_event, update_event, delete_event))
        .routes(routes!(set_rsvp, remove_rsvp))
        .routes(routes!(list_attendees))
        .routes(routes!(submit_feedback, list_feedback))
        .merge(images)
}

fn me_routes() -> OpenApiRouter<AppState> {
    use handlers::rsvp::*;

    OpenApiRouter::new().routes(routes!(my_rsvps))
}

fn admin_routes() -> OpenApiRouter<AppState> {
    use handlers::admin::*;

    OpenApiRouter::new()
        .routes(routes!(list_users))
        .routes(routes!(update_role))
        .routes(routes!(delete_user))
        .routes(routes!(list_logs))
        .routes(routes!(list_audit))
        .routes(routes!(generate_summary))
        .routes(routes!(get_summary))
}
