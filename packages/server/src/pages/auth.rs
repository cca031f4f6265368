use axum::Form;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum_extra::extract::CookieJar;
use serde::Deserialize;
use tracing::instrument;

use crate::error::AppError;
use crate::extractors::auth::MaybeUser;
use crate::models::auth::RegisterRequest;
use crate::pages::error::PageError;
use crate::pages::views::{LoginTemplate, Nav, RegisterTemplate, render, render_with_status};
use crate::services;
use crate::state::AppState;

#[derive(Deserialize)]
pub struct LoginForm {
    email: String,
    password: String,
}

#[derive(Deserialize)]
pub struct RegisterForm {
    first_name: String,
    last_name: String,
    email: String,
    password: String,
}

pub async fn login_page(MaybeUser(user): MaybeUser) -> Result<Response, PageError> {
    if user.is_some() {
        return Ok(Redirect::to("/events").into_response());
    }
    Ok(render(&LoginTemplate {
        nav: Nav::anonymous(),
        email: String::new(),
        error: None,
    })?
    .into_response())
}

#[instrument(skip(state, jar, form))]
pub async fn login_submit(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Result<Response, PageError> {
    match services::auth::login(&state, &form.email, &form.password).await {
        Ok((_, token)) => {
            let jar = jar.add(services::auth::session_cookie(token, &state.config.auth));
            Ok((jar, Redirect::to("/events")).into_response())
        }
        Err(AppError::Internal(detail)) => Err(PageError::Internal(detail)),
        Err(e) => render_with_status(
            e.status(),
            &LoginTemplate {
                nav: Nav::anonymous(),
                email: form.email,
                error: Some(e.public_message()),
            },
        ),
    }
}

pub async fn register_page() -> Result<Response, PageError> {
    Ok(render(&RegisterTemplate {
        nav: Nav::anonymous(),
        first_name: String::new(),
        last_name: String::new(),
        email: String::new(),
        error: None,
    })?
    .into_response())
}

#[instrument(skip(state, form))]
pub async fn register_submit(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, PageError> {
    let request = RegisterRequest {
        first_name: form.first_name.clone(),
        last_name: form.last_name.clone(),
        email: form.email.clone(),
        password: form.password,
    };

    match services::auth::register(&state, request).await {
        Ok(_) => Ok(Redirect::to("/login").into_response()),
        Err(AppError::Internal(detail)) => Err(PageError::Internal(detail)),
        Err(e) => render_with_status(
            e.status(),
            &RegisterTemplate {
                nav: Nav::anonymous(),
                first_name: form.first_name,
                last_name: form.last_name,
                email: form.email,
                error: Some(e.public_message()),
            },
        ),
    }
}

pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    (
        jar.remove(services::auth::removal_cookie()),
        Redirect::to("/"),
    )
}
