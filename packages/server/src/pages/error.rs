use askama::Template;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};

use crate::access::AccessDenied;
use crate::error::AppError;
use crate::pages::views::{ErrorTemplate, Nav};

/// Failures of the HTML surface: anonymous visitors are sent to the login
/// page, everything else renders the error page with a matching status.
#[derive(Debug)]
pub enum PageError {
    Login,
    Forbidden,
    NotFound(String),
    BadRequest(String),
    Internal(String),
}

impl From<AppError> for PageError {
    fn from(err: AppError) -> Self {
        match err {
            AppError::TokenMissing | AppError::TokenInvalid => PageError::Login,
            AppError::PermissionDenied => PageError::Forbidden,
            AppError::NotFound(msg) => PageError::NotFound(msg),
            AppError::Internal(detail) => PageError::Internal(detail),
            other => PageError::BadRequest(other.public_message()),
        }
    }
}

impl From<AccessDenied> for PageError {
    fn from(denied: AccessDenied) -> Self {
        match denied {
            AccessDenied::Unauthenticated => PageError::Login,
            AccessDenied::Forbidden => PageError::Forbidden,
        }
    }
}

impl From<askama::Error> for PageError {
    fn from(err: askama::Error) -> Self {
        PageError::Internal(format!("Template error: {err}"))
    }
}

impl IntoResponse for PageError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            PageError::Login => return Redirect::to("/login").into_response(),
            PageError::Forbidden => (
                StatusCode::FORBIDDEN,
                "You do not have permission to view this page.".to_string(),
            ),
            PageError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            PageError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            PageError::Internal(detail) => {
                tracing::error!("Page error: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong. Please try again.".to_string(),
                )
            }
        };

        let page = ErrorTemplate {
            nav: Nav::anonymous(),
            status: status.as_u16(),
            message,
        };
        match page.render() {
            Ok(html) => (status, Html(html)).into_response(),
            Err(e) => {
                tracing::error!("Failed to render error page: {}", e);
                status.into_response()
            }
        }
    }
}
