use std::convert::Infallible;

use axum::extract::{FromRequestParts, OptionalFromRequestParts};
use axum::http::{header, request::Parts};
use axum_extra::extract::CookieJar;
use common::Role;
use common::activity::Actor;
use sea_orm::EntityTrait;

use crate::access::{self, Permission};
use crate::entity::user;
use crate::error::AppError;
use crate::state::AppState;
use crate::utils::jwt;

/// Name of the HttpOnly cookie carrying the session token.
pub const SESSION_COOKIE: &str = "rollcall_session";

/// Authenticated user, taken from `Authorization: Bearer <token>` or the
/// session cookie.
///
/// The user row is re-read on every request, so role changes and deletions
/// take effect immediately. Permission checks happen via
/// `require_permission()` in the handler body.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Role,
}

impl AuthUser {
    pub fn permissions(&self) -> &'static [Permission] {
        access::permissions_for(self.role)
    }

    pub fn has_permission(&self, permission: Permission) -> bool {
        access::check_access(Some(self.role), permission).is_ok()
    }

    /// Returns `Ok(())` if the user has the given permission, `Err(PermissionDenied)` otherwise.
    pub fn require_permission(&self, permission: Permission) -> Result<(), AppError> {
        access::check_access(Some(self.role), permission).map_err(AppError::from)
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.user_id,
            email: self.email.clone(),
            role: self.role,
        }
    }

    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

impl From<user::Model> for AuthUser {
    fn from(user: user::Model) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role: user.role,
        }
    }
}

impl From<access::AccessDenied> for AppError {
    fn from(denied: access::AccessDenied) -> Self {
        match denied {
            access::AccessDenied::Unauthenticated => AppError::TokenMissing,
            access::AccessDenied::Forbidden => AppError::PermissionDenied,
        }
    }
}

/// The bearer header wins over the cookie. A malformed header is an error
/// rather than a fallback to the cookie.
fn session_token(parts: &Parts) -> Result<Option<String>, AppError> {
    if let Some(value) = parts.headers.get(header::AUTHORIZATION) {
        let token = value
            .to_str()
            .ok()
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(AppError::TokenInvalid)?;
        return Ok(Some(token.trim().to_string()));
    }

    let jar = CookieJar::from_headers(&parts.headers);
    Ok(jar
        .get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|v| !v.is_empty()))
}

async fn load_user(token: &str, state: &AppState) -> Result<AuthUser, AppError> {
    let claims =
        jwt::verify(token, &state.config.auth.jwt_secret).map_err(|_| AppError::TokenInvalid)?;

    let user = user::Entity::find_by_id(claims.uid)
        .one(&state.db)
        .await?
        .ok_or(AppError::TokenInvalid)?;

    Ok(AuthUser::from(user))
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(parts)?.ok_or(AppError::TokenMissing)?;
        load_user(&token, state).await
    }
}

/// `Option<AuthUser>`: `None` when no credentials were sent, an error when
/// the credentials are invalid.
impl OptionalFromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Option<Self>, Self::Rejection> {
        match session_token(parts)? {
            Some(token) => load_user(&token, state).await.map(Some),
            None => Ok(None),
        }
    }
}

/// Page-side identity: a stale or invalid cookie simply means anonymous.
pub struct MaybeUser(pub Option<AuthUser>);

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = match session_token(parts) {
            Ok(Some(token)) => token,
            _ => return Ok(MaybeUser(None)),
        };
        match load_user(&token, state).await {
            Ok(user) => Ok(MaybeUser(Some(user))),
            Err(e) => {
                tracing::debug!("Ignoring page session: {}", e.code());
                Ok(MaybeUser(None))
            }
        }
    }
}
