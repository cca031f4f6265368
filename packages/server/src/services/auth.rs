use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::Utc;
use common::Role;
use common::activity::{ActivityMessage, actions};
use sea_orm::*;
use serde_json::json;
use tracing::{debug, info};

use crate::config::AuthConfig;
use crate::entity::user;
use crate::error::AppError;
use crate::extractors::auth::{AuthUser, SESSION_COOKIE};
use crate::models::auth::{RegisterRequest, normalize_email, validate_register_request};
use crate::state::AppState;
use crate::utils::{hash, jwt};

/// Whether `email` (already normalized) is the configured bootstrap admin.
pub fn is_bootstrap_admin(config: &AuthConfig, email: &str) -> bool {
    config
        .bootstrap_admin_email
        .as_deref()
        .map(normalize_email)
        .is_some_and(|admin| !admin.is_empty() && admin == email)
}

pub async fn register(state: &AppState, payload: RegisterRequest) -> Result<user::Model, AppError> {
    validate_register_request(&payload)?;

    let email = normalize_email(&payload.email);
    let taken = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .is_some();
    if taken {
        return Err(AppError::EmailTaken);
    }

    let role = if is_bootstrap_admin(&state.config.auth, &email) {
        Role::Admin
    } else {
        Role::Member
    };
    let password_hash = hash::hash_password(&payload.password).await?;

    let new_user = user::ActiveModel {
        first_name: Set(payload.first_name.trim().to_string()),
        last_name: Set(payload.last_name.trim().to_string()),
        email: Set(email),
        password_hash: Set(password_hash),
        role: Set(role),
        committee_position: Set(None),
        created_at: Set(Utc::now()),
        ..Default::default()
    };

    let user = new_user.insert(&state.db).await.map_err(|e| match e.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            debug!("Registration race condition: unique constraint caught on insert");
            AppError::EmailTaken
        }
        _ => AppError::from(e),
    })?;

    info!(user_id = user.id, %role, "User registered");
    state.activity.dispatch(ActivityMessage::action(
        Some(AuthUser::from(user.clone()).actor()),
        actions::REGISTERED,
        json!({ "name": user.full_name() }),
    ));
    Ok(user)
}

/// Check credentials and issue a session token.
pub async fn login(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<(user::Model, String), AppError> {
    let email = normalize_email(email);
    let user = user::Entity::find()
        .filter(user::Column::Email.eq(&email))
        .one(&state.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

    if !hash::verify_password(password, &user.password_hash).await? {
        return Err(AppError::InvalidCredentials);
    }

    let auth = &state.config.auth;
    let token = jwt::sign(user.id, &user.email, &auth.jwt_secret, auth.token_ttl_hours)
        .map_err(|e| AppError::Internal(format!("JWT sign error: {e}")))?;

    state.activity.dispatch(ActivityMessage::action(
        Some(AuthUser::from(user.clone()).actor()),
        actions::LOGIN,
        serde_json::Value::Null,
    ));
    Ok((user, token))
}

pub fn session_cookie(token: String, config: &AuthConfig) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(time::Duration::hours(config.token_ttl_hours))
        .build()
}

/// Removal cookie; the path must match the one used when setting it.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}
