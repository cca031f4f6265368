use axum::Form;
use axum::extract::{Path, State};
use axum::response::{Html, Redirect};
use common::Role;
use common::document::collections;
use serde::Deserialize;
use tracing::instrument;

use crate::access::Permission;
use crate::extractors::auth::MaybeUser;
use crate::pages::error::PageError;
use crate::pages::require;
use crate::pages::views::*;
use crate::services;
use crate::state::AppState;

const LOG_PAGE_SIZE: u64 = 50;

pub async fn users_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let admin = require(user, Permission::UserManage)?;

    let users = services::admin::list_users(&state.db)
        .await?
        .into_iter()
        .map(|u| UserRow::new(u, admin.user_id))
        .collect();
    render(&AdminUsersTemplate {
        nav: Nav::for_user(Some(&admin)),
        users,
    })
}

#[derive(Deserialize)]
pub struct RoleForm {
    role: String,
    #[serde(default)]
    committee_position: Option<String>,
}

#[instrument(skip(state, user, form))]
pub async fn role_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
    Form(form): Form<RoleForm>,
) -> Result<Redirect, PageError> {
    let admin = require(user, Permission::UserManage)?;
    let role: Role = form.role.parse().map_err(PageError::BadRequest)?;

    services::admin::update_role(
        &state,
        &admin,
        id,
        role,
        form.committee_position.as_deref(),
    )
    .await?;
    Ok(Redirect::to("/admin/users"))
}

#[instrument(skip(state, user))]
pub async fn delete_user_submit(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> Result<Redirect, PageError> {
    let admin = require(user, Permission::UserManage)?;

    services::admin::delete_user(&state, &admin, id).await?;
    Ok(Redirect::to("/admin/users"))
}

pub async fn logs_page(
    MaybeUser(user): MaybeUser,
    State(state): State<AppState>,
) -> Result<Html<String>, PageError> {
    let admin = require(user, Permission::LogView)?;

    let logs = services::admin::recent(&state, collections::ACTIVITY_LOGS, LOG_PAGE_SIZE)
        .await?
        .into_iter()
        .map(LogRow::from)
        .collect();
    let audits = services::admin::recent(&state, collections::AUDIT_RECORDS, LOG_PAGE_SIZE)
        .await?
        .into_iter()
        .map(LogRow::from)
        .collect();

    render(&AdminLogsTemplate {
        nav: Nav::for_user(Some(&admin)),
        logs,
        audits,
    })
}
