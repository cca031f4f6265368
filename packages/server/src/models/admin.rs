use chrono::{DateTime, Utc};
use common::Role;
use serde::{Deserialize, Serialize};

use crate::entity::user;
use crate::error::AppError;
use crate::models::shared::validate_max;

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserItem {
    pub id: i32,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    pub committee_position: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<user::Model> for UserItem {
    fn from(user: user::Model) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name,
            last_name: user.last_name,
            email: user.email,
            role: user.role,
            committee_position: user.committee_position,
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct UserListResponse {
    pub users: Vec<UserItem>,
}

#[derive(Deserialize, utoipa::ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
    /// Only kept when `role` is `committee`.
    #[schema(example = "Treasurer")]
    pub committee_position: Option<String>,
}

/// Trimmed position for committee members, `None` for every other role.
pub fn resolve_position(role: Role, position: Option<&str>) -> Result<Option<String>, AppError> {
    if role != Role::Committee {
        return Ok(None);
    }
    let position = position.map(str::trim).filter(|p| !p.is_empty());
    if let Some(p) = position {
        validate_max("Committee position", p, 50)?;
    }
    Ok(position.map(String::from))
}

/// A document-store entry (activity log or audit record).
#[derive(Serialize, utoipa::ToSchema)]
pub struct LogEntry {
    pub id: String,
    #[schema(value_type = Object)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<common::document::Document> for LogEntry {
    fn from(doc: common::document::Document) -> Self {
        Self {
            id: doc.id,
            data: doc.data,
            created_at: doc.created_at,
        }
    }
}

#[derive(Serialize, utoipa::ToSchema)]
pub struct LogListResponse {
    pub entries: Vec<LogEntry>,
}
