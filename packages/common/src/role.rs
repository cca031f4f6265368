#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Membership tier of a user.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in SeaORM entities.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema,
)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Regular member: browses events, RSVPs and leaves feedback.
    #[default]
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "member"))]
    Member,
    /// Committee member: additionally creates and edits events.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "committee"))]
    Committee,
    /// Administrator: additionally manages users and reads logs.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "admin"))]
    Admin,
}

impl Role {
    pub const ALL: &'static [Role] = &[Self::Member, Self::Committee, Self::Admin];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Member => "member",
            Self::Committee => "committee",
            Self::Admin => "admin",
        }
    }

    /// Committee and admin users count as staff.
    pub fn is_staff(&self) -> bool {
        matches!(self, Self::Committee | Self::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "member" => Ok(Self::Member),
            "committee" => Ok(Self::Committee),
            "admin" => Ok(Self::Admin),
            other => Err(format!("unknown role '{other}'")),
        }
    }
}
