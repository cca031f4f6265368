#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Attendance response recorded on an RSVP row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "lowercase")]
pub enum RsvpStatus {
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "going"))]
    Going,
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "cancelled"))]
    Cancelled,
}

impl RsvpStatus {
    pub fn from_going(going: bool) -> Self {
        if going { Self::Going } else { Self::Cancelled }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Going => "going",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_going(&self) -> bool {
        matches!(self, Self::Going)
    }
}

impl fmt::Display for RsvpStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
