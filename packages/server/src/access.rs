//! Static role to permission table and the access check shared by the API
//! and the HTML pages.

use std::fmt;

use common::Role;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Permission {
    EventView,
    RsvpOwn,
    FeedbackSubmit,
    EventCreate,
    EventEdit,
    EventDelete,
    RsvpViewAll,
    FeedbackViewAll,
    UserManage,
    LogView,
    SummaryManage,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EventView => "event:view",
            Self::RsvpOwn => "rsvp:own",
            Self::FeedbackSubmit => "feedback:submit",
            Self::EventCreate => "event:create",
            Self::EventEdit => "event:edit",
            Self::EventDelete => "event:delete",
            Self::RsvpViewAll => "rsvp:view_all",
            Self::FeedbackViewAll => "feedback:view_all",
            Self::UserManage => "user:manage",
            Self::LogView => "log:view",
            Self::SummaryManage => "summary:manage",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const MEMBER: &[Permission] = &[
    Permission::EventView,
    Permission::RsvpOwn,
    Permission::FeedbackSubmit,
];

const COMMITTEE: &[Permission] = &[
    Permission::EventView,
    Permission::RsvpOwn,
    Permission::FeedbackSubmit,
    Permission::EventCreate,
    Permission::EventEdit,
    Permission::EventDelete,
    Permission::RsvpViewAll,
    Permission::FeedbackViewAll,
];

const ADMIN: &[Permission] = &[
    Permission::EventView,
    Permission::RsvpOwn,
    Permission::FeedbackSubmit,
    Permission::EventCreate,
    Permission::EventEdit,
    Permission::EventDelete,
    Permission::RsvpViewAll,
    Permission::FeedbackViewAll,
    Permission::UserManage,
    Permission::LogView,
    Permission::SummaryManage,
];

pub fn permissions_for(role: Role) -> &'static [Permission] {
    match role {
        Role::Member => MEMBER,
        Role::Committee => COMMITTEE,
        Role::Admin => ADMIN,
    }
}

pub fn permission_names(role: Role) -> Vec<String> {
    permissions_for(role)
        .iter()
        .map(|p| p.as_str().to_string())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AccessDenied {
    Unauthenticated,
    Forbidden,
}

/// `role` is `None` for anonymous visitors.
pub fn check_access(role: Option<Role>, required: Permission) -> Result<(), AccessDenied> {
    let role = role.ok_or(AccessDenied::Unauthenticated)?;
    if permissions_for(role).contains(&required) {
        Ok(())
    } else {
        Err(AccessDenied::Forbidden)
    }
}
