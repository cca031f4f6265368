//! Database operations shared by the JSON API and the HTML pages.

pub mod admin;
pub mod auth;
pub mod events;
pub mod feedback;
pub mod rsvps;
