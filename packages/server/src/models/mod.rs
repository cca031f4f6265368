pub mod admin;
pub mod auth;
pub mod event;
pub mod feedback;
pub mod rsvp;
pub mod shared;
