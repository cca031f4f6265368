pub mod admin;
pub mod auth;
pub mod event;
pub mod feedback;
pub mod image;
pub mod rsvp;
