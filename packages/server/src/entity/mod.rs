pub mod event;
pub mod feedback;
pub mod rsvp;
pub mod user;
