pub mod activity;
pub mod config;
pub mod document;
pub mod retry;
pub mod role;
pub mod rsvp_status;
pub mod storage;
pub mod summary;

pub use role::Role;
pub use rsvp_status::RsvpStatus;
