pub mod config;
pub mod error;
pub mod process;

pub use config::LoggerAppConfig;
pub use error::{LoggerError, Result};
pub use process::{Outcome, handle_message, spawn_summary_task};
