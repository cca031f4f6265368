use common::document::DocumentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoggerError {
    #[error("Document store error: {0}")]
    Document(#[from] DocumentError),
}

pub type Result<T> = std::result::Result<T, LoggerError>;
