use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("document body must be a JSON object")]
    NotAnObject,

    #[error("invalid document key: {0}")]
    InvalidKey(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("document backend error: {0}")]
    Backend(String),
}

#[cfg(feature = "sea-orm")]
impl From<sea_orm::DbErr> for DocumentError {
    fn from(err: sea_orm::DbErr) -> Self {
        DocumentError::Backend(err.to_string())
    }
}
