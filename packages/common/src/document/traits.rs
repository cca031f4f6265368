use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::DocumentError;

/// A schema-less JSON document addressed by `(collection, id)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct Document {
    pub collection: String,
    pub id: String,
    #[schema(value_type = Object)]
    pub data: Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Read-modify-write closure for [`DocumentStore::update`].
///
/// Receives the current body (`None` if the document does not exist) and
/// returns the new body, which must be a JSON object.
pub type DocumentUpdate = Box<dyn FnOnce(Option<Value>) -> Value + Send>;

/// Append-friendly document storage for logs, audit trails and derived stats.
///
/// No referential integrity is implied between documents and relational rows.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create or overwrite a document. With `merge`, top-level fields of
    /// `data` are merged into the existing body instead of replacing it.
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        merge: bool,
    ) -> Result<(), DocumentError>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError>;

    /// Delete a document. Returns `true` if it existed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentError>;

    /// Atomically apply `apply` to a single document and return the stored body.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        apply: DocumentUpdate,
    ) -> Result<Value, DocumentError>;

    /// Newest documents first (by creation time, then id), at most `limit`.
    async fn latest(&self, collection: &str, limit: u64) -> Result<Vec<Document>, DocumentError>;

    /// Every document in a collection, in no particular order.
    async fn all(&self, collection: &str) -> Result<Vec<Document>, DocumentError>;
}

/// Shallow merge of `incoming` over `existing`.
///
/// Non-object inputs are replaced wholesale by `incoming`.
pub fn merge_documents(existing: Option<Value>, incoming: Value) -> Value {
    match (existing, incoming) {
        (Some(Value::Object(mut base)), Value::Object(fields)) => {
            for (key, value) in fields {
                base.insert(key, value);
            }
            Value::Object(base)
        }
        (_, incoming) => incoming,
    }
}

pub(crate) fn ensure_object(data: &Value) -> Result<(), DocumentError> {
    if data.is_object() {
        Ok(())
    } else {
        Err(DocumentError::NotAnObject)
    }
}

pub(crate) fn validate_key(collection: &str, id: &str) -> Result<(), DocumentError> {
    for (name, part) in [("collection", collection), ("id", id)] {
        if part.trim().is_empty() {
            return Err(DocumentError::InvalidKey(format!("{name} must not be empty")));
        }
        if part.contains('/') || part.chars().any(|c| c.is_control()) {
            return Err(DocumentError::InvalidKey(format!(
                "{name} '{part}' contains forbidden characters"
            )));
        }
    }
    Ok(())
}
