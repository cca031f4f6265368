use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::Value;
use tokio::sync::RwLock;

use super::error::DocumentError;
use super::traits::{
    Document, DocumentStore, DocumentUpdate, ensure_object, merge_documents, validate_key,
};

type Collections = HashMap<String, HashMap<String, Document>>;

/// Process-local document store.
///
/// Used for development and tests; contents are lost when the process exits.
#[derive(Default)]
pub struct MemoryDocumentStore {
    collections: RwLock<Collections>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents currently stored in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.len())
            .unwrap_or(0)
    }
}

fn write_document(
    collections: &mut Collections,
    collection: &str,
    id: &str,
    data: Value,
) -> Document {
    let now = Utc::now();
    let docs = collections.entry(collection.to_string()).or_default();
    let created_at = docs.get(id).map(|d| d.created_at).unwrap_or(now);
    let doc = Document {
        collection: collection.to_string(),
        id: id.to_string(),
        data,
        created_at,
        updated_at: now,
    };
    docs.insert(id.to_string(), doc.clone());
    doc
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn set(
        &self,
        collection: &str,
        id: &str,
        data: Value,
        merge: bool,
    ) -> Result<(), DocumentError> {
        validate_key(collection, id)?;
        ensure_object(&data)?;

        let mut collections = self.collections.write().await;
        let data = if merge {
            let existing = collections
                .get(collection)
                .and_then(|docs| docs.get(id))
                .map(|d| d.data.clone());
            merge_documents(existing, data)
        } else {
            data
        };
        write_document(&mut collections, collection, id, data);
        Ok(())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, DocumentError> {
        validate_key(collection, id)?;
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .and_then(|docs| docs.get(id))
            .cloned())
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool, DocumentError> {
        validate_key(collection, id)?;
        Ok(self
            .collections
            .write()
            .await
            .get_mut(collection)
            .and_then(|docs| docs.remove(id))
            .is_some())
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        apply: DocumentUpdate,
    ) -> Result<Value, DocumentError> {
        validate_key(collection, id)?;

        // The write lock is held across read and write so updates never interleave.
        let mut collections = self.collections.write().await;
        let current = collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|d| d.data.clone());
        let next = apply(current);
        ensure_object(&next)?;
        Ok(write_document(&mut collections, collection, id, next).data)
    }

    async fn latest(&self, collection: &str, limit: u64) -> Result<Vec<Document>, DocumentError> {
        let mut docs = self.all(collection).await?;
        docs.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        docs.truncate(limit as usize);
        Ok(docs)
    }

    async fn all(&self, collection: &str) -> Result<Vec<Document>, DocumentError> {
        Ok(self
            .collections
            .read()
            .await
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }
}
