use async_trait::async_trait;

use super::error::StorageError;
use super::hash::ContentHash;

/// Content-addressed blob storage for event images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store bytes and return their content hash.
    ///
    /// Storing the same bytes twice yields the same hash and a single blob.
    async fn put(
        &self,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ContentHash, StorageError>;

    /// Retrieve all bytes for a blob by its content hash.
    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError>;

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Delete a blob by its content hash.
    ///
    /// Returns `true` if the blob was deleted, `false` if it did not exist.
    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError>;

    /// Largest blob accepted by [`BlobStore::put`], in bytes.
    fn max_size(&self) -> u64;
}

pub(crate) fn check_size(data: &[u8], limit: u64) -> Result<(), StorageError> {
    let actual = data.len() as u64;
    if actual > limit {
        return Err(StorageError::SizeLimitExceeded { actual, limit });
    }
    Ok(())
}
