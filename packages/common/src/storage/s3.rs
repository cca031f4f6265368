use async_trait::async_trait;
use s3::creds::Credentials;
use s3::error::S3Error;
use s3::{Bucket, Region};

use super::error::StorageError;
use super::hash::ContentHash;
use super::traits::{BlobStore, check_size};
use crate::config::S3Config;

/// Stores images in an S3-compatible bucket under `{prefix}/{hash}`.
pub struct S3BlobStore {
    bucket: Box<Bucket>,
    prefix: String,
    max_size: u64,
}

impl From<S3Error> for StorageError {
    fn from(err: S3Error) -> Self {
        StorageError::Backend(err.to_string())
    }
}

impl S3BlobStore {
    pub fn new(config: &S3Config, max_size: u64) -> Result<Self, StorageError> {
        let region = match &config.endpoint {
            Some(endpoint) => Region::Custom {
                region: config.region.clone(),
                endpoint: endpoint.clone(),
            },
            None => config
                .region
                .parse()
                .map_err(|e| StorageError::Backend(format!("invalid region: {e}")))?,
        };
        let credentials = Credentials::new(
            config.access_key.as_deref(),
            config.secret_key.as_deref(),
            None,
            None,
            None,
        )
        .map_err(|e| StorageError::Backend(format!("invalid credentials: {e}")))?;

        let mut bucket = Bucket::new(&config.bucket, region, credentials)?;
        if config.path_style {
            bucket = bucket.with_path_style();
        }

        Ok(Self {
            bucket,
            prefix: config.prefix.trim_matches('/').to_string(),
            max_size,
        })
    }

    fn key(&self, hash: &ContentHash) -> String {
        object_key(&self.prefix, hash)
    }
}

fn object_key(prefix: &str, hash: &ContentHash) -> String {
    if prefix.is_empty() {
        hash.to_hex()
    } else {
        format!("{prefix}/{hash}")
    }
}

fn expect_success(status: u16, key: &str) -> Result<(), StorageError> {
    if (200..300).contains(&status) {
        Ok(())
    } else {
        Err(StorageError::Backend(format!(
            "unexpected status {status} for object {key}"
        )))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(
        &self,
        data: &[u8],
        content_type: Option<&str>,
    ) -> Result<ContentHash, StorageError> {
        check_size(data, self.max_size)?;

        let hash = ContentHash::compute(data);
        let key = self.key(&hash);
        let content_type = content_type.unwrap_or("application/octet-stream");
        let response = self
            .bucket
            .put_object_with_content_type(&key, data, content_type)
            .await?;
        expect_success(response.status_code(), &key)?;

        tracing::debug!(key = %key, size = data.len(), "Uploaded blob");
        Ok(hash)
    }

    async fn get(&self, hash: &ContentHash) -> Result<Vec<u8>, StorageError> {
        let key = self.key(hash);
        let response = self.bucket.get_object(&key).await?;
        if response.status_code() == 404 {
            return Err(StorageError::NotFound(hash.to_hex()));
        }
        expect_success(response.status_code(), &key)?;
        Ok(response.to_vec())
    }

    async fn exists(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        let key = self.key(hash);
        let (_, status) = self.bucket.head_object(&key).await?;
        match status {
            404 => Ok(false),
            status => expect_success(status, &key).map(|_| true),
        }
    }

    async fn delete(&self, hash: &ContentHash) -> Result<bool, StorageError> {
        if !self.exists(hash).await? {
            return Ok(false);
        }
        let key = self.key(hash);
        let response = self.bucket.delete_object(&key).await?;
        expect_success(response.status_code(), &key)?;
        Ok(true)
    }

    fn max_size(&self) -> u64 {
        self.max_size
    }
}
