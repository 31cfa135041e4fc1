use crate::keys::{validate_location, validate_segment};
use crate::traits::{BlobStore, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use std::collections::HashMap;

/// S3 blob store
///
/// Each logical bucket maps to its own S3 bucket named
/// `{bucket_prefix}{bucket}`. Only buckets passed to [`S3BlobStore::new`] are
/// addressable.
#[derive(Clone)]
pub struct S3BlobStore {
    stores: HashMap<String, AmazonS3>,
    bucket_prefix: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `buckets` - Logical bucket names (e.g., "images", "files")
    /// * `bucket_prefix` - Prefix prepended to every physical bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(
        buckets: &[String],
        bucket_prefix: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut stores = HashMap::with_capacity(buckets.len());

        for bucket in buckets {
            validate_segment("bucket", bucket)?;
            let physical = format!("{}{}", bucket_prefix, bucket);

            let mut builder = AmazonS3Builder::from_env()
                .with_region(region.clone())
                .with_bucket_name(physical);

            if let Some(ref endpoint) = endpoint_url {
                let allow_http = endpoint.starts_with("http://");
                builder = builder
                    .with_endpoint(endpoint.clone())
                    .with_allow_http(allow_http);
            }

            let store = builder
                .build()
                .map_err(|e| StorageError::ConfigError(e.to_string()))?;
            stores.insert(bucket.clone(), store);
        }

        Ok(S3BlobStore {
            stores,
            bucket_prefix,
        })
    }

    fn physical_bucket(&self, bucket: &str) -> String {
        format!("{}{}", self.bucket_prefix, bucket)
    }

    fn store_for(&self, bucket: &str, key: &str) -> StorageResult<(&AmazonS3, Path)> {
        validate_location(bucket, key)?;
        let store = self
            .stores
            .get(bucket)
            .ok_or_else(|| StorageError::UnknownBucket(bucket.to_string()))?;
        Ok((store, Path::from(key.to_string())))
    }
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let (store, location) = self.store_for(bucket, key)?;
        let size = data.len() as u64;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.physical_bucket(bucket),
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 put failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        tracing::info!(
            bucket = %self.physical_bucket(bucket),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 put successful"
        );

        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        let (store, location) = self.store_for(bucket, key)?;
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => {
                StorageError::NotFound(format!("{}/{}", bucket, key))
            }
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.physical_bucket(bucket),
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 get failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::debug!(
            bucket = %self.physical_bucket(bucket),
            key = %key,
            size_bytes = bytes.len() as u64,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 get successful"
        );

        Ok(bytes.to_vec())
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        let (store, location) = self.store_for(bucket, key)?;
        match store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> S3BlobStore {
        S3BlobStore::new(
            &["images".to_string(), "files".to_string()],
            "shorty-".to_string(),
            "us-east-1".to_string(),
            Some("http://localhost:9000".to_string()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_bucket_rejected_before_network() {
        let store = store();
        let result = store.get("videos", "abc").await;
        assert!(matches!(result, Err(StorageError::UnknownBucket(_))));
    }

    #[tokio::test]
    async fn test_invalid_key_rejected_before_network() {
        let store = store();
        let result = store.put("images", "a/b", Bytes::from_static(b"x")).await;
        assert!(matches!(result, Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_physical_bucket_name() {
        let store = store();
        assert_eq!(store.physical_bucket("images"), "shorty-images");
        assert_eq!(store.backend_type(), StorageBackend::S3);
    }
}
