//! Asset storage orchestrator
//!
//! Saving writes to three backends with no shared transaction, so it runs as a
//! saga: reserve metadata as `pending`, write the blobs, then mark the records
//! `created` and warm the cache. A failure at any step stops the saga and
//! leaves what was already written in place. Records stuck in `pending` are
//! picked up later through [`AssetStorage::list_stale_assets`].
//!
//! Dropping a `save_assets` future part-way behaves the same as a failure at
//! that point.

use bytes::Bytes;
use chrono::{DateTime, Utc};
use shorty_cache::MetadataCache;
use shorty_core::{
    fingerprint, AlphanumericIdGenerator, AppError, AssetMetadata, AssetStatus, Config,
    ContentDigest, IdGenerator, Sha512Digest,
};
use shorty_db::{MetadataRepository, StaleCursor};
use shorty_storage::BlobStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AssetStorage {
    repository: Arc<dyn MetadataRepository>,
    blobs: Arc<dyn BlobStore>,
    cache: Arc<dyn MetadataCache>,
    digest: Arc<dyn ContentDigest>,
    ids: Arc<dyn IdGenerator>,
    /// When non-empty, only these buckets are accepted.
    buckets: Arc<[String]>,
}

impl AssetStorage {
    pub fn new(
        repository: Arc<dyn MetadataRepository>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<dyn MetadataCache>,
        digest: Arc<dyn ContentDigest>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            repository,
            blobs,
            cache,
            digest,
            ids,
            buckets: Arc::from(Vec::<String>::new()),
        }
    }

    /// Build the orchestrator with the digest, id generator and bucket list
    /// described by the configuration.
    pub fn from_config(
        config: &Config,
        repository: Arc<dyn MetadataRepository>,
        blobs: Arc<dyn BlobStore>,
        cache: Arc<dyn MetadataCache>,
    ) -> Self {
        let digest: Arc<dyn ContentDigest> = match config.asset_hash_salt() {
            Some(salt) => Arc::new(Sha512Digest::with_salt(salt.as_bytes())),
            None => Arc::new(Sha512Digest::new()),
        };
        let ids = Arc::new(AlphanumericIdGenerator::new(config.asset_id_length()));

        Self::new(repository, blobs, cache, digest, ids)
            .with_buckets(config.asset_buckets().to_vec())
    }

    /// Restrict the accepted buckets.
    pub fn with_buckets(mut self, buckets: Vec<String>) -> Self {
        self.buckets = Arc::from(buckets);
        self
    }

    pub fn digest(&self) -> Arc<dyn ContentDigest> {
        self.digest.clone()
    }

    pub fn repository(&self) -> Arc<dyn MetadataRepository> {
        self.repository.clone()
    }

    pub fn blob_store(&self) -> Arc<dyn BlobStore> {
        self.blobs.clone()
    }

    fn validate_bucket(&self, bucket: &str) -> Result<(), AppError> {
        let well_formed = !bucket.is_empty()
            && bucket
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '_');
        if !well_formed {
            return Err(AppError::InvalidInput(format!(
                "invalid bucket name: {:?}",
                bucket
            )));
        }
        if !self.buckets.is_empty() && !self.buckets.iter().any(|b| b == bucket) {
            return Err(AppError::InvalidInput(format!("unknown bucket: {}", bucket)));
        }
        Ok(())
    }

    /// Store `blobs` in `bucket` and return one `created` record per blob, in
    /// input order.
    ///
    /// An empty input returns an empty list without touching any backend.
    #[tracing::instrument(skip(self, blobs), fields(bucket = %bucket, count = blobs.len()))]
    pub async fn save_assets(
        &self,
        bucket: &str,
        blobs: Vec<Bytes>,
    ) -> Result<Vec<AssetMetadata>, AppError> {
        self.validate_bucket(bucket)?;
        if blobs.is_empty() {
            return Ok(Vec::new());
        }

        let mut records: Vec<AssetMetadata> = blobs
            .iter()
            .map(|blob| {
                let fp = fingerprint(self.digest.as_ref(), blob);
                AssetMetadata::pending(
                    self.ids.generate(),
                    self.ids.generate(),
                    fp.size,
                    fp.hash,
                    bucket,
                )
            })
            .collect();

        self.repository
            .save_metadata_batch(&records)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    count = records.len(),
                    "Failed to save asset metadata"
                );
                AppError::Internal("failed to save asset metadata".to_string())
            })?;

        for (record, blob) in records.iter().zip(blobs) {
            self.blobs
                .put(bucket, &record.resource_id, blob)
                .await
                .map_err(|e| {
                    tracing::error!(
                        error = %e,
                        bucket = %bucket,
                        asset_id = %record.id,
                        resource_id = %record.resource_id,
                        "Failed to write asset blob"
                    );
                    AppError::Internal("failed to store asset content".to_string())
                })?;
        }

        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        let updated = self
            .repository
            .set_status(AssetStatus::Created, &ids)
            .await
            .map_err(|e| {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    count = ids.len(),
                    "Failed to mark assets as created"
                );
                AppError::Internal("failed to finalize assets".to_string())
            })?;

        if updated != ids.len() as u64 {
            tracing::error!(
                bucket = %bucket,
                requested = ids.len(),
                updated = updated,
                "Not every asset could be marked as created"
            );
            return Err(AppError::Internal("failed to finalize assets".to_string()));
        }

        for record in records.iter_mut() {
            record.status = AssetStatus::Created;
            if let Err(e) = self.cache.put(record).await {
                tracing::warn!(error = %e, asset_id = %record.id, "Failed to cache asset metadata");
            }
        }

        tracing::info!(bucket = %bucket, count = records.len(), "Assets saved");
        Ok(records)
    }

    /// Read the content of asset `id` from `bucket`.
    ///
    /// Records are served whatever their status; a `pending` record whose
    /// blob was never written reads as not found.
    #[tracing::instrument(skip(self), fields(bucket = %bucket, asset_id = %id))]
    pub async fn get_asset_bytes(&self, bucket: &str, id: &str) -> Result<Vec<u8>, AppError> {
        self.validate_bucket(bucket)?;

        let record = self
            .resolve_metadata(id)
            .await?
            .filter(|record| record.bucket == bucket)
            .ok_or_else(|| AppError::NotFound(format!("asset {} not found", id)))?;

        match self.blobs.get(&record.bucket, &record.resource_id).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.is_not_found() => {
                tracing::warn!(
                    asset_id = %id,
                    resource_id = %record.resource_id,
                    status = %record.status,
                    "Asset metadata exists but blob is missing"
                );
                Err(AppError::NotFound(format!("asset {} not found", id)))
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %bucket,
                    asset_id = %id,
                    resource_id = %record.resource_id,
                    "Failed to read asset blob"
                );
                Err(AppError::Internal("failed to read asset content".to_string()))
            }
        }
    }

    /// Cache first, then the repository. Repository hits are written back to
    /// the cache.
    async fn resolve_metadata(&self, id: &str) -> Result<Option<AssetMetadata>, AppError> {
        match self.cache.get_and_refresh(id).await {
            Ok(Some(record)) => return Ok(Some(record)),
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(error = %e, asset_id = %id, "Metadata cache lookup failed");
            }
        }

        let record = self.repository.get_by_id(id).await.map_err(|e| {
            tracing::error!(error = %e, asset_id = %id, "Failed to load asset metadata");
            AppError::Internal("failed to load asset metadata".to_string())
        })?;

        if let Some(ref record) = record {
            if let Err(e) = self.cache.put(record).await {
                tracing::warn!(error = %e, asset_id = %id, "Failed to cache asset metadata");
            }
        }

        Ok(record)
    }

    /// Records in `status` created before `older_than`, oldest first.
    ///
    /// Pass the last record of a page as `after` to fetch the next one.
    #[tracing::instrument(skip(self, after), fields(status = %status))]
    pub async fn list_stale_assets(
        &self,
        status: AssetStatus,
        older_than: DateTime<Utc>,
        after: Option<&StaleCursor>,
        limit: i64,
    ) -> Result<Vec<AssetMetadata>, AppError> {
        self.repository
            .list_stale_assets(status, older_than, after, limit)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, status = %status, "Failed to list stale assets");
                AppError::Internal("failed to list stale assets".to_string())
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::*;
    use chrono::Duration as ChronoDuration;
    use std::collections::HashSet;

    #[tokio::test]
    async fn test_round_trip_various_sizes() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let inputs = vec![
            Bytes::new(),
            Bytes::from(vec![7u8; 1024]),
            Bytes::from(vec![42u8; 1024 * 1024]),
        ];
        let saved = storage.save_assets("files", inputs.clone()).await.unwrap();
        assert_eq!(saved.len(), 3);

        for (record, input) in saved.iter().zip(&inputs) {
            assert_eq!(record.size, input.len() as i64);
            assert_eq!(record.status, AssetStatus::Created);
            let bytes = storage.get_asset_bytes("files", &record.id).await.unwrap();
            assert_eq!(bytes, input.to_vec());
        }
    }

    #[tokio::test]
    async fn test_round_trip_with_local_blob_store() {
        let dir = tempfile::tempdir().unwrap();
        let repo = MockMetadataRepository::new();
        let blobs = shorty_storage::LocalBlobStore::new(dir.path()).await.unwrap();
        let cache = shorty_cache::InMemoryMetadataCache::new(10, std::time::Duration::from_secs(60))
            .unwrap();
        let storage = AssetStorage::new(
            Arc::new(repo.clone()),
            Arc::new(blobs),
            Arc::new(cache),
            Arc::new(Sha512Digest::new()),
            Arc::new(AlphanumericIdGenerator::default()),
        );

        let saved = storage
            .save_assets("images", vec![Bytes::from_static(b"on disk")])
            .await
            .unwrap();

        assert!(dir.path().join("images").join(&saved[0].resource_id).exists());
        let bytes = storage.get_asset_bytes("images", &saved[0].id).await.unwrap();
        assert_eq!(bytes, b"on disk".to_vec());
    }

    #[tokio::test]
    async fn test_batch_ids_are_distinct() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let inputs: Vec<Bytes> = (0..10u8).map(|i| Bytes::from(vec![i])).collect();
        let saved = storage.save_assets("images", inputs).await.unwrap();

        let ids: HashSet<_> = saved.iter().map(|r| r.id.clone()).collect();
        let resource_ids: HashSet<_> = saved.iter().map(|r| r.resource_id.clone()).collect();
        assert_eq!(ids.len(), 10);
        assert_eq!(resource_ids.len(), 10);
        assert!(saved.iter().all(|r| !resource_ids.contains(&r.id)));
        assert!(saved.iter().all(|r| r.id.len() == 32 && r.hash.len() == 128));
    }

    #[tokio::test]
    async fn test_images_scenario() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let saved = storage
            .save_assets(
                "images",
                vec![Bytes::from_static(&[1, 2, 3]), Bytes::from_static(&[4, 5, 6])],
            )
            .await
            .unwrap();

        let digest = Sha512Digest::new();
        assert_eq!(saved[0].size, 3);
        assert_eq!(saved[0].hash, digest.digest(&[1, 2, 3]));
        assert_eq!(saved[1].hash, digest.digest(&[4, 5, 6]));
        assert_ne!(saved[0].hash, saved[1].hash);
        assert!(saved.iter().all(|r| r.bucket == "images"));

        assert_eq!(
            storage.get_asset_bytes("images", &saved[1].id).await.unwrap(),
            vec![4, 5, 6]
        );
        assert_eq!(repo.record(&saved[0].id).unwrap().status, AssetStatus::Created);
    }

    #[tokio::test]
    async fn test_empty_input_touches_nothing() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        repo.set_fail_batch(true);
        let storage = create_test_asset_storage(&repo, &blobs);

        let saved = storage.save_assets("images", Vec::new()).await.unwrap();
        assert!(saved.is_empty());
        assert_eq!(blobs.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_bucket_rejected() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        for bucket in ["", "../images", "Images", "videos"] {
            let result = storage
                .save_assets(bucket, vec![Bytes::from_static(b"x")])
                .await;
            assert!(
                matches!(result, Err(AppError::InvalidInput(_))),
                "{:?} should be rejected",
                bucket
            );
        }
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn test_blob_failure_leaves_written_rows_pending() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        blobs.fail_on_put(2);
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage
            .save_assets(
                "files",
                vec![Bytes::from_static(b"first"), Bytes::from_static(b"second")],
            )
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let records = repo.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == AssetStatus::Pending));

        let first = records.iter().find(|r| r.size == 5).unwrap();
        assert!(blobs.has_blob("files", &first.resource_id));
        assert_eq!(blobs.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_batch_insert_failure_writes_no_blobs() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        repo.set_fail_batch(true);
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage
            .save_assets("images", vec![Bytes::from_static(b"abc")])
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(blobs.put_calls(), 0);
        assert!(repo.records().is_empty());
    }

    #[tokio::test]
    async fn test_status_flip_failure_leaves_rows_pending_but_readable() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        repo.set_fail_set_status(true);
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage
            .save_assets("images", vec![Bytes::from_static(b"abc")])
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let record = repo.records().pop().unwrap();
        assert_eq!(record.status, AssetStatus::Pending);
        assert!(blobs.has_blob("images", &record.resource_id));

        let bytes = storage.get_asset_bytes("images", &record.id).await.unwrap();
        assert_eq!(bytes, b"abc".to_vec());
    }

    #[tokio::test]
    async fn test_partial_status_flip_is_not_reported_as_created() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        repo.set_skip_status_updates(true);
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage
            .save_assets("files", vec![Bytes::from_static(b"unconfirmed")])
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let record = repo.records().pop().unwrap();
        assert_eq!(record.status, AssetStatus::Pending);

        // Nothing was cached, so the read goes to the repository.
        storage.get_asset_bytes("files", &record.id).await.unwrap();
        assert_eq!(repo.get_by_id_calls(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_save_leaves_rows_pending() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        blobs.block_puts_after(1);
        let storage = create_test_asset_storage(&repo, &blobs);

        let task_storage = storage.clone();
        let handle = tokio::spawn(async move {
            task_storage
                .save_assets(
                    "files",
                    vec![Bytes::from_static(b"one"), Bytes::from_static(b"two")],
                )
                .await
        });

        blobs.wait_until_blocked().await;
        handle.abort();
        assert!(handle.await.unwrap_err().is_cancelled());

        let records = repo.records();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.status == AssetStatus::Pending));
        assert_eq!(blobs.blob_count(), 1);
    }

    #[tokio::test]
    async fn test_repeated_reads_hit_cache() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let saved = storage
            .save_assets("images", vec![Bytes::from_static(b"cached")])
            .await
            .unwrap();

        for _ in 0..5 {
            storage.get_asset_bytes("images", &saved[0].id).await.unwrap();
        }
        assert_eq!(repo.get_by_id_calls(), 0);
    }

    #[tokio::test]
    async fn test_cache_miss_falls_back_to_repository_once() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let mut record = AssetMetadata::pending(
            "existingassetid0000000000000000a".to_string(),
            "existingresource000000000000000a".to_string(),
            2,
            Sha512Digest::new().digest(b"hi"),
            "files",
        );
        record.status = AssetStatus::Created;
        repo.insert(record.clone());
        blobs.set_blob("files", &record.resource_id, b"hi".to_vec());

        for _ in 0..3 {
            let bytes = storage.get_asset_bytes("files", &record.id).await.unwrap();
            assert_eq!(bytes, b"hi".to_vec());
        }
        assert_eq!(repo.get_by_id_calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_failures_never_fail_operations() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let cache = FailingMetadataCache::new();
        let storage = create_test_asset_storage_with_cache(&repo, &blobs, Arc::new(cache.clone()));

        let saved = storage
            .save_assets("files", vec![Bytes::from_static(b"payload")])
            .await
            .unwrap();
        let bytes = storage.get_asset_bytes("files", &saved[0].id).await.unwrap();

        assert_eq!(bytes, b"payload".to_vec());
        assert!(cache.calls() >= 2);
        assert_eq!(repo.get_by_id_calls(), 1);
    }

    #[tokio::test]
    async fn test_unknown_id_is_not_found() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage.get_asset_bytes("images", "doesnotexist").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(blobs.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_bucket_mismatch_is_not_found() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let saved = storage
            .save_assets("images", vec![Bytes::from_static(b"img")])
            .await
            .unwrap();

        let result = storage.get_asset_bytes("files", &saved[0].id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(blobs.get_calls(), 0);
    }

    #[tokio::test]
    async fn test_missing_blob_is_not_found_and_backend_error_is_internal() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        let storage = create_test_asset_storage(&repo, &blobs);

        let saved = storage
            .save_assets("files", vec![Bytes::from_static(b"gone")])
            .await
            .unwrap();

        blobs.set_fail_gets(true);
        let result = storage.get_asset_bytes("files", &saved[0].id).await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        blobs.set_fail_gets(false);
        blobs.remove_blob("files", &saved[0].resource_id);
        let result = storage.get_asset_bytes("files", &saved[0].id).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert_eq!(blobs.get_calls(), 2);
    }

    #[tokio::test]
    async fn test_repository_read_failure_is_internal() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        repo.set_fail_reads(true);
        let storage = create_test_asset_storage(&repo, &blobs);

        let result = storage.get_asset_bytes("files", "anything").await;
        assert!(matches!(result, Err(AppError::Internal(_))));

        let result = storage
            .list_stale_assets(AssetStatus::Pending, Utc::now(), None, 10)
            .await;
        assert!(matches!(result, Err(AppError::Internal(_))));
    }

    #[tokio::test]
    async fn test_list_stale_assets_returns_old_pending_rows() {
        let repo = MockMetadataRepository::new();
        let blobs = MockBlobStore::new();
        blobs.fail_on_put(1);
        let storage = create_test_asset_storage(&repo, &blobs);

        let _ = storage
            .save_assets("files", vec![Bytes::from_static(b"orphan")])
            .await;
        let mut orphan = repo.records().pop().unwrap();
        orphan.created_at = Utc::now() - ChronoDuration::hours(2);
        repo.insert(orphan.clone());

        let stale = storage
            .list_stale_assets(
                AssetStatus::Pending,
                Utc::now() - ChronoDuration::hours(1),
                None,
                10,
            )
            .await
            .unwrap();
        assert_eq!(stale.len(), 1);
        assert_eq!(stale[0].id, orphan.id);

        let stale = storage
            .list_stale_assets(
                AssetStatus::Pending,
                Utc::now() - ChronoDuration::hours(3),
                None,
                10,
            )
            .await
            .unwrap();
        assert!(stale.is_empty());
    }
}
