//! Test helpers for asset storage tests
//!
//! In-memory implementations of the repository, blob store, cache and
//! deletion queue with call counters and failure injection. No database or
//! object store is needed.

pub mod mock_blob_store;
pub mod mock_cache;
pub mod mock_deletion_queue;
pub mod mock_repository;

pub use mock_blob_store::MockBlobStore;
pub use mock_cache::FailingMetadataCache;
pub use mock_deletion_queue::RecordingDeletionQueue;
pub use mock_repository::MockMetadataRepository;

use crate::AssetStorage;
use shorty_cache::{InMemoryMetadataCache, MetadataCache};
use shorty_core::{AlphanumericIdGenerator, Sha512Digest};
use std::sync::Arc;
use std::time::Duration;

/// Orchestrator over the given fakes, with a real in-memory cache.
pub fn create_test_asset_storage(
    repository: &MockMetadataRepository,
    blobs: &MockBlobStore,
) -> AssetStorage {
    let cache = InMemoryMetadataCache::new(100, Duration::from_secs(3600))
        .expect("non-zero capacity");
    create_test_asset_storage_with_cache(repository, blobs, Arc::new(cache))
}

pub fn create_test_asset_storage_with_cache(
    repository: &MockMetadataRepository,
    blobs: &MockBlobStore,
    cache: Arc<dyn MetadataCache>,
) -> AssetStorage {
    AssetStorage::new(
        Arc::new(repository.clone()),
        Arc::new(blobs.clone()),
        cache,
        Arc::new(Sha512Digest::new()),
        Arc::new(AlphanumericIdGenerator::default()),
    )
    .with_buckets(vec!["images".to_string(), "files".to_string()])
}
