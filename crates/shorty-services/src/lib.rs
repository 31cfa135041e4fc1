//! Shorty Services Layer
//!
//! Coordinates the metadata repository, blob store and metadata cache into the
//! asset operations used by upstream services: saving new content, reading it
//! back, and finding existing identical content before saving.

pub mod asset_storage;
pub mod dedup;
pub mod deletion;

// Test helpers (in-memory backends)
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

pub use asset_storage::AssetStorage;
pub use dedup::{DedupOutcome, DedupResolver};
pub use deletion::{LoggingDeletionQueue, NoOpDeletionQueue, PendingDeletionQueue};
pub use shorty_cache::{create_metadata_cache, InMemoryMetadataCache, MetadataCache};
pub use shorty_db::{MetadataRepository, PgMetadataRepository, StaleCursor};
pub use shorty_storage::{create_blob_store, BlobStore, LocalBlobStore, S3BlobStore};
