//! Content deduplication
//!
//! Content identity is approximated by `(size, digest)` within a bucket. The
//! lookup and the following save are not locked together: two concurrent
//! uploads of the same bytes can both miss and both be stored. The result is
//! a redundant copy, never a corrupted one.

use shorty_core::{fingerprint, AppError, AssetMetadata, ContentDigest};
use shorty_db::MetadataRepository;
use std::sync::Arc;

/// Result of a duplicate lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DedupOutcome {
    /// Identical content is already stored; reuse this record.
    Existing(AssetMetadata),
    /// No stored copy; the fingerprint of the content looked up.
    Missing { size: i64, hash: String },
}

#[derive(Clone)]
pub struct DedupResolver {
    repository: Arc<dyn MetadataRepository>,
    digest: Arc<dyn ContentDigest>,
}

impl DedupResolver {
    /// `digest` must be the one the asset storage hashes with, or nothing
    /// will ever match.
    pub fn new(repository: Arc<dyn MetadataRepository>, digest: Arc<dyn ContentDigest>) -> Self {
        Self { repository, digest }
    }

    #[tracing::instrument(skip(self, content), fields(size = content.len()))]
    pub async fn resolve(&self, bucket: &str, content: &[u8]) -> Result<DedupOutcome, AppError> {
        let fp = fingerprint(self.digest.as_ref(), content);

        let existing = self
            .repository
            .get_duplicate(bucket, fp.size, &fp.hash)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, bucket = %bucket, "Duplicate lookup failed");
                AppError::Internal("failed to look up duplicate content".to_string())
            })?;

        match existing {
            Some(record) => {
                tracing::debug!(asset_id = %record.id, bucket = %bucket, "Found duplicate asset");
                Ok(DedupOutcome::Existing(record))
            }
            None => Ok(DedupOutcome::Missing {
                size: fp.size,
                hash: fp.hash,
            }),
        }
    }
}
