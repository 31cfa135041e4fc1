//! Outbound port for blob garbage collection
//!
//! Nothing in this crate deletes blobs. Resource ids whose blobs should be
//! removed are handed to a [`PendingDeletionQueue`], implemented by whatever
//! collector the deployment runs.

use async_trait::async_trait;
use shorty_core::AppError;

#[async_trait]
pub trait PendingDeletionQueue: Send + Sync {
    /// Ask the collector to delete the blobs `resource_ids` in `bucket`.
    async fn enqueue_pending_deletion(
        &self,
        bucket: &str,
        resource_ids: &[String],
    ) -> Result<(), AppError>;
}

/// Writes every request to the log for an external collector to pick up.
pub struct LoggingDeletionQueue;

#[async_trait]
impl PendingDeletionQueue for LoggingDeletionQueue {
    async fn enqueue_pending_deletion(
        &self,
        bucket: &str,
        resource_ids: &[String],
    ) -> Result<(), AppError> {
        for resource_id in resource_ids {
            tracing::info!(
                bucket = %bucket,
                resource_id = %resource_id,
                "Blob queued for deletion"
            );
        }
        Ok(())
    }
}

/// No-op implementation for when no collector is running
pub struct NoOpDeletionQueue;

#[async_trait]
impl PendingDeletionQueue for NoOpDeletionQueue {
    async fn enqueue_pending_deletion(
        &self,
        _bucket: &str,
        _resource_ids: &[String],
    ) -> Result<(), AppError> {
        Ok(())
    }
}
