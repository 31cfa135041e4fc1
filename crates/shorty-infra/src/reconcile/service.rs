use chrono::Utc;
use shorty_core::{AppError, AssetMetadata, AssetStatus, Config};
use shorty_services::{
    AssetStorage, BlobStore, MetadataRepository, PendingDeletionQueue, StaleCursor,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

#[derive(Debug, Clone)]
pub struct ReconcilerConfig {
    /// Minimum age of a pending row before it is reconciled.
    pub stale_after: Duration,
    /// Time between passes. Zero disables the background task.
    pub interval: Duration,
    /// Rows fetched per listing query.
    pub batch_size: i64,
}

impl ReconcilerConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            stale_after: Duration::from_secs(config.stale_asset_after_secs()),
            interval: Duration::from_secs(config.reconcile_interval_secs()),
            batch_size: config.reconcile_batch_size(),
        }
    }
}

/// Outcome of one reconciliation pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub scanned: usize,
    pub completed: usize,
    pub enqueued: usize,
    pub failed: usize,
}

enum RecordOutcome {
    Completed,
    Enqueued,
}

#[derive(Clone)]
pub struct AssetReconciler {
    storage: AssetStorage,
    deletion_queue: Arc<dyn PendingDeletionQueue>,
    config: ReconcilerConfig,
}

impl AssetReconciler {
    pub fn new(
        storage: AssetStorage,
        deletion_queue: Arc<dyn PendingDeletionQueue>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            storage,
            deletion_queue,
            config,
        }
    }

    /// Start the background reconciliation task
    ///
    /// Returns `None` when the configured interval is zero. The first pass
    /// runs immediately.
    pub fn start(self: Arc<Self>) -> Option<tokio::task::JoinHandle<()>> {
        if self.config.interval.is_zero() {
            tracing::info!("Asset reconciler disabled");
            return None;
        }

        Some(tokio::spawn(async move {
            let mut ticker = interval(self.config.interval);

            loop {
                ticker.tick().await;

                match self.reconcile_once().await {
                    Ok(report) if report.scanned > 0 => {
                        tracing::info!(
                            scanned = report.scanned,
                            completed = report.completed,
                            enqueued = report.enqueued,
                            failed = report.failed,
                            "Reconciliation pass completed"
                        );
                    }
                    Ok(_) => tracing::debug!("No stale assets to reconcile"),
                    Err(e) => tracing::error!(error = %e, "Reconciliation pass failed"),
                }
            }
        }))
    }

    /// Run one pass over every stale pending row, oldest first, fetching
    /// `batch_size` rows at a time.
    ///
    /// Pages are keyed on the last row seen, so rows left `pending` after
    /// being queued for deletion never hide newer rows. Each row is handled
    /// on its own; a failure is counted and logged and the pass moves on.
    #[tracing::instrument(skip(self), fields(reconcile.operation = "pending"))]
    pub async fn reconcile_once(&self) -> Result<ReconcileReport, AppError> {
        let stale_after = chrono::Duration::from_std(self.config.stale_after)
            .map_err(|e| AppError::InvalidInput(format!("invalid stale age: {}", e)))?;
        let older_than = Utc::now() - stale_after;

        let mut report = ReconcileReport::default();
        let mut cursor: Option<StaleCursor> = None;

        loop {
            let page = self
                .storage
                .list_stale_assets(
                    AssetStatus::Pending,
                    older_than,
                    cursor.as_ref(),
                    self.config.batch_size,
                )
                .await?;
            report.scanned += page.len();

            for record in &page {
                match self.reconcile_record(record).await {
                    Ok(RecordOutcome::Completed) => report.completed += 1,
                    Ok(RecordOutcome::Enqueued) => report.enqueued += 1,
                    Err(e) => {
                        report.failed += 1;
                        tracing::error!(
                            error = %e,
                            asset_id = %record.id,
                            resource_id = %record.resource_id,
                            bucket = %record.bucket,
                            "Failed to reconcile asset"
                        );
                    }
                }
            }

            match page.last() {
                Some(last) if page.len() as i64 >= self.config.batch_size => {
                    cursor = Some(StaleCursor::from(last));
                }
                _ => break,
            }
        }

        Ok(report)
    }

    async fn reconcile_record(&self, record: &AssetMetadata) -> Result<RecordOutcome, AppError> {
        let exists = self
            .storage
            .blob_store()
            .exists(&record.bucket, &record.resource_id)
            .await
            .map_err(|e| AppError::Storage(e.to_string()))?;

        if exists {
            self.storage
                .repository()
                .set_status(AssetStatus::Created, std::slice::from_ref(&record.id))
                .await?;
            tracing::info!(
                asset_id = %record.id,
                bucket = %record.bucket,
                "Completed stale pending asset"
            );
            Ok(RecordOutcome::Completed)
        } else {
            self.deletion_queue
                .enqueue_pending_deletion(&record.bucket, std::slice::from_ref(&record.resource_id))
                .await?;
            tracing::info!(
                asset_id = %record.id,
                resource_id = %record.resource_id,
                bucket = %record.bucket,
                "Stale pending asset has no blob, queued for deletion"
            );
            Ok(RecordOutcome::Enqueued)
        }
    }
}
