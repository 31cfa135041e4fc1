use crate::PendingDeletionQueue;
use async_trait::async_trait;
use shorty_core::AppError;
use std::sync::{Arc, Mutex};

/// Records every `(bucket, resource_id)` it is asked to delete.
#[derive(Clone, Default)]
pub struct RecordingDeletionQueue {
    enqueued: Arc<Mutex<Vec<(String, String)>>>,
}

impl RecordingDeletionQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueued(&self) -> Vec<(String, String)> {
        self.enqueued.lock().unwrap().clone()
    }
}

#[async_trait]
impl PendingDeletionQueue for RecordingDeletionQueue {
    async fn enqueue_pending_deletion(
        &self,
        bucket: &str,
        resource_ids: &[String],
    ) -> Result<(), AppError> {
        let mut enqueued = self.enqueued.lock().unwrap();
        for resource_id in resource_ids {
            enqueued.push((bucket.to_string(), resource_id.clone()));
        }
        Ok(())
    }
}
