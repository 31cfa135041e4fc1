//! Mock MetadataRepository implementation for testing

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shorty_core::{AppError, AssetMetadata, AssetStatus};
use shorty_db::{MetadataRepository, StaleCursor};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Repository that keeps records in memory, keyed by id
#[derive(Clone, Default)]
pub struct MockMetadataRepository {
    records: Arc<Mutex<HashMap<String, AssetMetadata>>>,
    get_by_id_calls: Arc<AtomicUsize>,
    fail_batch: Arc<AtomicBool>,
    fail_set_status: Arc<AtomicBool>,
    skip_status_updates: Arc<AtomicBool>,
    fail_reads: Arc<AtomicBool>,
}

impl MockMetadataRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_batch(&self, fail: bool) {
        self.fail_batch.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_set_status(&self, fail: bool) {
        self.fail_set_status.store(fail, Ordering::SeqCst);
    }

    /// `set_status` succeeds but changes nothing, as if every row had been
    /// moved on by someone else.
    pub fn set_skip_status_updates(&self, skip: bool) {
        self.skip_status_updates.store(skip, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn get_by_id_calls(&self) -> usize {
        self.get_by_id_calls.load(Ordering::SeqCst)
    }

    pub fn record(&self, id: &str) -> Option<AssetMetadata> {
        self.records.lock().unwrap().get(id).cloned()
    }

    pub fn records(&self) -> Vec<AssetMetadata> {
        self.records.lock().unwrap().values().cloned().collect()
    }

    pub fn insert(&self, record: AssetMetadata) {
        self.records
            .lock()
            .unwrap()
            .insert(record.id.clone(), record);
    }

    fn simulated(operation: &str) -> AppError {
        AppError::Internal(format!("simulated database failure in {}", operation))
    }
}

#[async_trait]
impl MetadataRepository for MockMetadataRepository {
    async fn save_metadata_batch(&self, records: &[AssetMetadata]) -> Result<(), AppError> {
        if self.fail_batch.load(Ordering::SeqCst) {
            return Err(Self::simulated("save_metadata_batch"));
        }

        let mut stored = self.records.lock().unwrap();
        let conflict = records.iter().any(|r| {
            stored.contains_key(&r.id) || stored.values().any(|s| s.resource_id == r.resource_id)
        });
        if conflict {
            return Err(AppError::Internal("duplicate key".to_string()));
        }

        for record in records {
            stored.insert(record.id.clone(), record.clone());
        }
        Ok(())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<AssetMetadata>, AppError> {
        self.get_by_id_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::simulated("get_by_id"));
        }
        Ok(self.record(id))
    }

    async fn get_duplicate(
        &self,
        bucket: &str,
        size: i64,
        hash: &str,
    ) -> Result<Option<AssetMetadata>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::simulated("get_duplicate"));
        }
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.bucket == bucket && r.size == size && r.hash == hash && r.is_created()
            })
            .min_by_key(|r| r.created_at)
            .cloned())
    }

    async fn set_status(&self, status: AssetStatus, ids: &[String]) -> Result<u64, AppError> {
        if self.fail_set_status.load(Ordering::SeqCst) {
            return Err(Self::simulated("set_status"));
        }
        let predecessor = status.predecessor().ok_or_else(|| {
            AppError::InvalidInput(format!("assets cannot transition to {}", status))
        })?;
        if self.skip_status_updates.load(Ordering::SeqCst) {
            return Ok(0);
        }

        let mut stored = self.records.lock().unwrap();
        let mut updated = 0;
        for id in ids {
            if let Some(record) = stored.get_mut(id) {
                if record.status == predecessor {
                    record.status = status;
                    updated += 1;
                }
            }
        }
        Ok(updated)
    }

    async fn list_stale_assets(
        &self,
        status: AssetStatus,
        older_than: DateTime<Utc>,
        after: Option<&StaleCursor>,
        limit: i64,
    ) -> Result<Vec<AssetMetadata>, AppError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::simulated("list_stale_assets"));
        }
        let after = after.map(|c| (c.created_at, c.id.clone()));
        let mut stale: Vec<AssetMetadata> = self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.status == status && r.created_at < older_than)
            .filter(|r| match &after {
                Some(cursor) => (r.created_at, r.id.clone()) > *cursor,
                None => true,
            })
            .cloned()
            .collect();
        stale.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        stale.truncate(limit.max(0) as usize);
        Ok(stale)
    }
}
