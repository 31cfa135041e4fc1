//! Mock BlobStore implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use shorty_core::StorageBackend;
use shorty_storage::{BlobStore, StorageError, StorageResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// Blob store that keeps blobs in memory
///
/// Can be told to fail a specific put (1-based), or to hang every put after
/// the n-th so a caller can be cancelled mid-save.
#[derive(Clone, Default)]
pub struct MockBlobStore {
    blobs: Arc<Mutex<HashMap<(String, String), Vec<u8>>>>,
    put_calls: Arc<AtomicUsize>,
    get_calls: Arc<AtomicUsize>,
    fail_on_put: Arc<Mutex<Option<usize>>>,
    block_after: Arc<Mutex<Option<usize>>>,
    blocked: Arc<Notify>,
    fail_gets: Arc<AtomicBool>,
}

impl MockBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the n-th put (counting from 1) fail.
    pub fn fail_on_put(&self, n: usize) {
        *self.fail_on_put.lock().unwrap() = Some(n);
    }

    /// Puts after the n-th never complete.
    pub fn block_puts_after(&self, n: usize) {
        *self.block_after.lock().unwrap() = Some(n);
    }

    /// Resolves once a put is hanging.
    pub async fn wait_until_blocked(&self) {
        self.blocked.notified().await;
    }

    /// Make every get fail with a backend error.
    pub fn set_fail_gets(&self, fail: bool) {
        self.fail_gets.store(fail, Ordering::SeqCst);
    }

    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::SeqCst)
    }

    pub fn get_calls(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    pub fn has_blob(&self, bucket: &str, key: &str) -> bool {
        self.blobs
            .lock()
            .unwrap()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn set_blob(&self, bucket: &str, key: &str, data: Vec<u8>) {
        self.blobs
            .lock()
            .unwrap()
            .insert((bucket.to_string(), key.to_string()), data);
    }

    pub fn remove_blob(&self, bucket: &str, key: &str) {
        self.blobs
            .lock()
            .unwrap()
            .remove(&(bucket.to_string(), key.to_string()));
    }
}

#[async_trait]
impl BlobStore for MockBlobStore {
    async fn put(&self, bucket: &str, key: &str, data: Bytes) -> StorageResult<()> {
        let n = self.put_calls.fetch_add(1, Ordering::SeqCst) + 1;
        let fail_on = *self.fail_on_put.lock().unwrap();
        let block_after = *self.block_after.lock().unwrap();

        if fail_on == Some(n) {
            return Err(StorageError::UploadFailed(format!(
                "simulated failure on put #{}",
                n
            )));
        }
        if matches!(block_after, Some(limit) if n > limit) {
            self.blocked.notify_one();
            std::future::pending::<()>().await;
        }

        self.set_blob(bucket, key, data.to_vec());
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> StorageResult<Vec<u8>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_gets.load(Ordering::SeqCst) {
            return Err(StorageError::BackendError("simulated read failure".to_string()));
        }
        self.blobs
            .lock()
            .unwrap()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StorageError::NotFound(format!("{}/{}", bucket, key)))
    }

    async fn exists(&self, bucket: &str, key: &str) -> StorageResult<bool> {
        Ok(self.has_blob(bucket, key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
