use async_trait::async_trait;
use shorty_cache::{CacheError, CacheResult, MetadataCache};
use shorty_core::AssetMetadata;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Cache whose every operation fails, e.g. an unreachable cache server.
#[derive(Clone, Default)]
pub struct FailingMetadataCache {
    calls: Arc<AtomicUsize>,
}

impl FailingMetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetadataCache for FailingMetadataCache {
    async fn put(&self, _record: &AssetMetadata) -> CacheResult<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }

    async fn get_and_refresh(&self, _id: &str) -> CacheResult<Option<AssetMetadata>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(CacheError::Unavailable("connection refused".to_string()))
    }
}
