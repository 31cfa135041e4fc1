use crate::traits::{CacheError, CacheResult, MetadataCache};
use async_trait::async_trait;
use lru::LruCache;
use shorty_core::AssetMetadata;
use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

struct CacheEntry {
    record: AssetMetadata,
    expires_at: Instant,
}

/// In-process metadata cache.
///
/// Bounded LRU; entries also expire `ttl` after their last write or hit.
/// Expired entries are dropped lazily when looked up.
pub struct InMemoryMetadataCache {
    entries: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl InMemoryMetadataCache {
    pub fn new(capacity: usize, ttl: Duration) -> CacheResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            CacheError::ConfigError("cache capacity must be greater than zero".to_string())
        })?;

        let cache = Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl,
        };
        cache.expiry(Instant::now())?;
        Ok(cache)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|entries| entries.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn expiry(&self, now: Instant) -> CacheResult<Instant> {
        now.checked_add(self.ttl).ok_or_else(|| {
            CacheError::ConfigError(format!("cache TTL {:?} is too large", self.ttl))
        })
    }

    fn lock(&self) -> CacheResult<std::sync::MutexGuard<'_, LruCache<String, CacheEntry>>> {
        self.entries
            .lock()
            .map_err(|_| CacheError::Unavailable("metadata cache lock poisoned".to_string()))
    }
}

#[async_trait]
impl MetadataCache for InMemoryMetadataCache {
    async fn put(&self, record: &AssetMetadata) -> CacheResult<()> {
        let entry = CacheEntry {
            record: record.clone(),
            expires_at: self.expiry(Instant::now())?,
        };
        self.lock()?.put(record.id.clone(), entry);
        Ok(())
    }

    async fn get_and_refresh(&self, id: &str) -> CacheResult<Option<AssetMetadata>> {
        let mut entries = self.lock()?;
        let now = Instant::now();

        match entries.get_mut(id) {
            None => return Ok(None),
            Some(entry) if entry.expires_at > now => {
                entry.expires_at = self.expiry(now)?;
                return Ok(Some(entry.record.clone()));
            }
            Some(_) => {}
        }

        entries.pop(id);
        tracing::debug!(asset_id = %id, "Evicted expired metadata cache entry");
        Ok(None)
    }
}
