//! Shorty metadata cache
//!
//! Cache-aside store for asset metadata with sliding expiration: every hit
//! pushes the entry's expiry one TTL further out. The cache is never the
//! source of truth; callers fall back to the metadata repository on a miss
//! or an error.

pub mod memory;
pub mod traits;

pub use memory::InMemoryMetadataCache;
pub use traits::{CacheError, CacheResult, MetadataCache};

use shorty_core::Config;
use std::sync::Arc;
use std::time::Duration;

/// Create the metadata cache described by the configuration
pub fn create_metadata_cache(config: &Config) -> CacheResult<Arc<dyn MetadataCache>> {
    let cache = InMemoryMetadataCache::new(
        config.cache_capacity(),
        Duration::from_secs(config.cache_ttl_secs()),
    )?;
    Ok(Arc::new(cache))
}
