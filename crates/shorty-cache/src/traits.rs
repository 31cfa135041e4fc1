use async_trait::async_trait;
use shorty_core::AssetMetadata;
use thiserror::Error;

/// Cache operation errors
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache unavailable: {0}")]
    Unavailable(String),

    #[error("Cache configuration error: {0}")]
    ConfigError(String),
}

pub type CacheResult<T> = Result<T, CacheError>;

/// Fast, non-authoritative lookup of asset metadata by id.
#[async_trait]
pub trait MetadataCache: Send + Sync {
    /// Store `record` under its id, replacing any previous entry.
    async fn put(&self, record: &AssetMetadata) -> CacheResult<()>;

    /// Look up `id`. A hit extends the entry's expiry by the full TTL.
    async fn get_and_refresh(&self, id: &str) -> CacheResult<Option<AssetMetadata>>;
}
