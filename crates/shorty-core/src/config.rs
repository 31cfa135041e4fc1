//! Configuration module
//!
//! Configuration for the asset storage components: database, blob storage
//! backend, metadata cache, identifier/hash settings and the stale-asset
//! reconciler. Values come from environment variables with defaults.

use std::env;

use crate::constants::{DEFAULT_ID_LENGTH, FILES_BUCKET, IMAGES_BUCKET};
use crate::storage_types::StorageBackend;

// Common constants
const MAX_CONNECTIONS: u32 = 20;
const CONNECTION_TIMEOUT_SECS: u64 = 30;
const CACHE_TTL_SECS: u64 = 3600;
const MAX_CACHE_TTL_SECS: u64 = 30 * 24 * 3600;
const CACHE_CAPACITY: usize = 10_000;
const STALE_ASSET_AFTER_SECS: u64 = 3600;
const RECONCILE_BATCH_SIZE: i64 = 100;

/// Settings shared by every process touching the metadata database
#[derive(Clone, Debug)]
pub struct BaseConfig {
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
}

/// Asset storage configuration
#[derive(Clone, Debug)]
pub struct AssetStorageConfig {
    pub base: BaseConfig,
    // Blob storage
    pub storage_backend: Option<StorageBackend>,
    pub s3_bucket_prefix: String,
    pub s3_region: Option<String>,
    pub s3_endpoint: Option<String>, // Custom endpoint for S3-compatible providers (MinIO etc.)
    pub aws_region: Option<String>,
    pub local_storage_path: Option<String>,
    pub asset_buckets: Vec<String>,
    // Identifiers and hashing
    pub asset_id_length: usize,
    pub asset_hash_salt: Option<String>,
    // Metadata cache
    pub cache_ttl_secs: u64,
    pub cache_capacity: usize,
    // Reconciliation of stale pending assets
    pub stale_asset_after_secs: u64,
    /// Interval in seconds between reconciler runs. 0 = disabled.
    pub reconcile_interval_secs: u64,
    pub reconcile_batch_size: i64,
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config(pub Box<AssetStorageConfig>);

impl Config {
    fn as_assets(&self) -> &AssetStorageConfig {
        &self.0
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        let config = AssetStorageConfig::from_env()?;
        Ok(Config(Box::new(config)))
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        self.as_assets().validate()
    }

    pub fn database_url(&self) -> &str {
        &self.as_assets().base.database_url
    }

    pub fn db_max_connections(&self) -> u32 {
        self.as_assets().base.db_max_connections
    }

    pub fn db_timeout_seconds(&self) -> u64 {
        self.as_assets().base.db_timeout_seconds
    }

    pub fn storage_backend(&self) -> Option<StorageBackend> {
        self.as_assets().storage_backend
    }

    pub fn s3_bucket_prefix(&self) -> &str {
        &self.as_assets().s3_bucket_prefix
    }

    pub fn s3_region(&self) -> Option<&str> {
        self.as_assets().s3_region.as_deref()
    }

    pub fn s3_endpoint(&self) -> Option<&str> {
        self.as_assets().s3_endpoint.as_deref()
    }

    pub fn aws_region(&self) -> Option<&str> {
        self.as_assets().aws_region.as_deref()
    }

    pub fn local_storage_path(&self) -> Option<&str> {
        self.as_assets().local_storage_path.as_deref()
    }

    pub fn asset_buckets(&self) -> &[String] {
        &self.as_assets().asset_buckets
    }

    pub fn asset_id_length(&self) -> usize {
        self.as_assets().asset_id_length
    }

    pub fn asset_hash_salt(&self) -> Option<&str> {
        self.as_assets().asset_hash_salt.as_deref()
    }

    pub fn cache_ttl_secs(&self) -> u64 {
        self.as_assets().cache_ttl_secs
    }

    pub fn cache_capacity(&self) -> usize {
        self.as_assets().cache_capacity
    }

    pub fn stale_asset_after_secs(&self) -> u64 {
        self.as_assets().stale_asset_after_secs
    }

    pub fn reconcile_interval_secs(&self) -> u64 {
        self.as_assets().reconcile_interval_secs
    }

    pub fn reconcile_batch_size(&self) -> i64 {
        self.as_assets().reconcile_batch_size
    }
}

impl AssetStorageConfig {
    pub fn from_env() -> Result<Self, anyhow::Error> {
        Self::from_source(|key| env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_source<F>(var: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let base = BaseConfig {
            database_url: var("DATABASE_URL")
                .ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?,
            db_max_connections: var("DB_MAX_CONNECTIONS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: var("DB_TIMEOUT_SECONDS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
        };

        let storage_backend =
            var("STORAGE_BACKEND").and_then(|s| match s.to_lowercase().as_str() {
                "s3" => Some(StorageBackend::S3),
                "local" => Some(StorageBackend::Local),
                _ => None,
            });

        let asset_buckets = var("ASSET_BUCKETS")
            .unwrap_or_else(|| format!("{},{}", IMAGES_BUCKET, FILES_BUCKET))
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect();

        let config = AssetStorageConfig {
            base,
            storage_backend,
            s3_bucket_prefix: var("S3_BUCKET_PREFIX").unwrap_or_default(),
            s3_region: var("S3_REGION"),
            s3_endpoint: var("S3_ENDPOINT"),
            aws_region: var("AWS_REGION"),
            local_storage_path: var("LOCAL_STORAGE_PATH"),
            asset_buckets,
            asset_id_length: var("ASSET_ID_LENGTH")
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_ID_LENGTH),
            asset_hash_salt: var("ASSET_HASH_SALT").filter(|s| !s.is_empty()),
            cache_ttl_secs: var("CACHE_TTL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CACHE_TTL_SECS),
            cache_capacity: var("CACHE_CAPACITY")
                .and_then(|s| s.parse().ok())
                .unwrap_or(CACHE_CAPACITY),
            stale_asset_after_secs: var("STALE_ASSET_AFTER_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(STALE_ASSET_AFTER_SECS),
            reconcile_interval_secs: var("RECONCILE_INTERVAL_SECS")
                .and_then(|s| s.parse().ok())
                .unwrap_or(0),
            reconcile_batch_size: var("RECONCILE_BATCH_SIZE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(RECONCILE_BATCH_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if !self.base.database_url.starts_with("postgresql://")
            && !self.base.database_url.starts_with("postgres://")
        {
            return Err(anyhow::anyhow!(
                "DATABASE_URL must be a valid PostgreSQL connection string"
            ));
        }

        if self.asset_buckets.is_empty() {
            return Err(anyhow::anyhow!("ASSET_BUCKETS must list at least one bucket"));
        }

        if self.asset_id_length < 16 {
            return Err(anyhow::anyhow!(
                "ASSET_ID_LENGTH must be at least 16 characters"
            ));
        }

        if self.cache_capacity == 0 {
            return Err(anyhow::anyhow!("CACHE_CAPACITY must be greater than zero"));
        }

        if self.cache_ttl_secs == 0 || self.cache_ttl_secs > MAX_CACHE_TTL_SECS {
            return Err(anyhow::anyhow!(
                "CACHE_TTL_SECS must be between 1 and {}",
                MAX_CACHE_TTL_SECS
            ));
        }

        if self.reconcile_batch_size <= 0 {
            return Err(anyhow::anyhow!(
                "RECONCILE_BATCH_SIZE must be greater than zero"
            ));
        }

        let backend = self.storage_backend.unwrap_or(StorageBackend::S3);
        match backend {
            StorageBackend::S3 => {
                if self.s3_region.is_none() && self.aws_region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Local => {
                if self.local_storage_path.is_none() {
                    return Err(anyhow::anyhow!(
                        "LOCAL_STORAGE_PATH must be set when using local storage backend"
                    ));
                }
            }
        }

        Ok(())
    }
}
