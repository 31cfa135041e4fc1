//! Shorty Core Library
//!
//! This crate provides the asset data model, error types, configuration and the
//! hashing utilities shared by every Shorty asset-storage component.

pub mod config;
pub mod constants;
pub mod error;
pub mod hashing;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{AssetStorageConfig, BaseConfig, Config};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use hashing::{
    fingerprint, AlphanumericIdGenerator, ContentDigest, ContentFingerprint, IdGenerator,
    Sha512Digest,
};
pub use models::{AssetMetadata, AssetStatus};
pub use storage_types::StorageBackend;
