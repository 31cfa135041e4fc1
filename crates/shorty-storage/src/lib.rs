//! Shorty Storage Library
//!
//! This crate provides the blob store abstraction used by the asset storage
//! and its implementations for S3 (via `object_store`) and the local filesystem.
//!
//! # Key layout
//!
//! Blobs are addressed by `(bucket, key)`. The bucket is a logical namespace
//! (`images`, `files`, ...) and the key is the asset's resource id. Neither may
//! contain `/` or `..`; validation lives in the `keys` module so every backend
//! applies the same rules.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_blob_store;
#[cfg(feature = "storage-local")]
pub use local::LocalBlobStore;
#[cfg(feature = "storage-s3")]
pub use s3::S3BlobStore;
pub use shorty_core::StorageBackend;
pub use traits::{BlobStore, StorageError, StorageResult};
