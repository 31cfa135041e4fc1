//! Shared key validation for storage backends.
//!
//! Buckets and keys are single path segments: non-empty, no `/` or `\`, no `..`
//! and no leading `.`. All backends must run them through `validate_segment`.

use crate::traits::{StorageError, StorageResult};

pub fn validate_segment(kind: &str, segment: &str) -> StorageResult<()> {
    if segment.is_empty() {
        return Err(StorageError::InvalidKey(format!("{} must not be empty", kind)));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(StorageError::InvalidKey(format!(
            "{} must not contain path separators",
            kind
        )));
    }
    if segment.contains("..") || segment.starts_with('.') {
        return Err(StorageError::InvalidKey(format!(
            "{} contains invalid characters",
            kind
        )));
    }
    Ok(())
}

/// Validate a `(bucket, key)` pair.
pub fn validate_location(bucket: &str, key: &str) -> StorageResult<()> {
    validate_segment("bucket", bucket)?;
    validate_segment("key", key)
}
