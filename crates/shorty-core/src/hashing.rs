//! Content digests and identifier generation.
//!
//! Both are injected into the asset storage as trait objects so tests can use
//! deterministic implementations. Any secret (the digest salt) is passed in at
//! construction time from configuration.

use rand::Rng;
use sha2::{Digest, Sha512};

use crate::constants::{DEFAULT_ID_LENGTH, ID_CHARSET};

/// Computes the content digest used for deduplication.
pub trait ContentDigest: Send + Sync {
    /// Lowercase hex digest of `content`.
    fn digest(&self, content: &[u8]) -> String;
}

/// SHA-512 digest, optionally salted.
#[derive(Clone, Default)]
pub struct Sha512Digest {
    salt: Option<Vec<u8>>,
}

impl Sha512Digest {
    pub fn new() -> Self {
        Self { salt: None }
    }

    /// The salt is fed to the hasher before the content. Changing it makes
    /// existing digests unmatchable, so it must stay stable across restarts.
    pub fn with_salt(salt: impl Into<Vec<u8>>) -> Self {
        Self {
            salt: Some(salt.into()),
        }
    }
}

impl ContentDigest for Sha512Digest {
    fn digest(&self, content: &[u8]) -> String {
        let mut hasher = Sha512::new();
        if let Some(ref salt) = self.salt {
            hasher.update(salt);
        }
        hasher.update(content);
        hex::encode(hasher.finalize())
    }
}

/// Generates opaque identifiers for assets and blob keys.
///
/// Uniqueness is not checked here: a collision surfaces as an insert failure
/// in the metadata repository.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random `[a-zA-Z0-9]` identifiers of a fixed length.
#[derive(Debug, Clone)]
pub struct AlphanumericIdGenerator {
    length: usize,
}

impl AlphanumericIdGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }
}

impl Default for AlphanumericIdGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LENGTH)
    }
}

impl IdGenerator for AlphanumericIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        (0..self.length)
            .map(|_| ID_CHARSET[rng.random_range(0..ID_CHARSET.len())] as char)
            .collect()
    }
}

/// The `(size, hash)` pair that identifies content for deduplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentFingerprint {
    pub size: i64,
    pub hash: String,
}

pub fn fingerprint(digest: &dyn ContentDigest, content: &[u8]) -> ContentFingerprint {
    ContentFingerprint {
        size: content.len() as i64,
        hash: digest.digest(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sha512_digest_is_512_bits_hex() {
        let digest = Sha512Digest::new().digest(b"hello");
        assert_eq!(digest.len(), 128);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(
            &digest[..16],
            "9b71d224bd62f378",
            "known SHA-512 prefix of \"hello\""
        );
    }

    #[test]
    fn test_salt_changes_digest() {
        let plain = Sha512Digest::new().digest(b"content");
        let salted = Sha512Digest::with_salt(b"pepper".to_vec()).digest(b"content");
        assert_ne!(plain, salted);
        assert_eq!(
            salted,
            Sha512Digest::with_salt(b"pepper".to_vec()).digest(b"content")
        );
    }

    #[test]
    fn test_generated_ids_are_alphanumeric_and_sized() {
        let generator = AlphanumericIdGenerator::default();
        let id = generator.generate();
        assert_eq!(id.len(), DEFAULT_ID_LENGTH);
        assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

        let short = AlphanumericIdGenerator::new(8).generate();
        assert_eq!(short.len(), 8);
    }

    #[test]
    fn test_generated_ids_differ() {
        let generator = AlphanumericIdGenerator::default();
        assert_ne!(generator.generate(), generator.generate());
    }

    #[test]
    fn test_fingerprint_empty_content() {
        let fp = fingerprint(&Sha512Digest::new(), &[]);
        assert_eq!(fp.size, 0);
        assert_eq!(fp.hash.len(), 128);
    }
}
