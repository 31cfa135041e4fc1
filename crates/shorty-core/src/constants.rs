//! Application-wide constants.

/// Bucket holding uploaded images and their thumbnails.
pub const IMAGES_BUCKET: &str = "images";

/// Bucket holding uploaded generic files.
pub const FILES_BUCKET: &str = "files";

/// Length of generated asset and resource identifiers.
pub const DEFAULT_ID_LENGTH: usize = 32;

/// Characters used for generated identifiers.
pub const ID_CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
