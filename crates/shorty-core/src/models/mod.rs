//! Data models for the asset storage layer

mod asset;

pub use asset::*;
