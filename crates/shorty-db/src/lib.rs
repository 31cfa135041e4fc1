//! Shorty metadata persistence
//!
//! The [`MetadataRepository`] trait is the durable source of truth for asset
//! metadata. [`PgMetadataRepository`] implements it on PostgreSQL.

pub mod db;
pub mod setup;

pub use db::assets::{MetadataRepository, PgMetadataRepository, StaleCursor};
pub use setup::{run_migrations, setup_database};
