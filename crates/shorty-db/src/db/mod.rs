//! Database repositories for the data access layer
//
// Asset metadata repository
pub mod assets;
