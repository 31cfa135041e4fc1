//! Telemetry initialization
//!
//! Installs the global `tracing` subscriber. Filtering follows `RUST_LOG`,
//! falling back to debug output for the shorty crates.

mod init_basic;

pub use init_basic::{init_telemetry, shutdown_telemetry, LogFormat};
