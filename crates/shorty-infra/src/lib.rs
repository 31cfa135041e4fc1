//! Shorty Infrastructure Library
//!
//! Shared infrastructure for processes that host the asset storage:
//! - Telemetry initialization
//! - Reconciliation of assets left `pending` by interrupted saves

#[cfg(feature = "observability-basic")]
pub mod telemetry;

#[cfg(feature = "reconcile")]
pub mod reconcile;

// Re-export commonly used types
#[cfg(feature = "observability-basic")]
pub use telemetry::{init_telemetry, shutdown_telemetry, LogFormat};

#[cfg(feature = "reconcile")]
pub use reconcile::{AssetReconciler, ReconcileReport, ReconcilerConfig};
