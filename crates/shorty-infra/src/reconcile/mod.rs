//! Reconciliation of stale pending assets
//!
//! A save that stops between reserving metadata and marking it `created`
//! leaves `pending` rows behind. Once a row is older than the configured age
//! the reconciler looks at its blob:
//! - present: the save got as far as writing content, so the row is marked
//!   `created`;
//! - absent: the resource id is handed to the deletion queue and the row is
//!   left for the collector.
//!
//! Rows never go from `pending` straight to `deleted`.

mod service;

pub use service::{AssetReconciler, ReconcileReport, ReconcilerConfig};
