//! Sync orchestration: the single run slot, source fan-out with
//! per-runner timeouts, progress tracking, and the retained combined
//! report.

pub mod progress;
pub mod service;

pub use progress::{CombinedReport, SourceReport, SyncProgress, SyncStatus};
pub use service::{ServiceConfig, ServiceError, SyncOptions, SyncService};
