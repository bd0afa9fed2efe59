//! Source-specific scraping: traversal over index pages, resilient
//! fetching, heuristic article extraction, and the per-source runner
//! that ties them to a store.

pub mod extract;
pub mod fetch;
pub mod runner;
pub mod sources;
pub mod sync;
pub mod text;
pub mod traversal;

pub use extract::Extractor;
pub use fetch::{FetchConfig, Fetcher};
pub use runner::{CancelFlag, RunLimits, RunnerConfig, SourceRunner};
pub use sources::{all_sources, spec_for, SourceSpec, TraversalKind};
pub use sync::SyncPolicy;

pub mod prelude {
    pub use crate::fetch::{FetchConfig, Fetcher};
    pub use crate::runner::{CancelFlag, RunLimits, RunnerConfig, SourceRunner};
    pub use crate::sources::{all_sources, spec_for, SourceSpec};
    pub use crate::sync::SyncPolicy;
}
