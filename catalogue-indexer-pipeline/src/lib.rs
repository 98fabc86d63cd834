//! # Catalogue Indexer Pipeline
//!
//! This crate moves documents out of a live index and into another one while
//! the engine keeps serving traffic.
//!
//! ## Architecture
//!
//! 1. **Scroll**: exports hits from a source index through a cursor
//! 2. **Orchestrator**: slices the export into batches and dispatches them
//! 3. **Queue**: holds dispatched batches for background workers
//! 4. **Loader**: workers write batches into the destination index
//! 5. **Migration**: builds a new index, backfills it, waits for the queue
//!    to drain and switches the group alias

pub mod errors;
pub mod loader;
pub mod migration;
pub mod orchestrator;
pub mod queue;
pub mod scroll;

#[cfg(test)]
mod test_support;

pub use errors::PipelineError;
pub use loader::{BatchProcessor, LoaderConfig, SearchLoader};
pub use migration::{MigrationConfig, MigrationController, MigrationReport};
pub use orchestrator::{
    FullResync, PopularityRefresh, UpdateStrategy, UpdateSummary, Updater, UpdaterConfig,
};
pub use queue::{BatchDispatcher, ExecutingJob, QueueMonitor, QueueRegistry, WorkQueue};
pub use scroll::ScrollEnumerator;
