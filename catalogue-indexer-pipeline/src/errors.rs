//! Error types for the catalogue indexer pipeline.

use std::time::Duration;

use catalogue_indexer_repository::SearchError;
use thiserror::Error;

/// Errors that can occur while exporting, dispatching or migrating.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Error from the search engine, including cursor and lock failures.
    #[error("Search error: {0}")]
    SearchError(#[from] SearchError),

    /// A batch could not be enqueued.
    #[error("Dispatch error: {0}")]
    DispatchError(String),

    /// A background worker failed to process a batch.
    #[error("Worker error: {0}")]
    WorkerError(String),

    /// The queue still had pending or running work when the deadline passed.
    #[error("Queue '{queue}' did not drain within {waited:?}")]
    DrainTimeout { queue: String, waited: Duration },

    /// A migration step failed. The new index is left as it is.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Invalid pipeline configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl PipelineError {
    /// Create a dispatch error.
    pub fn dispatch(msg: impl Into<String>) -> Self {
        Self::DispatchError(msg.into())
    }

    /// Create a worker error.
    pub fn worker(msg: impl Into<String>) -> Self {
        Self::WorkerError(msg.into())
    }

    /// Create a migration error.
    pub fn migration(msg: impl Into<String>) -> Self {
        Self::MigrationError(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Whether this failure means another migration holds the group lock.
    pub fn is_locked(&self) -> bool {
        matches!(self, Self::SearchError(SearchError::IndexLocked { .. }))
    }
}
