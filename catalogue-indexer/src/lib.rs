//! # Catalogue Indexer
//!
//! Entry point for re-indexing and migrating the catalogue's search indices.
//!
//! This crate reads configuration from the environment, wires the OpenSearch
//! backend to the in-process work queue and exposes one function per command.

pub mod commands;
pub mod config;
pub mod logging;

pub use config::{Config, Dependencies};

use catalogue_indexer_schema::SchemaError;
use thiserror::Error;

/// Errors that can occur during indexer initialization or execution.
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Pipeline error.
    #[error("Pipeline error: {0}")]
    PipelineError(#[from] catalogue_indexer_pipeline::PipelineError),

    /// Search error.
    #[error("Search error: {0}")]
    SearchError(#[from] catalogue_indexer_repository::SearchError),

    /// Schema configuration error.
    #[error("Schema error: {0}")]
    SchemaError(#[from] SchemaError),

    /// Output could not be rendered.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl IndexingError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }
}
