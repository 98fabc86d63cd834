//! # Catalogue Indexer Repository
//!
//! This crate provides traits and implementations for interacting with the
//! search engine: cursor-based export, versioned bulk writes, index group
//! management and the advisory lock guarding migrations. It includes a
//! concrete implementation for OpenSearch and an in-process lock registry.

pub mod errors;
pub mod interfaces;
pub mod locks;
pub mod opensearch;
pub mod types;

pub use errors::SearchError;
pub use interfaces::{IndexGroupProvider, IndexLock, LockToken, SearchEngineClient};
pub use locks::LocalLockRegistry;
pub use opensearch::{OpenSearchClient, OpenSearchLock};
pub use types::{BulkIndexSummary, BulkItemFailure};
