//! OpenSearch implementation of the search engine interfaces.
//!
//! This module provides concrete implementations of `SearchEngineClient`,
//! `IndexGroupProvider` and `IndexLock` using OpenSearch as the backend.

mod client;
mod lock;
pub mod queries;

pub use client::OpenSearchClient;
pub use lock::OpenSearchLock;
