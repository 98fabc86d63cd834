//! Search engine client trait definition.
//!
//! This module defines the abstract interface for the document-level
//! operations used by re-indexing: cursor-based export and versioned bulk
//! writes.

use async_trait::async_trait;

use crate::errors::SearchError;
use crate::types::BulkIndexSummary;
use catalogue_indexer_shared::{ExportedRecord, ScrollPage, ScrollRequest};

/// Abstract interface for search engine operations.
///
/// Implementations can be swapped for different backends (OpenSearch, mock,
/// etc.) enabling easy testing.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to allow use across async tasks.
#[async_trait]
pub trait SearchEngineClient: Send + Sync {
    /// Open a scroll cursor over one or more indices.
    ///
    /// # Arguments
    ///
    /// * `request` - Index names, query body, per-shard page size and cursor TTL
    ///
    /// # Returns
    ///
    /// * `Ok(ScrollPage)` - The cursor handle, the declared total hit count and
    ///   any hits carried by the opening response
    /// * `Err(SearchError)` - If the request fails
    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError>;

    /// Fetch the next page of an open scroll cursor.
    ///
    /// The returned page's `scroll_id` is `None` if the engine omitted it;
    /// callers treat that as an expired cursor.
    ///
    /// # Arguments
    ///
    /// * `scroll_id` - Handle returned by the previous page
    /// * `ttl` - How long the engine should keep the cursor alive
    async fn continue_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage, SearchError>;

    /// Write records into `index` using external versioning.
    ///
    /// Records carrying a version are written with `version_type=external`, so
    /// an older copy never replaces a newer one.
    ///
    /// # Returns
    ///
    /// * `Ok(BulkIndexSummary)` - Per-request counts, including item failures
    /// * `Err(SearchError)` - If the bulk request fails entirely
    async fn bulk_index_versioned(
        &self,
        index: &str,
        records: &[ExportedRecord],
    ) -> Result<BulkIndexSummary, SearchError>;

    /// Check if the search engine is healthy and reachable.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - If the search engine is healthy
    /// * `Ok(false)` - If the search engine is unhealthy
    /// * `Err(SearchError)` - If the health check fails to execute
    async fn health_check(&self) -> Result<bool, SearchError>;
}
