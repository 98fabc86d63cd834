//! Loader module for the catalogue indexer pipeline.
//!
//! Writes dispatched batches into their destination index.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use crate::errors::PipelineError;
use catalogue_indexer_repository::{BulkIndexSummary, SearchEngineClient, SearchError};
use catalogue_indexer_shared::Batch;

/// Work performed by a queue worker for each batch it takes.
#[async_trait]
pub trait BatchProcessor: Send + Sync {
    async fn process(&self, batch: &Batch) -> Result<(), PipelineError>;
}

/// Configuration for the search loader.
#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Maximum number of retry attempts for failed bulk writes.
    pub max_retries: u32,
    /// Initial retry delay in milliseconds.
    pub initial_retry_delay_ms: u64,
    /// Maximum retry delay in milliseconds.
    pub max_retry_delay_ms: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_retry_delay_ms: 100,
            max_retry_delay_ms: 5000,
        }
    }
}

/// Batch processor that bulk-writes records with external versioning.
///
/// Writes are idempotent, so a batch that failed transiently is retried as
/// a whole. Version conflicts are not failures: they mean the destination
/// already has that version or a newer one.
pub struct SearchLoader {
    client: Arc<dyn SearchEngineClient>,
    config: LoaderConfig,
}

impl SearchLoader {
    /// Create a new search loader with the given client.
    pub fn new(client: Arc<dyn SearchEngineClient>) -> Self {
        Self::with_config(client, LoaderConfig::default())
    }

    /// Create a new search loader with custom configuration.
    pub fn with_config(client: Arc<dyn SearchEngineClient>, config: LoaderConfig) -> Self {
        Self { client, config }
    }

    /// Write one batch, retrying transient failures with exponential backoff.
    async fn bulk_index_with_retry(&self, batch: &Batch) -> Result<BulkIndexSummary, SearchError> {
        let mut delay_ms = self.config.initial_retry_delay_ms;
        let mut last_error: Option<SearchError> = None;

        for attempt in 0..=self.config.max_retries {
            let result = self
                .client
                .bulk_index_versioned(&batch.destination_index, &batch.records)
                .await
                .and_then(failures_as_error);

            match result {
                Ok(summary) => {
                    if attempt > 0 {
                        info!(
                            attempt = attempt,
                            count = batch.len(),
                            "Bulk index succeeded after retry"
                        );
                    }
                    return Ok(summary);
                }
                Err(e) => {
                    if !e.is_retryable() {
                        debug!(error = %e, "Non-retryable error encountered");
                        return Err(e);
                    }

                    if attempt < self.config.max_retries {
                        warn!(
                            attempt = attempt + 1,
                            max_retries = self.config.max_retries,
                            delay_ms = delay_ms,
                            error = %e,
                            "Bulk index failed, retrying"
                        );

                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        delay_ms = std::cmp::min(delay_ms * 2, self.config.max_retry_delay_ms);
                    }
                    last_error = Some(e);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| SearchError::bulk_index("Unknown error after retries")))
    }
}

/// Turn per-item failures into an error so they go through the retry path.
///
/// The batch is retried only when every rejected item carries a transient
/// status.
fn failures_as_error(summary: BulkIndexSummary) -> Result<BulkIndexSummary, SearchError> {
    if summary.is_success() {
        return Ok(summary);
    }

    let reasons: Vec<String> = summary
        .failed
        .iter()
        .map(|f| format!("{} ({}): {}", f.id, f.status, f.reason))
        .collect();

    Err(SearchError::item_failures(
        format!(
            "{} of {} documents failed ({})",
            summary.failed.len(),
            summary.total,
            reasons.join("; ")
        ),
        summary.only_transient_failures(),
    ))
}

#[async_trait]
impl BatchProcessor for SearchLoader {
    #[instrument(skip(self, batch), fields(index = %batch.destination_index, count = batch.len()))]
    async fn process(&self, batch: &Batch) -> Result<(), PipelineError> {
        if batch.is_empty() {
            return Ok(());
        }

        let summary = self
            .bulk_index_with_retry(batch)
            .await
            .map_err(|e| PipelineError::worker(e.to_string()))?;

        debug!(
            indexed = summary.indexed,
            version_conflicts = summary.version_conflicts,
            "Batch written"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, ScriptedClient};

    fn batch() -> Batch {
        Batch::new(vec![record("/a", 3), record("/b", 1)], "dest")
    }

    #[tokio::test]
    async fn test_process_writes_batch() {
        let client = Arc::new(ScriptedClient::new());
        let loader = SearchLoader::new(client.clone());

        loader.process(&batch()).await.unwrap();

        assert_eq!(client.written_ids("dest"), vec!["/a", "/b"]);
        assert_eq!(client.bulk_calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_batch_is_skipped() {
        let client = Arc::new(ScriptedClient::new());
        let loader = SearchLoader::new(client.clone());

        loader.process(&Batch::new(vec![], "dest")).await.unwrap();

        assert_eq!(client.bulk_calls(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_is_retried() {
        let client = Arc::new(ScriptedClient::new());
        client.fail_bulk(2, "503 Service Unavailable");
        let loader = SearchLoader::new(client.clone());

        loader.process(&batch()).await.unwrap();

        assert_eq!(client.bulk_calls(), 3);
        assert_eq!(client.written_ids("dest").len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_max_retries() {
        let client = Arc::new(ScriptedClient::new());
        client.fail_bulk(10, "429 Too Many Requests");
        let loader = SearchLoader::with_config(
            client.clone(),
            LoaderConfig {
                max_retries: 2,
                ..LoaderConfig::default()
            },
        );

        let err = loader.process(&batch()).await.unwrap_err();

        assert!(matches!(err, PipelineError::WorkerError(_)));
        assert_eq!(client.bulk_calls(), 3);
    }

    #[tokio::test]
    async fn test_permanent_failure_is_not_retried() {
        let client = Arc::new(ScriptedClient::new());
        client.fail_bulk(1, "mapper_parsing_exception");
        let loader = SearchLoader::new(client.clone());

        assert!(loader.process(&batch()).await.is_err());
        assert_eq!(client.bulk_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_items_are_retried() {
        let client = Arc::new(ScriptedClient::new());
        client.reject_items(1, 429, "es_rejected_execution_exception");
        let loader = SearchLoader::new(client.clone());

        loader.process(&batch()).await.unwrap();

        assert_eq!(client.bulk_calls(), 2);
    }

    #[tokio::test]
    async fn test_permanent_item_rejection_is_not_retried() {
        let client = Arc::new(ScriptedClient::new());
        client.reject_items(1, 400, "mapper_parsing_exception");
        let loader = SearchLoader::new(client.clone());
        let batch = Batch::new(
            vec![record("/news/503-jobs", 1), record("/connection-timeout", 1)],
            "dest",
        );

        let err = loader.process(&batch).await.unwrap_err();

        assert!(matches!(err, PipelineError::WorkerError(_)));
        assert_eq!(client.bulk_calls(), 1);
    }
}
