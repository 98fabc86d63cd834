//! Dependency initialization and wiring for the catalogue indexer.

use std::sync::Arc;
use tracing::info;

use super::Config;
use crate::IndexingError;
use catalogue_indexer_pipeline::{QueueRegistry, SearchLoader, WorkQueue};
use catalogue_indexer_repository::{OpenSearchClient, OpenSearchLock, SearchEngineClient};

/// Queue that carries re-indexing batches.
pub const BULK_QUEUE: &str = "bulk";

/// Container for all initialized dependencies.
pub struct Dependencies {
    pub config: Config,
    pub client: Arc<OpenSearchClient>,
    pub lock: Arc<OpenSearchLock>,
    /// Queue the update runs dispatch to.
    pub bulk_queue: Arc<WorkQueue>,
    /// Every queue of the process, for drain checks.
    pub queues: Arc<QueueRegistry>,
}

impl Dependencies {
    /// Connect to OpenSearch and start the background workers.
    ///
    /// # Returns
    ///
    /// * `Ok(Dependencies)` - Initialized dependencies
    /// * `Err(IndexingError)` - If initialization fails
    pub async fn new(config: Config) -> Result<Self, IndexingError> {
        info!(
            opensearch_url = %config.opensearch_url,
            index_groups = ?config.index_groups,
            workers = config.worker_count,
            "Initializing dependencies"
        );

        let client = OpenSearchClient::new(&config.opensearch_url, config.index_groups.clone())
            .await
            .map_err(|e| {
                IndexingError::config(format!("Failed to create OpenSearch client: {}", e))
            })?;

        let healthy = client
            .health_check()
            .await
            .map_err(|e| IndexingError::config(format!("OpenSearch health check failed: {}", e)))?;

        if !healthy {
            return Err(IndexingError::config("OpenSearch cluster is unhealthy"));
        }

        info!("OpenSearch connection verified");

        let client = Arc::new(client);
        let lock = Arc::new(OpenSearchLock::new(&client));

        let loader = Arc::new(SearchLoader::new(client.clone()));
        let bulk_queue = Arc::new(WorkQueue::start(BULK_QUEUE, config.worker_count, loader)?);

        let mut queues = QueueRegistry::new();
        queues.register(bulk_queue.clone());

        Ok(Self {
            config,
            client,
            lock,
            bulk_queue,
            queues: Arc::new(queues),
        })
    }

    /// Wait for queued batches to be written and stop the workers.
    pub async fn shutdown(&self) {
        self.queues.shutdown().await;
    }
}
