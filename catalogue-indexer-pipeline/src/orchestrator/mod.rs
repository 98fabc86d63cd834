//! Orchestrator module for the catalogue indexer pipeline.
//!
//! Exports documents from a source index and hands them to a background
//! queue in fixed-size batches addressed to a destination index.

mod strategy;

use std::pin::pin;
use std::sync::Arc;

use futures::stream::{TryChunksError, TryStreamExt};
use tracing::{debug, info, instrument};

use crate::errors::PipelineError;
use crate::queue::BatchDispatcher;
use crate::scroll::ScrollEnumerator;
use catalogue_indexer_repository::SearchEngineClient;
use catalogue_indexer_shared::scroll::DEFAULT_SCROLL_TTL;
use catalogue_indexer_shared::{Batch, ExportedRecord, ScrollRequest};

pub use strategy::{FullResync, PopularityRefresh, UpdateStrategy, FORMAT_FIELD};

/// Configuration for an update run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdaterConfig {
    /// Hits requested per shard for each scroll page.
    pub scroll_page_size: usize,
    /// Records per dispatched batch.
    pub batch_size: usize,
    /// How long the engine keeps the cursor alive between pages.
    pub scroll_ttl: String,
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            scroll_page_size: 500,
            batch_size: 25,
            scroll_ttl: DEFAULT_SCROLL_TTL.to_string(),
        }
    }
}

/// Counts from one update run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Records dispatched.
    pub records: usize,
    /// Batches dispatched.
    pub batches: usize,
    /// Hit count the engine declared when the cursor opened.
    pub declared_total: u64,
}

/// Extract-and-dispatch stage.
///
/// A run returns once every batch has been enqueued, not once the batches
/// have been written. It never retries: a failed page or a failed dispatch
/// aborts the run, because carrying on would leave the destination short of
/// documents with nothing to report it.
pub struct Updater {
    client: Arc<dyn SearchEngineClient>,
    dispatcher: Arc<dyn BatchDispatcher>,
    strategy: Arc<dyn UpdateStrategy>,
    source_index: String,
    destination_index: String,
    config: UpdaterConfig,
}

impl Updater {
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        dispatcher: Arc<dyn BatchDispatcher>,
        strategy: Arc<dyn UpdateStrategy>,
        source_index: impl Into<String>,
        destination_index: impl Into<String>,
    ) -> Self {
        Self {
            client,
            dispatcher,
            strategy,
            source_index: source_index.into(),
            destination_index: destination_index.into(),
            config: UpdaterConfig::default(),
        }
    }

    /// Copy every document from `source_index` into `destination_index`.
    pub fn full_resync(
        client: Arc<dyn SearchEngineClient>,
        dispatcher: Arc<dyn BatchDispatcher>,
        source_index: impl Into<String>,
        destination_index: impl Into<String>,
    ) -> Self {
        Self::new(
            client,
            dispatcher,
            Arc::new(FullResync),
            source_index,
            destination_index,
        )
    }

    /// Refresh popularity in place: the index is both source and
    /// destination.
    pub fn popularity(
        client: Arc<dyn SearchEngineClient>,
        dispatcher: Arc<dyn BatchDispatcher>,
        index: impl Into<String>,
        strategy: PopularityRefresh,
    ) -> Self {
        let index = index.into();
        Self::new(client, dispatcher, Arc::new(strategy), index.clone(), index)
    }

    pub fn with_config(mut self, config: UpdaterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn source_index(&self) -> &str {
        &self.source_index
    }

    pub fn destination_index(&self) -> &str {
        &self.destination_index
    }

    /// Export, batch and dispatch.
    #[instrument(
        skip(self),
        fields(
            strategy = self.strategy.name(),
            source = %self.source_index,
            destination = %self.destination_index,
            queue = self.dispatcher.queue_name()
        )
    )]
    pub async fn run(&self) -> Result<UpdateSummary, PipelineError> {
        if self.config.batch_size == 0 {
            return Err(PipelineError::config("batch size must be at least 1"));
        }

        let request = ScrollRequest::new(
            vec![self.source_index.clone()],
            self.strategy.search_body(),
            self.config.scroll_page_size,
        )
        .with_ttl(self.config.scroll_ttl.clone());

        let enumerator =
            ScrollEnumerator::open(self.client.clone(), request, ExportedRecord::from).await?;

        let mut summary = UpdateSummary {
            declared_total: enumerator.total(),
            ..UpdateSummary::default()
        };
        info!(total = summary.declared_total, "Starting update");

        let mut batches = pin!(enumerator.into_stream().try_chunks(self.config.batch_size));

        while let Some(records) = batches
            .try_next()
            .await
            .map_err(|TryChunksError(_, e)| e)?
        {
            let count = records.len();
            self.dispatcher
                .dispatch(Batch::new(records, self.destination_index.clone()))
                .await?;

            summary.records += count;
            summary.batches += 1;
            debug!(batch = summary.batches, count, "Dispatched batch");
        }

        info!(
            records = summary.records,
            batches = summary.batches,
            "Update dispatched"
        );
        Ok(summary)
    }
}
