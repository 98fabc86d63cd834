//! Zero-downtime index migration.
//!
//! A migration builds a fresh physical index for an index group, fills it
//! from the live data, waits for the background writes to finish and then
//! repoints the group alias at it. The whole protocol runs under the
//! group's lock.
//!
//! Nothing is rolled back on failure. A migration that fails after creating
//! the new index leaves it half-built and unaliased; readers keep using the
//! old index until an operator cleans up. Writers that keep dispatching
//! work against the old index while a migration runs are not excluded by
//! the lock.

use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument};

use crate::errors::PipelineError;
use crate::orchestrator::{FullResync, UpdateStrategy, UpdateSummary, Updater, UpdaterConfig};
use crate::queue::{BatchDispatcher, QueueMonitor};
use catalogue_indexer_repository::{IndexGroupProvider, IndexLock, SearchEngineClient};

/// Index assumed to hold every document, used by the completeness pass.
pub const DEFAULT_REFERENCE_INDEX: &str = "mainstream";

#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Source of the full resync pass.
    pub reference_index: String,
    /// Delay between two drain checks.
    pub poll_interval: Duration,
    /// Give up waiting for the queues after this long. `None` waits
    /// indefinitely.
    pub drain_timeout: Option<Duration>,
    /// Settings for both update passes.
    pub updater: UpdaterConfig,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            reference_index: DEFAULT_REFERENCE_INDEX.to_string(),
            poll_interval: Duration::from_secs(1),
            drain_timeout: None,
            updater: UpdaterConfig::default(),
        }
    }
}

/// What a successful migration did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub group: String,
    /// Index the alias pointed at before the switch.
    pub old_index: String,
    /// Index the alias points at now.
    pub new_index: String,
    pub targeted: UpdateSummary,
    pub resync: UpdateSummary,
    /// Drain checks made before the queues were found empty.
    pub drain_polls: usize,
}

/// Runs the create, backfill, drain and switch protocol for index groups.
pub struct MigrationController {
    client: Arc<dyn SearchEngineClient>,
    groups: Arc<dyn IndexGroupProvider>,
    lock: Arc<dyn IndexLock>,
    monitor: Arc<dyn QueueMonitor>,
    targeted_dispatcher: Arc<dyn BatchDispatcher>,
    resync_dispatcher: Arc<dyn BatchDispatcher>,
    targeted: Arc<dyn UpdateStrategy>,
    config: MigrationConfig,
}

impl MigrationController {
    /// Both passes dispatch to `dispatcher` unless
    /// [`with_resync_dispatcher`](Self::with_resync_dispatcher) says
    /// otherwise.
    pub fn new(
        client: Arc<dyn SearchEngineClient>,
        groups: Arc<dyn IndexGroupProvider>,
        lock: Arc<dyn IndexLock>,
        monitor: Arc<dyn QueueMonitor>,
        dispatcher: Arc<dyn BatchDispatcher>,
        targeted: Arc<dyn UpdateStrategy>,
    ) -> Self {
        Self {
            client,
            groups,
            lock,
            monitor,
            targeted_dispatcher: dispatcher.clone(),
            resync_dispatcher: dispatcher,
            targeted,
            config: MigrationConfig::default(),
        }
    }

    pub fn with_resync_dispatcher(mut self, dispatcher: Arc<dyn BatchDispatcher>) -> Self {
        self.resync_dispatcher = dispatcher;
        self
    }

    pub fn with_config(mut self, config: MigrationConfig) -> Self {
        self.config = config;
        self
    }

    /// Migrate `group` to a new index created with `configuration`.
    ///
    /// Fails straight away with `IndexLocked` if another migration of the
    /// group is running. The lock is released whether or not the protocol
    /// succeeds.
    #[instrument(skip(self, configuration))]
    pub async fn migrate(
        &self,
        group: &str,
        configuration: &Value,
    ) -> Result<MigrationReport, PipelineError> {
        let token = self.lock.try_acquire(group).await?;
        info!(group = %group, "Acquired index group lock");

        let result = self.run_locked(group, configuration).await;

        if let Err(e) = &result {
            error!(
                group = %group,
                error = %e,
                "Migration failed; any new index is left in place for manual cleanup"
            );
        }

        match self.lock.release(token).await {
            Ok(()) => info!(group = %group, "Released index group lock"),
            Err(e) => error!(group = %group, error = %e, "Failed to release index group lock"),
        }

        result
    }

    async fn run_locked(
        &self,
        group: &str,
        configuration: &Value,
    ) -> Result<MigrationReport, PipelineError> {
        let old_index = self.groups.current_index(group).await?;

        let new_index = self.groups.create_index(group, configuration).await?;
        if new_index == old_index {
            return Err(PipelineError::migration(format!(
                "new index for '{group}' reuses the current index name '{old_index}'"
            )));
        }
        info!(group = %group, old_index = %old_index, new_index = %new_index, "Created new index");

        let targeted = Updater::new(
            self.client.clone(),
            self.targeted_dispatcher.clone(),
            self.targeted.clone(),
            old_index.clone(),
            new_index.clone(),
        )
        .with_config(self.config.updater.clone())
        .run()
        .await?;
        info!(records = targeted.records, "Targeted pass dispatched");

        let resync = Updater::new(
            self.client.clone(),
            self.resync_dispatcher.clone(),
            Arc::new(FullResync),
            self.config.reference_index.clone(),
            new_index.clone(),
        )
        .with_config(self.config.updater.clone())
        .run()
        .await?;
        info!(
            records = resync.records,
            reference_index = %self.config.reference_index,
            "Resync pass dispatched"
        );

        let drain_polls = self.wait_for_drain().await?;
        info!(polls = drain_polls, "Queues drained");

        self.groups
            .switch_alias(group, &old_index, &new_index)
            .await?;
        info!(group = %group, from = %old_index, to = %new_index, "Switched alias");

        Ok(MigrationReport {
            group: group.to_string(),
            old_index,
            new_index,
            targeted,
            resync,
            drain_polls,
        })
    }

    fn drain_queues(&self) -> BTreeSet<String> {
        [&self.targeted_dispatcher, &self.resync_dispatcher]
            .iter()
            .map(|d| d.queue_name().to_string())
            .collect()
    }

    /// Poll until no queue used by the migration has pending or running
    /// work.
    ///
    /// The queue backend has no completion signal, so completion is inferred
    /// from its observable state.
    async fn wait_for_drain(&self) -> Result<usize, PipelineError> {
        let queues = self.drain_queues();
        let started = Instant::now();
        let mut polls = 0;

        loop {
            polls += 1;
            let busy = self.busy_queue(&queues).await?;

            let Some(queue) = busy else {
                return Ok(polls);
            };

            let waited = started.elapsed();
            if let Some(timeout) = self.config.drain_timeout {
                if waited >= timeout {
                    return Err(PipelineError::DrainTimeout { queue, waited });
                }
            }

            debug!(poll = polls, queue = %queue, "Waiting for queue to drain");
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// First queue in `queues` that still has work, if any.
    async fn busy_queue(&self, queues: &BTreeSet<String>) -> Result<Option<String>, PipelineError> {
        // Sizes are read before the executing list: a worker lists a job as
        // executing before it stops counting as pending, so this order never
        // misses a job that moves between the two.
        let mut pending = None;
        for queue in queues {
            if self.monitor.queue_size(queue).await? > 0 && pending.is_none() {
                pending = Some(queue.clone());
            }
        }

        let executing = self.monitor.executing().await?;
        let running = executing
            .into_iter()
            .find(|job| queues.contains(&job.queue))
            .map(|job| job.queue);

        Ok(pending.or(running))
    }
}
