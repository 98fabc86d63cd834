//! Background work queues.
//!
//! Export runs in the foreground and hands batches to named queues; workers
//! drain the queues concurrently. The two sides meet through
//! [`BatchDispatcher`] (enqueue) and [`QueueMonitor`] (observe), so the
//! export code never depends on a particular queue backend.

mod work_queue;

use async_trait::async_trait;

use crate::errors::PipelineError;
use catalogue_indexer_shared::Batch;

pub use work_queue::{QueueRegistry, WorkQueue};

/// Enqueues batches onto one named queue.
///
/// Dispatch only enqueues. It returns once the batch is accepted, not once
/// it has been written.
#[async_trait]
pub trait BatchDispatcher: Send + Sync {
    /// Name of the queue batches land on.
    fn queue_name(&self) -> &str;

    async fn dispatch(&self, batch: Batch) -> Result<(), PipelineError>;
}

/// A batch a worker has taken off a queue and not yet finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutingJob {
    pub queue: String,
    pub job_id: u64,
    pub destination_index: String,
}

/// Read-only view of queue depth and running jobs.
#[async_trait]
pub trait QueueMonitor: Send + Sync {
    /// Number of batches waiting on `queue`. Running jobs are not counted.
    async fn queue_size(&self, queue: &str) -> Result<usize, PipelineError>;

    /// Jobs currently being processed, across all queues.
    async fn executing(&self) -> Result<Vec<ExecutingJob>, PipelineError>;
}
