//! In-process work queue backed by a tokio channel and a worker pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex as AsyncMutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use super::{BatchDispatcher, ExecutingJob, QueueMonitor};
use crate::errors::PipelineError;
use crate::loader::BatchProcessor;
use catalogue_indexer_shared::Batch;

type Job = (u64, Batch);

#[derive(Debug)]
struct QueueState {
    name: String,
    pending: AtomicUsize,
    next_id: AtomicU64,
    executing: Mutex<HashMap<u64, ExecutingJob>>,
}

impl QueueState {
    fn executing(&self) -> MutexGuard<'_, HashMap<u64, ExecutingJob>> {
        // A worker never panics while holding the guard, but a poisoned map
        // is still accurate.
        self.executing.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Move a job from pending to executing.
    ///
    /// The job is listed as executing before it stops being pending, so an
    /// observer that reads the queue size first and the executing list second
    /// always sees it in at least one of the two.
    fn begin(&self, job_id: u64, batch: &Batch) {
        self.executing().insert(
            job_id,
            ExecutingJob {
                queue: self.name.clone(),
                job_id,
                destination_index: batch.destination_index.clone(),
            },
        );
        self.pending.fetch_sub(1, Ordering::SeqCst);
    }

    fn finish(&self, job_id: u64) {
        self.executing().remove(&job_id);
    }
}

/// A named queue with a fixed pool of workers.
///
/// Batches are processed in no particular order once more than one worker
/// is running. A batch whose processing fails is logged and dropped; the
/// worker moves on to the next one.
pub struct WorkQueue {
    state: Arc<QueueState>,
    sender: Mutex<Option<mpsc::UnboundedSender<Job>>>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkQueue {
    /// Create the queue and spawn `workers` workers feeding `processor`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(
        name: impl Into<String>,
        workers: usize,
        processor: Arc<dyn BatchProcessor>,
    ) -> Result<Self, PipelineError> {
        if workers == 0 {
            return Err(PipelineError::config("a work queue needs at least one worker"));
        }

        let state = Arc::new(QueueState {
            name: name.into(),
            pending: AtomicUsize::new(0),
            next_id: AtomicU64::new(1),
            executing: Mutex::new(HashMap::new()),
        });

        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        let rx = Arc::new(AsyncMutex::new(rx));

        let handles = (0..workers)
            .map(|worker| {
                let state = state.clone();
                let rx = rx.clone();
                let processor = processor.clone();
                tokio::spawn(async move { run_worker(worker, state, rx, processor).await })
            })
            .collect();

        info!(queue = %state.name, workers, "Started work queue");

        Ok(Self {
            state,
            sender: Mutex::new(Some(tx)),
            workers: Mutex::new(handles),
        })
    }

    pub fn name(&self) -> &str {
        &self.state.name
    }

    /// Stop accepting batches and wait for the workers to finish what is
    /// already queued.
    pub async fn shutdown(&self) {
        self.sender.lock().unwrap_or_else(|e| e.into_inner()).take();

        let handles: Vec<JoinHandle<()>> = self
            .workers
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .drain(..)
            .collect();

        for handle in handles {
            if let Err(e) = handle.await {
                warn!(queue = %self.state.name, error = %e, "Worker task ended abnormally");
            }
        }

        info!(queue = %self.state.name, "Work queue shut down");
    }

    fn size(&self) -> usize {
        self.state.pending.load(Ordering::SeqCst)
    }

    fn executing_jobs(&self) -> Vec<ExecutingJob> {
        self.state.executing().values().cloned().collect()
    }
}

async fn run_worker(
    worker: usize,
    state: Arc<QueueState>,
    rx: Arc<AsyncMutex<mpsc::UnboundedReceiver<Job>>>,
    processor: Arc<dyn BatchProcessor>,
) {
    loop {
        let next = { rx.lock().await.recv().await };
        let Some((job_id, batch)) = next else {
            break;
        };

        state.begin(job_id, &batch);
        debug!(
            queue = %state.name,
            worker,
            job_id,
            records = batch.len(),
            "Processing batch"
        );

        if let Err(e) = processor.process(&batch).await {
            error!(
                queue = %state.name,
                job_id,
                index = %batch.destination_index,
                records = batch.len(),
                error = %e,
                "Batch failed"
            );
        }

        state.finish(job_id);
    }

    debug!(queue = %state.name, worker, "Worker stopped");
}

#[async_trait]
impl BatchDispatcher for WorkQueue {
    fn queue_name(&self) -> &str {
        &self.state.name
    }

    #[instrument(skip(self, batch), fields(queue = %self.state.name, records = batch.len()))]
    async fn dispatch(&self, batch: Batch) -> Result<(), PipelineError> {
        let sender = self.sender.lock().unwrap_or_else(|e| e.into_inner());
        let Some(sender) = sender.as_ref() else {
            return Err(PipelineError::dispatch(format!(
                "queue '{}' is shut down",
                self.state.name
            )));
        };

        let job_id = self.state.next_id.fetch_add(1, Ordering::SeqCst);
        self.state.pending.fetch_add(1, Ordering::SeqCst);

        if sender.send((job_id, batch)).is_err() {
            self.state.pending.fetch_sub(1, Ordering::SeqCst);
            return Err(PipelineError::dispatch(format!(
                "queue '{}' has no running workers",
                self.state.name
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl QueueMonitor for WorkQueue {
    async fn queue_size(&self, queue: &str) -> Result<usize, PipelineError> {
        if queue != self.state.name {
            return Err(PipelineError::config(format!("Unknown queue '{queue}'")));
        }
        Ok(self.size())
    }

    async fn executing(&self) -> Result<Vec<ExecutingJob>, PipelineError> {
        Ok(self.executing_jobs())
    }
}

/// All work queues of a process, observable as one.
#[derive(Default)]
pub struct QueueRegistry {
    queues: HashMap<String, Arc<WorkQueue>>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a queue, replacing any queue registered under the same name.
    pub fn register(&mut self, queue: Arc<WorkQueue>) {
        self.queues.insert(queue.name().to_string(), queue);
    }

    pub async fn shutdown(&self) {
        for queue in self.queues.values() {
            queue.shutdown().await;
        }
    }
}

#[async_trait]
impl QueueMonitor for QueueRegistry {
    async fn queue_size(&self, queue: &str) -> Result<usize, PipelineError> {
        self.queues
            .get(queue)
            .map(|q| q.size())
            .ok_or_else(|| PipelineError::config(format!("Unknown queue '{queue}'")))
    }

    async fn executing(&self) -> Result<Vec<ExecutingJob>, PipelineError> {
        Ok(self
            .queues
            .values()
            .flat_map(|q| q.executing_jobs())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{record, CountingProcessor, GatedProcessor};
    use std::time::Duration;

    fn batch(n: usize, index: &str) -> Batch {
        Batch::new((0..n).map(|i| record(&format!("/{i}"), 1)).collect(), index)
    }

    async fn wait_until<F: Fn() -> bool>(condition: F) {
        for _ in 0..200 {
            if condition() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("condition not reached");
    }

    #[tokio::test]
    async fn test_processes_every_batch() {
        let processor = Arc::new(CountingProcessor::new());
        let queue = WorkQueue::start("bulk", 4, processor.clone()).unwrap();

        for _ in 0..10 {
            queue.dispatch(batch(3, "dest")).await.unwrap();
        }
        queue.shutdown().await;

        assert_eq!(processor.batches(), 10);
        assert_eq!(processor.records(), 30);
        assert_eq!(queue.size(), 0);
        assert!(queue.executing_jobs().is_empty());
    }

    #[tokio::test]
    async fn test_tracks_pending_and_executing() {
        let processor = Arc::new(GatedProcessor::new());
        let queue = WorkQueue::start("bulk", 1, processor.clone()).unwrap();

        for _ in 0..3 {
            queue.dispatch(batch(1, "dest")).await.unwrap();
        }

        wait_until(|| queue.executing_jobs().len() == 1).await;
        assert_eq!(queue.queue_size("bulk").await.unwrap(), 2);

        let running = queue.executing().await.unwrap();
        assert_eq!(running[0].queue, "bulk");
        assert_eq!(running[0].destination_index, "dest");

        processor.open(3);
        queue.shutdown().await;

        assert_eq!(processor.processed(), 3);
        assert_eq!(queue.queue_size("bulk").await.unwrap(), 0);
        assert!(queue.executing().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_batch_does_not_stop_worker() {
        let processor = Arc::new(CountingProcessor::failing_on(1));
        let queue = WorkQueue::start("bulk", 1, processor.clone()).unwrap();

        queue.dispatch(batch(2, "dest")).await.unwrap();
        queue.dispatch(batch(2, "dest")).await.unwrap();
        queue.shutdown().await;

        assert_eq!(processor.batches(), 2);
    }

    #[tokio::test]
    async fn test_dispatch_after_shutdown_fails() {
        let queue = WorkQueue::start("bulk", 1, Arc::new(CountingProcessor::new())).unwrap();
        queue.shutdown().await;

        let err = queue.dispatch(batch(1, "dest")).await.unwrap_err();
        assert!(matches!(err, PipelineError::DispatchError(_)));
    }

    #[tokio::test]
    async fn test_zero_workers_rejected() {
        let result = WorkQueue::start("bulk", 0, Arc::new(CountingProcessor::new()));
        assert!(matches!(result, Err(PipelineError::ConfigError(_))));
    }

    #[tokio::test]
    async fn test_registry_aggregates_queues() {
        let gate = Arc::new(GatedProcessor::new());
        let bulk = Arc::new(WorkQueue::start("bulk", 1, gate.clone()).unwrap());
        let targeted = Arc::new(WorkQueue::start("targeted", 1, gate.clone()).unwrap());

        let mut registry = QueueRegistry::new();
        registry.register(bulk.clone());
        registry.register(targeted.clone());

        bulk.dispatch(batch(1, "a")).await.unwrap();
        targeted.dispatch(batch(1, "b")).await.unwrap();
        targeted.dispatch(batch(1, "b")).await.unwrap();

        wait_until(|| bulk.executing_jobs().len() == 1 && targeted.executing_jobs().len() == 1)
            .await;

        assert_eq!(registry.queue_size("bulk").await.unwrap(), 0);
        assert_eq!(registry.queue_size("targeted").await.unwrap(), 1);
        assert_eq!(registry.executing().await.unwrap().len(), 2);
        assert!(registry.queue_size("missing").await.is_err());

        gate.open(3);
        registry.shutdown().await;
        assert_eq!(gate.processed(), 3);
    }
}
