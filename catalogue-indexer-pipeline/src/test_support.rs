//! Hand-written doubles for the seam traits, shared by the unit tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;

use crate::errors::PipelineError;
use crate::loader::BatchProcessor;
use crate::queue::{BatchDispatcher, ExecutingJob, QueueMonitor};
use catalogue_indexer_repository::{
    BulkIndexSummary, BulkItemFailure, IndexGroupProvider, IndexLock, LocalLockRegistry, LockToken,
    SearchEngineClient, SearchError,
};
use catalogue_indexer_shared::{
    Batch, DocumentIdentifier, ExportedRecord, RawHit, ScrollPage, ScrollRequest,
};

pub fn hit(id: &str, version: i64) -> RawHit {
    RawHit {
        id: id.to_string(),
        doc_type: Some("edition".to_string()),
        version: Some(version),
        source: json!({ "title": format!("Title of {id}"), "format": "answer" }),
    }
}

pub fn record(id: &str, version: i64) -> ExportedRecord {
    ExportedRecord::new(
        DocumentIdentifier {
            id: id.to_string(),
            doc_type: Some("edition".to_string()),
            version: Some(version),
        },
        json!({ "title": id }),
    )
}

/// Ordered record of calls across several doubles.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<String>>>);

impl EventLog {
    pub fn push(&self, event: &str) {
        self.0.lock().unwrap().push(event.to_string());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

fn log_to(log: &Option<EventLog>, event: &str) {
    if let Some(log) = log {
        log.push(event);
    }
}

enum Source {
    Scripted(ScrollPage, Vec<ScrollPage>),
    Documents(Vec<RawHit>),
}

enum Cursor {
    Scripted(VecDeque<ScrollPage>),
    Generated {
        hits: VecDeque<RawHit>,
        page_size: usize,
        total: u64,
    },
}

#[derive(Default)]
struct ClientState {
    sources: HashMap<String, Source>,
    cursors: HashMap<String, Cursor>,
    next_cursor: usize,
    opened: Vec<ScrollRequest>,
    continuations: Vec<(String, String)>,
    writes: Vec<(String, Vec<ExportedRecord>)>,
    bulk_calls: usize,
    bulk_errors: VecDeque<String>,
    item_rejections: VecDeque<(u16, String)>,
}

/// Search client serving canned scroll pages and recording bulk writes.
#[derive(Default)]
pub struct ScriptedClient {
    state: Mutex<ClientState>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve exactly these pages for `index`. A page without a scroll id
    /// ends the script.
    pub fn with_pages(self, index: &str, opening: ScrollPage, pages: Vec<ScrollPage>) -> Self {
        self.state
            .lock()
            .unwrap()
            .sources
            .insert(index.to_string(), Source::Scripted(opening, pages));
        self
    }

    /// Serve `count` generated documents for `index`, paged by the request's
    /// page size, with hits only on continuation pages.
    pub fn with_documents(self, index: &str, count: usize) -> Self {
        let hits = (0..count).map(|i| hit(&format!("/{index}/{i}"), 1)).collect();
        self.state
            .lock()
            .unwrap()
            .sources
            .insert(index.to_string(), Source::Documents(hits));
        self
    }

    /// Fail the next `times` bulk requests outright with `message`.
    pub fn fail_bulk(&self, times: usize, message: &str) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.bulk_errors.push_back(message.to_string());
        }
    }

    /// Reject every item of the next `times` bulk requests with `status`.
    pub fn reject_items(&self, times: usize, status: u16, reason: &str) {
        let mut state = self.state.lock().unwrap();
        for _ in 0..times {
            state.item_rejections.push_back((status, reason.to_string()));
        }
    }

    pub fn opened(&self) -> Vec<ScrollRequest> {
        self.state.lock().unwrap().opened.clone()
    }

    pub fn continuations(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.continuations.iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn continuation_ttls(&self) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state.continuations.iter().map(|(_, ttl)| ttl.clone()).collect()
    }

    pub fn bulk_calls(&self) -> usize {
        self.state.lock().unwrap().bulk_calls
    }

    pub fn written_ids(&self, index: &str) -> Vec<String> {
        let state = self.state.lock().unwrap();
        state
            .writes
            .iter()
            .filter(|(i, _)| i == index)
            .flat_map(|(_, records)| records.iter().map(|r| r.identifier.id.clone()))
            .collect()
    }
}

#[async_trait]
impl SearchEngineClient for ScriptedClient {
    async fn open_scroll(&self, request: &ScrollRequest) -> Result<ScrollPage, SearchError> {
        let mut state = self.state.lock().unwrap();
        state.opened.push(request.clone());

        let key = request.index_names.join(",");
        let (opening, cursor) = match state.sources.get(&key) {
            Some(Source::Scripted(opening, pages)) => (
                opening.clone(),
                Cursor::Scripted(pages.iter().cloned().collect()),
            ),
            Some(Source::Documents(hits)) => {
                let total = hits.len() as u64;
                let id = format!("{key}#{}", state.next_cursor);
                (
                    ScrollPage::new(Some(id), total, vec![]),
                    Cursor::Generated {
                        hits: hits.iter().cloned().collect(),
                        page_size: request.page_size,
                        total,
                    },
                )
            }
            None => return Err(SearchError::no_such_index(key)),
        };

        state.next_cursor += 1;
        if let Some(id) = &opening.scroll_id {
            state.cursors.insert(id.clone(), cursor);
        }
        Ok(opening)
    }

    async fn continue_scroll(&self, scroll_id: &str, ttl: &str) -> Result<ScrollPage, SearchError> {
        let mut state = self.state.lock().unwrap();
        state
            .continuations
            .push((scroll_id.to_string(), ttl.to_string()));

        match state.cursors.remove(scroll_id) {
            Some(Cursor::Scripted(mut pages)) => {
                let page = pages
                    .pop_front()
                    .ok_or_else(|| SearchError::query("script exhausted"))?;
                if let Some(next) = &page.scroll_id {
                    state.cursors.insert(next.clone(), Cursor::Scripted(pages));
                }
                Ok(page)
            }
            Some(Cursor::Generated {
                mut hits,
                page_size,
                total,
            }) => {
                let take = page_size.min(hits.len());
                let page: Vec<RawHit> = hits.drain(..take).collect();
                state.cursors.insert(
                    scroll_id.to_string(),
                    Cursor::Generated {
                        hits,
                        page_size,
                        total,
                    },
                );
                Ok(ScrollPage::new(Some(scroll_id.to_string()), total, page))
            }
            None => Err(SearchError::cursor_missing(format!("unknown cursor {scroll_id}"))),
        }
    }

    async fn bulk_index_versioned(
        &self,
        index: &str,
        records: &[ExportedRecord],
    ) -> Result<BulkIndexSummary, SearchError> {
        let mut state = self.state.lock().unwrap();
        state.bulk_calls += 1;

        if let Some(message) = state.bulk_errors.pop_front() {
            return Err(SearchError::bulk_index(message));
        }

        if let Some((status, reason)) = state.item_rejections.pop_front() {
            return Ok(BulkIndexSummary {
                total: records.len(),
                indexed: 0,
                version_conflicts: 0,
                failed: records
                    .iter()
                    .map(|r| BulkItemFailure::new(r.identifier.id.clone(), status, reason.clone()))
                    .collect(),
            });
        }

        state.writes.push((index.to_string(), records.to_vec()));
        Ok(BulkIndexSummary {
            total: records.len(),
            indexed: records.len(),
            ..BulkIndexSummary::default()
        })
    }

    async fn health_check(&self) -> Result<bool, SearchError> {
        Ok(true)
    }
}

/// Dispatcher that keeps every batch it is given.
pub struct RecordingDispatcher {
    name: String,
    batches: Mutex<Vec<Batch>>,
    calls: AtomicUsize,
    fail_on: Option<usize>,
    log: Option<EventLog>,
}

impl RecordingDispatcher {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            batches: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            fail_on: None,
            log: None,
        }
    }

    /// Reject the `call`-th dispatch, counting from 1.
    pub fn failing_on(mut self, call: usize) -> Self {
        self.fail_on = Some(call);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn batches(&self) -> Vec<Batch> {
        self.batches.lock().unwrap().clone()
    }

    pub fn batch_sizes(&self) -> Vec<usize> {
        self.batches.lock().unwrap().iter().map(Batch::len).collect()
    }
}

#[async_trait]
impl BatchDispatcher for RecordingDispatcher {
    fn queue_name(&self) -> &str {
        &self.name
    }

    async fn dispatch(&self, batch: Batch) -> Result<(), PipelineError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(PipelineError::dispatch("queue unavailable"));
        }
        log_to(&self.log, "dispatch");
        self.batches.lock().unwrap().push(batch);
        Ok(())
    }
}

/// Processor that counts what it sees.
#[derive(Default)]
pub struct CountingProcessor {
    batches: AtomicUsize,
    records: AtomicUsize,
    fail_on: Option<usize>,
}

impl CountingProcessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on: Some(call),
            ..Self::default()
        }
    }

    pub fn batches(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    pub fn records(&self) -> usize {
        self.records.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchProcessor for CountingProcessor {
    async fn process(&self, batch: &Batch) -> Result<(), PipelineError> {
        let call = self.batches.fetch_add(1, Ordering::SeqCst) + 1;
        self.records.fetch_add(batch.len(), Ordering::SeqCst);
        if self.fail_on == Some(call) {
            return Err(PipelineError::worker("bulk write rejected"));
        }
        Ok(())
    }
}

/// Processor that blocks each batch until the test lets it through.
pub struct GatedProcessor {
    gate: Semaphore,
    processed: AtomicUsize,
}

impl GatedProcessor {
    pub fn new() -> Self {
        Self {
            gate: Semaphore::new(0),
            processed: AtomicUsize::new(0),
        }
    }

    pub fn open(&self, batches: usize) {
        self.gate.add_permits(batches);
    }

    pub fn processed(&self) -> usize {
        self.processed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BatchProcessor for GatedProcessor {
    async fn process(&self, _batch: &Batch) -> Result<(), PipelineError> {
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|e| PipelineError::worker(e.to_string()))?;
        permit.forget();
        self.processed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// In-process lock that also records acquire and release calls.
pub struct LoggedLock {
    inner: LocalLockRegistry,
    log: EventLog,
}

impl LoggedLock {
    pub fn new(log: EventLog) -> Self {
        Self {
            inner: LocalLockRegistry::new(),
            log,
        }
    }

    pub fn is_locked(&self, group: &str) -> bool {
        self.inner.is_locked(group)
    }
}

#[async_trait]
impl IndexLock for LoggedLock {
    async fn try_acquire(&self, group: &str) -> Result<LockToken, SearchError> {
        let token = self.inner.try_acquire(group).await?;
        self.log.push("acquire");
        Ok(token)
    }

    async fn release(&self, token: LockToken) -> Result<(), SearchError> {
        self.log.push("release");
        self.inner.release(token).await
    }
}

/// Index groups held in memory.
#[derive(Default)]
pub struct MockGroups {
    current: Mutex<HashMap<String, String>>,
    configurations: Mutex<Vec<Value>>,
    created: AtomicUsize,
    fail_create: Mutex<bool>,
    log: Option<EventLog>,
}

impl MockGroups {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_group(self, group: &str, index: &str) -> Self {
        self.current
            .lock()
            .unwrap()
            .insert(group.to_string(), index.to_string());
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }

    pub fn fail_create(&self) {
        *self.fail_create.lock().unwrap() = true;
    }

    pub fn current(&self, group: &str) -> String {
        self.current.lock().unwrap()[group].clone()
    }

    pub fn configurations(&self) -> Vec<Value> {
        self.configurations.lock().unwrap().clone()
    }
}

#[async_trait]
impl IndexGroupProvider for MockGroups {
    async fn create_index(&self, group: &str, configuration: &Value) -> Result<String, SearchError> {
        if *self.fail_create.lock().unwrap() {
            return Err(SearchError::index_creation("cluster read-only"));
        }
        if !self.current.lock().unwrap().contains_key(group) {
            return Err(SearchError::no_such_index(group));
        }
        log_to(&self.log, "create");
        self.configurations.lock().unwrap().push(configuration.clone());
        let n = self.created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("{group}-new-{n}"))
    }

    async fn current_index(&self, group: &str) -> Result<String, SearchError> {
        self.current
            .lock()
            .unwrap()
            .get(group)
            .cloned()
            .ok_or_else(|| SearchError::no_such_index(group))
    }

    async fn switch_alias(&self, group: &str, from: &str, to: &str) -> Result<(), SearchError> {
        let mut current = self.current.lock().unwrap();
        match current.get(group) {
            Some(index) if index == from => {
                log_to(&self.log, "switch");
                current.insert(group.to_string(), to.to_string());
                Ok(())
            }
            _ => Err(SearchError::alias(format!("{group} does not point at {from}"))),
        }
    }
}

/// Queue monitor reporting work for a fixed number of calls.
#[derive(Default)]
pub struct ScriptedMonitor {
    pending: HashMap<String, usize>,
    executing: HashMap<String, usize>,
    size_calls: Mutex<HashMap<String, usize>>,
    executing_calls: AtomicUsize,
    log: Option<EventLog>,
}

impl ScriptedMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Report pending work on `queue` for its first `calls` size queries.
    pub fn pending(mut self, queue: &str, calls: usize) -> Self {
        self.pending.insert(queue.to_string(), calls);
        self
    }

    /// Report a running job on `queue` for the first `calls` executing
    /// queries.
    pub fn executing(mut self, queue: &str, calls: usize) -> Self {
        self.executing.insert(queue.to_string(), calls);
        self
    }

    pub fn with_log(mut self, log: EventLog) -> Self {
        self.log = Some(log);
        self
    }
}

#[async_trait]
impl QueueMonitor for ScriptedMonitor {
    async fn queue_size(&self, queue: &str) -> Result<usize, PipelineError> {
        let mut calls = self.size_calls.lock().unwrap();
        let call = calls.entry(queue.to_string()).or_insert(0);
        *call += 1;
        let busy_for = self.pending.get(queue).copied().unwrap_or(0);
        Ok(if *call <= busy_for { 3 } else { 0 })
    }

    async fn executing(&self) -> Result<Vec<ExecutingJob>, PipelineError> {
        log_to(&self.log, "poll");
        let call = self.executing_calls.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(self
            .executing
            .iter()
            .filter(|(_, busy_for)| call <= **busy_for)
            .map(|(queue, _)| ExecutingJob {
                queue: queue.clone(),
                job_id: call as u64,
                destination_index: "government-new-1".to_string(),
            })
            .collect())
    }
}
