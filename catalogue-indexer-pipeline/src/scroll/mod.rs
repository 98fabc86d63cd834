//! Cursor-based export of a live index.
//!
//! [`ScrollEnumerator`] pulls an unbounded result set page by page, holding at
//! most one page in memory. It is read-once: there is no seeking, and starting
//! over means opening a new cursor.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use tracing::{debug, instrument};

use catalogue_indexer_repository::{SearchEngineClient, SearchError};
use catalogue_indexer_shared::{RawHit, ScrollRequest};

type Transform<T> = Box<dyn Fn(RawHit) -> T + Send + Sync>;

/// Lazy sequence of transformed hits from a scroll cursor.
///
/// The end of the export is signalled by a page with no hits, not by the
/// declared total: per-shard page sizes make the total a poor predictor of
/// when hits stop.
pub struct ScrollEnumerator<T> {
    client: Arc<dyn SearchEngineClient>,
    ttl: String,
    scroll_id: String,
    total: u64,
    buffered: VecDeque<T>,
    transform: Transform<T>,
    pages: usize,
    yielded: usize,
    finished: bool,
}

impl<T: Send> ScrollEnumerator<T> {
    /// Open a cursor and prepare to enumerate its hits.
    ///
    /// Hits carried by the opening response are yielded first.
    ///
    /// # Errors
    ///
    /// * `SearchError::CursorExpiredOrMissing` - If the opening response has no
    ///   cursor handle
    /// * Any error returned by the client
    #[instrument(skip(client, request, transform), fields(indices = ?request.index_names))]
    pub async fn open<F>(
        client: Arc<dyn SearchEngineClient>,
        request: ScrollRequest,
        transform: F,
    ) -> Result<Self, SearchError>
    where
        F: Fn(RawHit) -> T + Send + Sync + 'static,
    {
        let opening = client.open_scroll(&request).await?;
        let scroll_id = opening
            .scroll_id
            .ok_or_else(|| SearchError::cursor_missing("opening response has no scroll id"))?;

        debug!(total = opening.total, "Opened scroll");

        let buffered = opening.hits.into_iter().map(&transform).collect();

        Ok(Self {
            client,
            ttl: request.ttl,
            scroll_id,
            total: opening.total,
            buffered,
            transform: Box::new(transform),
            pages: 0,
            yielded: 0,
            finished: false,
        })
    }

    /// Total number of hits declared by the engine when the cursor opened.
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Number of continuation pages fetched so far.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// Next transformed hit, or `None` once the cursor is exhausted.
    ///
    /// After an error the enumerator is finished and yields nothing more.
    pub async fn next(&mut self) -> Result<Option<T>, SearchError> {
        loop {
            if let Some(item) = self.buffered.pop_front() {
                self.yielded += 1;
                return Ok(Some(item));
            }
            if self.finished {
                return Ok(None);
            }
            if let Err(e) = self.fetch_page().await {
                self.finished = true;
                return Err(e);
            }
        }
    }

    async fn fetch_page(&mut self) -> Result<(), SearchError> {
        let page = self
            .client
            .continue_scroll(&self.scroll_id, &self.ttl)
            .await?;

        self.scroll_id = page.scroll_id.ok_or_else(|| {
            SearchError::cursor_missing(format!(
                "page {} has no scroll id after {} of {} documents",
                self.pages + 1,
                self.yielded,
                self.total
            ))
        })?;
        self.pages += 1;

        if page.hits.is_empty() {
            debug!(pages = self.pages, documents = self.yielded, "Scroll exhausted");
            self.finished = true;
            return Ok(());
        }

        debug!(
            "Retrieved {} of {} documents",
            self.yielded + page.hits.len(),
            self.total
        );
        self.buffered
            .extend(page.hits.into_iter().map(|hit| (self.transform)(hit)));
        Ok(())
    }

    /// Consume the enumerator as a stream.
    pub fn into_stream(self) -> impl Stream<Item = Result<T, SearchError>> + Send
    where
        T: 'static,
    {
        stream::try_unfold(self, |mut enumerator| async move {
            let item = enumerator.next().await?;
            Ok::<_, SearchError>(item.map(|item| (item, enumerator)))
        })
    }
}
