//! Breadth-first traversal engine with bounded batch concurrency.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use futures_util::future::join_all;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

use crate::extractor::{self, ExtractError};
use crate::fetcher::{FetchError, Fetcher};
use crate::normalizer::NormalizedUrl;

/// Callback fired for every newly discovered link.
pub type LinkFoundCallback = Arc<dyn Fn(&NormalizedUrl) + Send + Sync>;
/// Callback fired when fetching or scanning a page fails.
pub type CrawlErrorCallback = Arc<dyn Fn(&NormalizedUrl, &PageError) + Send + Sync>;

/// Validation errors returned by [`BreadthFirstCrawler::crawl`] before any
/// work starts. Per-page failures never surface here; they go to the error
/// callback.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CrawlError {
    /// Depth must be greater than zero.
    #[error("invalid depth, must be greater than 0")]
    InvalidDepth,
    /// Max concurrency must be greater than zero.
    #[error("invalid maximum concurrency, must be greater than 0")]
    InvalidMaxConcurrency,
}

/// A per-page failure reported through the error callback.
#[derive(Debug, Error)]
pub enum PageError {
    /// The fetcher could not retrieve the page.
    #[error("fetch failed: {0}")]
    Fetch(FetchError),
    /// The page body could not be scanned for links.
    #[error("link extraction failed: {0}")]
    Extract(#[from] ExtractError),
}

/// Tracks every URL the crawl has touched.
///
/// Each key carries whether a fetch was dispatched for it; links discovered
/// on the deepest layer stay recorded without ever being fetched. Both
/// operations take the lock once, so concurrent claims of the same key have
/// exactly one winner.
#[derive(Default)]
struct VisitedSet {
    inner: Mutex<HashMap<String, bool>>,
}

impl VisitedSet {
    /// Claims `key` for fetching. Returns false when a fetch was already
    /// dispatched for it.
    fn claim_for_fetch(&self, key: &str) -> bool {
        let mut inner = self.lock();
        match inner.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                if *entry.get() {
                    false
                } else {
                    entry.insert(true);
                    true
                }
            }
            Entry::Vacant(entry) => {
                entry.insert(true);
                true
            }
        }
    }

    /// Records a discovered link. Returns true when the key was not yet
    /// present in any state.
    fn record_discovered(&self, key: &str) -> bool {
        match self.lock().entry(key.to_string()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(entry) => {
                entry.insert(false);
                true
            }
        }
    }

    fn snapshot(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, bool>> {
        self.inner
            .lock()
            .unwrap_or_else(|_| panic!("visited set mutex poisoned"))
    }
}

/// Breadth-first crawler over a shared [`Fetcher`].
///
/// The engine expands one depth layer at a time: the frontier is cut into
/// contiguous batches of at most `max_concurrency` URLs, each batch is
/// fetched in parallel behind a join barrier, and the links harvested across
/// the layer become the next frontier. The visited set guarantees at most one
/// fetch per URL per crawl, which is also what breaks link cycles.
pub struct BreadthFirstCrawler {
    fetcher: Arc<dyn Fetcher>,
    link_found: Option<LinkFoundCallback>,
    on_error: Option<CrawlErrorCallback>,
}

impl BreadthFirstCrawler {
    /// Creates a crawler around the given fetcher.
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            link_found: None,
            on_error: None,
        }
    }

    /// Registers a callback invoked once per newly discovered link.
    pub fn with_link_found(
        mut self,
        callback: impl Fn(&NormalizedUrl) + Send + Sync + 'static,
    ) -> Self {
        self.link_found = Some(Arc::new(callback));
        self
    }

    /// Registers a callback invoked for every page that fails to fetch or
    /// scan.
    pub fn with_on_error(
        mut self,
        callback: impl Fn(&NormalizedUrl, &PageError) + Send + Sync + 'static,
    ) -> Self {
        self.on_error = Some(Arc::new(callback));
        self
    }

    /// Crawls up to `depth` layers starting from `seed`, returning the
    /// canonical strings of every URL touched.
    ///
    /// Cancellation is observed between batches: in-flight fetches complete,
    /// the partial result is returned, and no error is reported. Only
    /// argument validation can fail.
    pub async fn crawl(
        &self,
        cancel: &CancellationToken,
        seed: &Url,
        depth: usize,
        max_concurrency: usize,
    ) -> Result<Vec<String>, CrawlError> {
        if depth == 0 {
            return Err(CrawlError::InvalidDepth);
        }
        if max_concurrency == 0 {
            return Err(CrawlError::InvalidMaxConcurrency);
        }

        let visited = VisitedSet::default();
        let mut frontier = vec![NormalizedUrl::from_url(seed)];

        for layer in 0..depth {
            debug!(layer, frontier = frontier.len(), "expanding layer");
            let mut next_frontier = Vec::new();
            for batch in frontier.chunks(max_concurrency) {
                if cancel.is_cancelled() {
                    debug!(layer, "cancellation observed between batches");
                    break;
                }
                next_frontier.extend(self.crawl_batch(batch, &visited).await);
            }
            for link in &next_frontier {
                if visited.record_discovered(&link.to_string()) {
                    self.dispatch_link_found(link);
                }
            }
            frontier = next_frontier;
        }

        Ok(visited.snapshot())
    }

    /// Fetches every unclaimed URL of one batch in parallel and returns the
    /// links harvested from the pages that succeeded. The join barrier makes
    /// sure nothing of this batch is still in flight when it returns.
    async fn crawl_batch(
        &self,
        batch: &[NormalizedUrl],
        visited: &VisitedSet,
    ) -> Vec<NormalizedUrl> {
        let mut tasks = Vec::new();
        for link in batch {
            if !visited.claim_for_fetch(&link.to_string()) {
                continue;
            }
            let fetcher = Arc::clone(&self.fetcher);
            let link = link.clone();
            tasks.push(tokio::spawn(async move {
                let outcome = crawl_page(fetcher.as_ref(), &link).await;
                (link, outcome)
            }));
        }

        let mut harvested = Vec::new();
        for joined in join_all(tasks).await {
            match joined {
                Ok((_, Ok(links))) => harvested.extend(links),
                Ok((link, Err(err))) => self.dispatch_error(&link, err),
                Err(err) => warn!(error = %err, "crawl task aborted"),
            }
        }
        harvested
    }

    fn dispatch_link_found(&self, link: &NormalizedUrl) {
        let Some(callback) = self.link_found.clone() else {
            return;
        };
        let link = link.clone();
        tokio::spawn(async move {
            if catch_unwind(AssertUnwindSafe(|| callback(&link))).is_err() {
                warn!(url = %link, "recovered from panicking link-found callback");
            }
        });
    }

    fn dispatch_error(&self, link: &NormalizedUrl, err: PageError) {
        let Some(callback) = self.on_error.clone() else {
            debug!(url = %link, error = %err, "page failed with no error callback registered");
            return;
        };
        let link = link.clone();
        tokio::spawn(async move {
            if catch_unwind(AssertUnwindSafe(|| callback(&link, &err))).is_err() {
                warn!(url = %link, "recovered from panicking error callback");
            }
        });
    }
}

/// Fetches one page and harvests its same-origin links. The body is dropped
/// here regardless of how extraction goes.
async fn crawl_page(
    fetcher: &dyn Fetcher,
    url: &NormalizedUrl,
) -> Result<Vec<NormalizedUrl>, PageError> {
    let body = fetcher.fetch(url).await.map_err(PageError::Fetch)?;
    let links = extractor::extract(url, &body)?;
    Ok(links)
}
