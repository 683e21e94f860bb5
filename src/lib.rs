#![warn(missing_docs)]
//! Bounded-concurrency breadth-first website crawler.
//!
//! Starting from a seed URL, the crawler expands one depth layer at a time,
//! fetching at most `max_concurrency` same-origin pages in parallel and
//! reporting every discovered page exactly once. Fetching sits behind the
//! [`Fetcher`] trait so transports (and tests) can swap in their own
//! retrieval, optionally wrapped in exponential-backoff retries.

pub mod controls;
pub mod crawler;
pub mod extractor;
pub mod fetcher;
pub mod normalizer;

pub use controls::{Cli, ControlsError, CrawlControls};
pub use crawler::{
    BreadthFirstCrawler, CrawlError, CrawlErrorCallback, LinkFoundCallback, PageError,
};
pub use extractor::{extract, ExtractError};
pub use fetcher::{ExpBackoffRetryFetcher, FetchError, Fetcher, HttpFetcher};
pub use normalizer::NormalizedUrl;
