//! Content retrieval seam: HTTP fetching plus a retry decorator.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::Client;
use tokio::time::sleep;
use tracing::debug;

use crate::normalizer::NormalizedUrl;

/// Error type produced by fetcher implementations.
pub type FetchError = Box<dyn std::error::Error + Send + Sync>;

/// Retrieves the raw body of a page. Implementations must be safe to invoke
/// concurrently; the crawl engine shares one fetcher across all in-flight
/// batch tasks.
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches the page at `url`, returning its body bytes.
    async fn fetch(&self, url: &NormalizedUrl) -> Result<Bytes, FetchError>;
}

/// Plain HTTP fetcher over a shared [`reqwest::Client`].
///
/// Does not filter on status: non-2xx bodies are returned like any other.
/// Status policy, if any, belongs to wrapping fetchers.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Wraps a preconfigured client (timeout, redirect policy, user agent).
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &NormalizedUrl) -> Result<Bytes, FetchError> {
        let response = self.client.get(url.to_string()).send().await?;
        let body = response.bytes().await?;
        Ok(body)
    }
}

/// Decorates another fetcher with exponentially backed-off retries.
///
/// Attempt `i` of `retries` waits `base_delay * 2^(i-1)` after a failure;
/// once attempts are exhausted the last error is surfaced.
pub struct ExpBackoffRetryFetcher<F> {
    inner: F,
    retries: u32,
    base_delay: Duration,
}

impl<F> ExpBackoffRetryFetcher<F> {
    /// Builds the decorator around `inner`.
    pub fn new(inner: F, retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            retries,
            base_delay,
        }
    }
}

#[async_trait]
impl<F: Fetcher> Fetcher for ExpBackoffRetryFetcher<F> {
    async fn fetch(&self, url: &NormalizedUrl) -> Result<Bytes, FetchError> {
        let mut last_error: Option<FetchError> = None;
        for attempt in 1..=self.retries {
            match self.inner.fetch(url).await {
                Ok(body) => return Ok(body),
                Err(err) => {
                    debug!(url = %url, attempt, error = %err, "fetch attempt failed");
                    last_error = Some(err);
                    if attempt < self.retries {
                        sleep(self.base_delay * 2u32.pow(attempt - 1)).await;
                    }
                }
            }
        }
        Err(last_error.unwrap_or_else(|| "no fetch attempts were made".into()))
    }
}
