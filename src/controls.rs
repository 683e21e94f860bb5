//! Command-line surface and validated crawl controls.

use std::time::Duration;

use clap::Parser;
use thiserror::Error;
use url::Url;

/// Errors produced while validating command-line arguments.
#[derive(Debug, Error)]
pub enum ControlsError {
    /// The seed URL was missing or unparseable.
    #[error("invalid URL to crawl. example: --url=https://example.com")]
    InvalidUrl,
    /// Depth must be greater than zero.
    #[error("invalid depth. must be greater than 0. example: --depth=2")]
    InvalidDepth,
    /// Max concurrency must be greater than zero.
    #[error("invalid max_concurrency. must be greater than 0. example: --max_concurrency=2")]
    InvalidMaxConcurrency,
    /// Timeout must be greater than zero.
    #[error("invalid timeout. example: --timeout=5000")]
    InvalidTimeout,
    /// Retries must be zero or greater.
    #[error("invalid retries. example: --retries=2")]
    InvalidRetries,
}

/// Tunable knobs that bound one crawl run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CrawlControls {
    seed: Url,
    depth: usize,
    max_concurrency: usize,
    timeout: Duration,
    retries: u32,
}

impl CrawlControls {
    /// Seed URL the crawl starts from.
    pub fn seed(&self) -> &Url {
        &self.seed
    }

    /// Number of depth layers to expand, seed layer included.
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Maximum fetches in flight within one batch.
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Per-request HTTP timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch attempts per page; zero disables the retry wrapper.
    pub fn retries(&self) -> u32 {
        self.retries
    }
}

/// Command-line interface of the crawler binary.
#[derive(Parser, Debug, Clone)]
#[command(name = "sitecrawl", about = "Bounded breadth-first website crawler")]
pub struct Cli {
    /// URL to crawl
    #[arg(long)]
    pub url: String,

    /// Crawling depth; the crawler keeps expanding newly discovered pages
    /// until this many layers have been fetched
    #[arg(long, default_value_t = 4, allow_hyphen_values = true)]
    pub depth: i64,

    /// Maximum concurrent requests per batch
    #[arg(long = "max_concurrency", default_value_t = 5, allow_hyphen_values = true)]
    pub max_concurrency: i64,

    /// Per-request timeout in milliseconds
    #[arg(long, default_value_t = 15_000, allow_hyphen_values = true)]
    pub timeout: i64,

    /// Fetch attempts per page in case of errors; 0 disables retrying
    #[arg(long, default_value_t = 3, allow_hyphen_values = true)]
    pub retries: i64,
}

impl Cli {
    /// Validates the parsed arguments into [`CrawlControls`].
    pub fn build_controls(&self) -> Result<CrawlControls, ControlsError> {
        if self.url.trim().is_empty() {
            return Err(ControlsError::InvalidUrl);
        }
        let seed = Url::parse(&self.url).map_err(|_| ControlsError::InvalidUrl)?;
        if self.depth <= 0 {
            return Err(ControlsError::InvalidDepth);
        }
        if self.max_concurrency <= 0 {
            return Err(ControlsError::InvalidMaxConcurrency);
        }
        if self.timeout <= 0 {
            return Err(ControlsError::InvalidTimeout);
        }
        if self.retries < 0 {
            return Err(ControlsError::InvalidRetries);
        }

        Ok(CrawlControls {
            seed,
            depth: self.depth as usize,
            max_concurrency: self.max_concurrency as usize,
            timeout: Duration::from_millis(self.timeout as u64),
            retries: self.retries as u32,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(url: &str) -> Cli {
        Cli {
            url: url.to_string(),
            depth: 4,
            max_concurrency: 5,
            timeout: 15_000,
            retries: 3,
        }
    }

    #[test]
    fn defaults_validate() {
        let controls = cli("https://example.com").build_controls().expect("valid args");
        assert_eq!(controls.depth(), 4);
        assert_eq!(controls.max_concurrency(), 5);
        assert_eq!(controls.timeout(), Duration::from_millis(15_000));
        assert_eq!(controls.retries(), 3);
    }

    #[test]
    fn rejects_empty_and_unparseable_urls() {
        assert!(matches!(
            cli("  ").build_controls(),
            Err(ControlsError::InvalidUrl)
        ));
        assert!(matches!(
            cli("not a url").build_controls(),
            Err(ControlsError::InvalidUrl)
        ));
    }

    #[test]
    fn rejects_non_positive_depth() {
        let mut args = cli("https://example.com");
        args.depth = 0;
        assert!(matches!(args.build_controls(), Err(ControlsError::InvalidDepth)));
        args.depth = -1;
        assert!(matches!(args.build_controls(), Err(ControlsError::InvalidDepth)));
    }

    #[test]
    fn rejects_non_positive_concurrency_and_timeout() {
        let mut args = cli("https://example.com");
        args.max_concurrency = 0;
        assert!(matches!(
            args.build_controls(),
            Err(ControlsError::InvalidMaxConcurrency)
        ));

        let mut args = cli("https://example.com");
        args.timeout = 0;
        assert!(matches!(args.build_controls(), Err(ControlsError::InvalidTimeout)));
    }

    #[test]
    fn rejects_negative_retries_but_allows_zero() {
        let mut args = cli("https://example.com");
        args.retries = -1;
        assert!(matches!(args.build_controls(), Err(ControlsError::InvalidRetries)));
        args.retries = 0;
        assert_eq!(args.build_controls().expect("zero retries valid").retries(), 0);
    }
}
