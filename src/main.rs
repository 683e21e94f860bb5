//! Crawler binary: argument validation, signal bridging, report output.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use sitecrawl::{BreadthFirstCrawler, Cli, ExpBackoffRetryFetcher, Fetcher, HttpFetcher};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USER_AGENT: &str = concat!("sitecrawl/", env!("CARGO_PKG_VERSION"));
const REDIRECT_LIMIT: usize = 5;
const RETRY_BASE_DELAY: Duration = Duration::from_secs(4);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let controls = cli
        .build_controls()
        .map_err(|err| anyhow::anyhow!("argument error: {err}"))?;

    let client = reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(REDIRECT_LIMIT))
        .timeout(controls.timeout())
        .build()
        .context("failed to build http client")?;

    let http = HttpFetcher::new(client);
    let fetcher: Arc<dyn Fetcher> = if controls.retries() > 0 {
        Arc::new(ExpBackoffRetryFetcher::new(
            http,
            controls.retries(),
            RETRY_BASE_DELAY,
        ))
    } else {
        Arc::new(http)
    };

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            debug!("shutdown signal received, cancelling crawl");
            cancel.cancel();
        });
    }

    let crawler = BreadthFirstCrawler::new(fetcher)
        .with_link_found(|link| println!("[LINK] Crawling: {link}"))
        .with_on_error(|link, err| println!("[ERROR] error while crawling [{link}] err: {err}"));

    let links = crawler
        .crawl(
            &cancel,
            controls.seed(),
            controls.depth(),
            controls.max_concurrency(),
        )
        .await?;

    println!("Total links found: {}", links.len());
    Ok(())
}

/// Resolves when the process receives SIGINT or, on unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
