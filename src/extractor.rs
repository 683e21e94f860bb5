//! Same-origin link extraction built on `lol_html`.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use lol_html::{element, HtmlRewriter, OutputSink, Settings};
use thiserror::Error;
use url::Url;

use crate::normalizer::NormalizedUrl;

/// Errors surfaced while scanning HTML for links.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The rewriter encountered markup it could not recover from.
    #[error("html rewrite error: {0}")]
    Rewrite(#[from] lol_html::errors::RewritingError),
    /// Internal collector still had outstanding references.
    #[error("link collector still in use")]
    CollectorInUse,
    /// Collector mutex was poisoned while draining results.
    #[error("link collector mutex poisoned")]
    CollectorPoisoned,
}

/// Scans `html` for anchor links on the same origin as `base`.
///
/// Every `href` is parsed, normalized, and resolved against the base page.
/// Absolute links survive only when they are `http`/`https` and their
/// normalized host equals the base host; relative references are rebuilt on
/// the base scheme and host via path substitution. The result is in document
/// order with duplicates (by canonical form) removed.
pub fn extract(base: &NormalizedUrl, html: &[u8]) -> Result<Vec<NormalizedUrl>, ExtractError> {
    let found: Arc<Mutex<Vec<NormalizedUrl>>> = Arc::new(Mutex::new(Vec::new()));
    let found_handle = Arc::clone(&found);
    let base_handle = base.clone();

    let handler = element!("a[href]", move |el| {
        if let Some(href) = el.get_attribute("href") {
            if let Some(link) = resolve_href(&base_handle, &href) {
                let mut entries = found_handle
                    .lock()
                    .unwrap_or_else(|_| panic!("link collector mutex poisoned"));
                entries.push(link);
            }
        }
        Ok(())
    });

    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![handler],
            ..Settings::default()
        },
        NoopSink,
    );

    rewriter.write(html)?;
    rewriter.end()?;

    let collected = Arc::try_unwrap(found)
        .map_err(|_| ExtractError::CollectorInUse)?
        .into_inner()
        .map_err(|_| ExtractError::CollectorPoisoned)?;

    let mut seen = HashSet::new();
    Ok(collected
        .into_iter()
        .filter(|link| seen.insert(link.to_string()))
        .collect())
}

/// Resolves a single `href` against the base page, returning `None` for
/// links that fall outside the crawl origin or cannot be parsed.
fn resolve_href(base: &NormalizedUrl, href: &str) -> Option<NormalizedUrl> {
    match Url::parse(href) {
        Ok(absolute) => {
            if !matches!(absolute.scheme(), "http" | "https") {
                return None;
            }
            absolute.host_str()?;
            let link = NormalizedUrl::from_url(&absolute);
            (link.host() == base.host()).then_some(link)
        }
        Err(url::ParseError::RelativeUrlWithoutBase) => Some(substitute_base(base, href)),
        Err(_) => None,
    }
}

/// Rebuilds a relative reference on the base scheme and host, keeping only
/// its path. Query and fragment never reach the canonical form; a
/// protocol-relative reference contributes its path alone.
fn substitute_base(base: &NormalizedUrl, href: &str) -> NormalizedUrl {
    let end = href.find(['?', '#']).unwrap_or(href.len());
    let mut path = &href[..end];
    if let Some(rest) = path.strip_prefix("//") {
        path = match rest.find('/') {
            Some(slash) => &rest[slash..],
            None => "",
        };
    }
    NormalizedUrl::from_parts(base.scheme(), base.host(), path)
}

struct NoopSink;

impl OutputSink for NoopSink {
    fn handle_chunk(&mut self, _chunk: &[u8]) {}
}
