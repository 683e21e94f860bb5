//! Canonical URL form used for deduplication and same-origin checks.

use std::fmt;

use url::Url;

/// A URL folded to the canonical form used as the visited-set key.
///
/// The canonical form keeps only scheme, host, and path: any leading `www.`
/// prefixes are stripped from the host, trailing slashes are stripped from
/// the path, and query/fragment are dropped. Normalizing an already
/// normalized URL is a no-op.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NormalizedUrl {
    scheme: String,
    host: String,
    path: String,
}

impl NormalizedUrl {
    /// Folds a parsed URL into its canonical form.
    pub fn from_url(url: &Url) -> Self {
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => String::new(),
        };
        Self::from_parts(url.scheme(), &host, url.path())
    }

    /// Builds the canonical form directly from components, applying the
    /// normalization rules to each.
    pub(crate) fn from_parts(scheme: &str, host: &str, path: &str) -> Self {
        Self {
            scheme: scheme.to_string(),
            host: host.trim_start_matches("www.").to_string(),
            path: path.trim_end_matches('/').to_string(),
        }
    }

    /// Scheme, verbatim from the source URL.
    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    /// Host (plus `:port` for non-default ports) with `www.` stripped.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Path with trailing slashes removed; empty for the root.
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}", self.scheme, self.host)?;
        if !self.path.is_empty() && !self.path.starts_with('/') && !self.host.is_empty() {
            f.write_str("/")?;
        }
        f.write_str(&self.path)
    }
}
