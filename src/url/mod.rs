//! URL handling module for Driftnet
//!
//! This module provides domain-root reduction and resolution of anchor
//! hrefs against the page they were found on.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::domain_root;

/// Returns true if the URL is a well-formed absolute URL the crawler can fetch
///
/// Only `http` and `https` URLs with a host qualify.
pub fn is_crawlable_url(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https") && url.host_str().is_some()
}

/// Parses a string as an absolute, crawlable URL
///
/// # Errors
///
/// * `UrlError::Parse` - the string is not an absolute URL
/// * `UrlError::InvalidScheme` - the scheme is not http or https
/// * `UrlError::MissingHost` - the URL has no host
pub fn parse_absolute(url_str: &str) -> UrlResult<Url> {
    let url = Url::parse(url_str.trim()).map_err(|e| UrlError::Parse(e.to_string()))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost);
    }

    Ok(url)
}

/// Resolves an anchor href found on `base_url` into an absolute URL
///
/// Absolute hrefs are used as they are. Anything else is joined onto the
/// base URL. Returns `None` when neither yields a crawlable URL.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use driftnet::url::resolve_href;
///
/// let base = Url::parse("https://ex.com/").unwrap();
/// let resolved = resolve_href("/x", &base).unwrap();
/// assert_eq!(resolved.as_str(), "https://ex.com/x");
///
/// assert!(resolve_href("javascript:void(0)", &base).is_none());
/// ```
pub fn resolve_href(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    if let Ok(absolute) = parse_absolute(href) {
        return Some(absolute);
    }

    base_url
        .join(href)
        .ok()
        .filter(is_crawlable_url)
}
