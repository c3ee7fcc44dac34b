//! URL handling module
//!
//! Host authority extraction, robots.txt location, and validation of URLs
//! pulled from the frontier.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

pub use domain::{extract_authority, path_and_query};

/// Parses a frontier entry into a crawlable URL
///
/// Only absolute `http`/`https` URLs with a host are accepted.
///
/// # Examples
///
/// ```
/// use polite_crawler::url::parse_crawl_url;
///
/// assert!(parse_crawl_url("https://example.com/page").is_ok());
/// assert!(parse_crawl_url("ftp://example.com/file").is_err());
/// assert!(parse_crawl_url("/relative").is_err());
/// ```
pub fn parse_crawl_url(raw: &str) -> UrlResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;

    if !is_http_scheme(&url) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    if url.host_str().is_none() {
        return Err(UrlError::MissingHost(raw.to_string()));
    }

    Ok(url)
}

/// Returns true for `http` and `https` URLs
pub fn is_http_scheme(url: &Url) -> bool {
    matches!(url.scheme(), "http" | "https")
}

/// Builds the robots.txt location for the host serving `url`
///
/// Scheme, host and port are kept; path, query and fragment are replaced.
pub fn robots_url(url: &Url) -> UrlResult<Url> {
    let authority = extract_authority(url).ok_or_else(|| UrlError::MissingHost(url.to_string()))?;
    let raw = format!("{}://{}/robots.txt", url.scheme(), authority);
    Url::parse(&raw).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))
}
