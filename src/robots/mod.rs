//! Robots.txt handling module
//!
//! This module provides parsing, matching, and per-host caching of robots.txt
//! policies. Anything that goes wrong while fetching or parsing a policy
//! resolves to "disallow everything" for that host.

mod cache;
mod matcher;
mod parser;

pub use cache::{PolicyCache, RobotsSource};
pub use matcher::{is_path_allowed, wildcard_to_regex, PathPattern};
pub use parser::{parse_policy, CrawlPolicy, PolicyParseError};

use crate::url::path_and_query;
use url::Url;

/// Checks if a URL is allowed by a host's policy
///
/// # Arguments
///
/// * `policy` - The parsed policy of the URL's host
/// * `url` - The URL to check
///
/// # Returns
///
/// * `true` - If the URL's path and query may be crawled
/// * `false` - If a disallow rule matches
pub fn is_allowed(policy: &CrawlPolicy, url: &Url) -> bool {
    policy.is_allowed(&path_and_query(url))
}
