use url::Url;

/// Extracts the host authority from a URL
///
/// The authority is the lowercase host followed by `:port` when the URL carries
/// an explicit non-default port. It is the key used for robots.txt caching and
/// politeness scheduling.
///
/// # Arguments
///
/// * `url` - The URL to extract the authority from
///
/// # Returns
///
/// * `Some(String)` - The lowercase host, with port if present
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use polite_crawler::url::extract_authority;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_authority(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_authority(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns the path plus query string of a URL, as matched by robots.txt rules
pub fn path_and_query(url: &Url) -> String {
    match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    }
}
