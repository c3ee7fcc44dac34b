//! HTML parser for extracting links and metadata
//!
//! This module handles parsing HTML content to extract:
//! - The page title (empty when missing)
//! - The meta description (absent when missing)
//! - Outbound links from `<a href>` tags

use crate::url::{extract_authority, is_http_scheme};
use scraper::{Html, Selector};
use std::collections::HashSet;
use url::Url;

/// Extracted information from an HTML page
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    /// The page title (from the first `<title>` tag), trimmed; empty if none
    pub title: String,

    /// Content of `<meta name="description">`, if present and non-empty
    pub description: Option<String>,

    /// Outbound links in document order, absolute, without fragments
    pub links: Vec<Url>,
}

/// Parses HTML content and extracts title, description and links
///
/// # Link Extraction Rules
///
/// - an `href` starting with a single `/` is joined to the source URL's scheme
///   and authority
/// - an `href` starting with `//` is taken as scheme-relative
/// - anything else must already be an absolute URL; hrefs that fail to parse
///   are dropped one by one
/// - only `http` and `https` links survive; fragments are stripped and
///   repeated links keep their first position
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `source` - The URL the content was fetched from
///
/// # Example
///
/// ```
/// use polite_crawler::crawler::parse_html;
/// use url::Url;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let source = Url::parse("https://example.com/").unwrap();
/// let parsed = parse_html(html, &source);
/// assert_eq!(parsed.title, "Test");
/// assert_eq!(parsed.links[0].as_str(), "https://example.com/page");
/// ```
pub fn parse_html(html: &str, source: &Url) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        title: extract_title(&document),
        description: extract_description(&document),
        links: extract_links(&document, source),
    }
}

/// Extracts the page title from the HTML document
fn extract_title(document: &Html) -> String {
    let Ok(title_selector) = Selector::parse("title") else {
        return String::new();
    };

    document
        .select(&title_selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .unwrap_or_default()
}

/// Extracts the meta description, treating a blank one as missing
fn extract_description(document: &Html) -> Option<String> {
    let selector = Selector::parse("meta[name='description'][content]").ok()?;

    let description = document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty());

    if description.is_none() {
        tracing::trace!("No description metadata found");
    }
    description
}

/// Extracts all valid links from the HTML document
fn extract_links(document: &Html, source: &Url) -> Vec<Url> {
    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };

        if let Some(link) = resolve_link(href, source) {
            if seen.insert(link.as_str().to_string()) {
                links.push(link);
            }
        }
    }

    links
}

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - Empty hrefs
/// - Hrefs that are neither root-relative nor absolute
/// - Non-HTTP(S) URLs after resolution
fn resolve_link(href: &str, source: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() {
        return None;
    }

    let resolved = if href.starts_with("//") {
        Url::parse(&format!("{}:{}", source.scheme(), href))
    } else if href.starts_with('/') {
        let authority = extract_authority(source)?;
        Url::parse(&format!("{}://{}{}", source.scheme(), authority, href))
    } else {
        Url::parse(href)
    };

    let mut url = match resolved {
        Ok(url) => url,
        Err(e) => {
            tracing::trace!("Discarding link {:?}: {}", href, e);
            return None;
        }
    };

    if !is_http_scheme(&url) {
        return None;
    }

    url.set_fragment(None);
    Some(url)
}
