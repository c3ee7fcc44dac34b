//! Link classification
//!
//! Splits a page's outbound links into same-host and external-host sets by
//! exact authority comparison with the page's own URL, then filters the
//! same-host set through the host's robots.txt policy. External links are not
//! filtered here; their own host's policy is applied when they are crawled.

use crate::crawler::parser::ParsedPage;
use crate::robots::{is_allowed, CrawlPolicy};
use crate::storage::PageRecord;
use crate::url::extract_authority;
use std::collections::HashSet;
use url::Url;

/// Relationship between a link and the page it was found on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkKind {
    SameHost,
    ExternalHost,
}

/// A classified outbound link
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundLink {
    pub url: Url,
    pub kind: LinkKind,
}

/// Links of one page, partitioned by host
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassifiedLinks {
    pub same_host: Vec<Url>,
    pub external: Vec<Url>,
}

/// Everything learned from one crawled page
///
/// Lives for a single crawl iteration and is then broken up into a page
/// record and frontier entries.
#[derive(Debug, Clone, PartialEq)]
pub struct PageInfo {
    pub source: Url,
    pub title: String,
    pub description: Option<String>,
    pub links: Vec<OutboundLink>,
}

impl PageInfo {
    /// The page record to upsert for this page
    pub fn to_page_record(&self) -> PageRecord {
        PageRecord::new(
            self.source.as_str(),
            self.title.as_str(),
            self.description.clone().unwrap_or_default(),
        )
    }

    /// URLs to offer to the frontier, same-host links first
    pub fn frontier_urls(&self) -> Vec<String> {
        let same = self.links.iter().filter(|l| l.kind == LinkKind::SameHost);
        let external = self
            .links
            .iter()
            .filter(|l| l.kind == LinkKind::ExternalHost);
        same.chain(external).map(|l| l.url.to_string()).collect()
    }

    /// Number of links with the given kind
    pub fn count(&self, kind: LinkKind) -> usize {
        self.links.iter().filter(|l| l.kind == kind).count()
    }
}

/// Partitions links by exact host authority equality with `source`
///
/// Each distinct URL appears once, in the set it belongs to, in first-seen
/// order. Links whose host cannot be determined are dropped.
///
/// # Example
///
/// ```
/// use polite_crawler::crawler::classify_links;
/// use url::Url;
///
/// let source = Url::parse("https://a.com/p").unwrap();
/// let links = vec![
///     Url::parse("https://a.com/x").unwrap(),
///     Url::parse("https://b.com/z").unwrap(),
/// ];
/// let classified = classify_links(&source, &links);
/// assert_eq!(classified.same_host.len(), 1);
/// assert_eq!(classified.external.len(), 1);
/// ```
pub fn classify_links(source: &Url, links: &[Url]) -> ClassifiedLinks {
    let source_host = extract_authority(source);
    let mut seen = HashSet::new();
    let mut classified = ClassifiedLinks::default();

    for link in links {
        let Some(host) = extract_authority(link) else {
            tracing::debug!("Dropping link without host: {}", link);
            continue;
        };

        if !seen.insert(link.as_str()) {
            continue;
        }

        if source_host.as_deref() == Some(host.as_str()) {
            classified.same_host.push(link.clone());
        } else {
            classified.external.push(link.clone());
        }
    }

    classified
}

/// Builds the [`PageInfo`] for a parsed page
///
/// # Arguments
///
/// * `source` - URL the page was fetched from
/// * `page` - Parsed title, description and links
/// * `policy` - robots.txt policy of the source host, applied to same-host links
pub fn build_page_info(source: &Url, page: ParsedPage, policy: &CrawlPolicy) -> PageInfo {
    let classified = classify_links(source, &page.links);
    let mut links = Vec::with_capacity(classified.same_host.len() + classified.external.len());

    for url in classified.same_host {
        if is_allowed(policy, &url) {
            links.push(OutboundLink {
                url,
                kind: LinkKind::SameHost,
            });
        } else {
            tracing::info!("Dropping {} found on {}: disallowed by robots.txt", url, source);
        }
    }

    links.extend(classified.external.into_iter().map(|url| OutboundLink {
        url,
        kind: LinkKind::ExternalHost,
    }));

    PageInfo {
        source: source.clone(),
        title: page.title,
        description: page.description,
        links,
    }
}
