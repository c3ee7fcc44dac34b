//! HTTP fetcher implementation
//!
//! This module handles all HTTP requests for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - GET requests for pages, checked for status and Content-Type
//! - GET requests for robots.txt documents
//!
//! Redirects are not followed; a 3xx answer is reported like any other
//! non-success status.

use crate::config::UserAgentConfig;
use crate::crawler::parser::{parse_html, ParsedPage};
use crate::robots::RobotsSource;
use crate::CrawlerError;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client, Response};
use std::time::Duration;
use url::Url;

/// Source of fetched and parsed pages
///
/// Implementations either return the page's title, description and links, or
/// an error describing why the page could not be used.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Fetches `url` and extracts its metadata and outbound links
    async fn fetch_and_extract(&self, url: &Url) -> Result<ParsedPage, CrawlerError>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use polite_crawler::config::UserAgentConfig;
/// use polite_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "PoliteCrawler".to_string(),
///     crawler_version: "1.0".to_string(),
///     contact_url: "https://example.com/about".to_string(),
///     contact_email: "admin@example.com".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent_string())
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::none())
        .gzip(true)
        .brotli(true)
        .build()
}

/// Fetches pages and robots.txt documents over HTTP
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with `config`
    pub fn new(config: &UserAgentConfig) -> Result<Self, CrawlerError> {
        Ok(Self {
            client: build_http_client(config)?,
        })
    }

    /// Sends a GET and rejects any non-success status
    async fn get_success(&self, url: &Url) -> Result<Response, CrawlerError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|source| CrawlerError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CrawlerError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

/// Returns true when a Content-Type header names an HTML document
///
/// A missing header is accepted; servers commonly omit it for HTML.
pub fn is_html_content_type(content_type: Option<&str>) -> bool {
    match content_type {
        None => true,
        Some(value) => {
            let mime = value
                .split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase();
            mime == "text/html" || mime == "application/xhtml+xml"
        }
    }
}

#[async_trait]
impl PageSource for HttpFetcher {
    async fn fetch_and_extract(&self, url: &Url) -> Result<ParsedPage, CrawlerError> {
        let response = self.get_success(url).await?;

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if !is_html_content_type(content_type.as_deref()) {
            return Err(CrawlerError::NotHtml {
                url: url.to_string(),
                content_type: content_type.unwrap_or_default(),
            });
        }

        let body = response.text().await.map_err(|source| CrawlerError::Http {
            url: url.to_string(),
            source,
        })?;

        tracing::debug!("Fetched {} ({} bytes)", url, body.len());
        Ok(parse_html(&body, url))
    }
}

#[async_trait]
impl RobotsSource for HttpFetcher {
    async fn fetch_robots(&self, robots_url: &Url) -> Result<String, CrawlerError> {
        let response = self.get_success(robots_url).await?;
        response.text().await.map_err(|source| CrawlerError::Http {
            url: robots_url.to_string(),
            source,
        })
    }
}
