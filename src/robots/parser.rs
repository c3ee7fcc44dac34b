//! Robots.txt parser implementation
//!
//! Only the `User-agent: *` group is honoured; groups addressed to named agents
//! are ignored. Every line is lowercased and stripped of whitespace before it is
//! interpreted, so patterns are stored in lowercase.

use crate::robots::matcher::{is_path_allowed, PathPattern};
use thiserror::Error;

/// Errors raised while parsing a robots.txt document
#[derive(Debug, Error)]
pub enum PolicyParseError {
    #[error("line {line}: directive '{directive}' has no ':' separator")]
    MissingSeparator { line: usize, directive: String },

    #[error("line {line}: invalid crawl-delay '{value}'")]
    InvalidCrawlDelay { line: usize, value: String },

    #[error("invalid path pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        source: regex::Error,
    },
}

/// Parsed crawl policy for a single host
///
/// Rules keep document order. A policy is immutable once built; the cache hands
/// out shared references to it.
#[derive(Debug, Clone)]
pub struct CrawlPolicy {
    disallow: Vec<PathPattern>,
    allow: Vec<PathPattern>,
    crawl_delay: Option<u32>,
}

impl CrawlPolicy {
    /// Creates a policy that allows every path
    pub fn allow_all() -> Self {
        Self {
            disallow: Vec::new(),
            allow: Vec::new(),
            crawl_delay: None,
        }
    }

    /// Creates the fail-closed policy used when robots.txt is unreachable or unparseable
    ///
    /// The allow list is empty and the disallow list holds only the root pattern,
    /// which matches every path on the host.
    pub fn disallow_all() -> Self {
        Self {
            disallow: vec![PathPattern::root()],
            allow: Vec::new(),
            crawl_delay: None,
        }
    }

    /// Checks if a path (with query string) may be crawled
    ///
    /// Patterns are stored lowercased, so the path is lowercased before matching.
    pub fn is_allowed(&self, path_and_query: &str) -> bool {
        let path = path_and_query.to_lowercase();
        is_path_allowed(&self.disallow, &self.allow, &path)
    }

    /// Disallow patterns in document order
    pub fn disallow_patterns(&self) -> impl Iterator<Item = &str> {
        self.disallow.iter().map(PathPattern::as_str)
    }

    /// Allow patterns in document order
    pub fn allow_patterns(&self) -> impl Iterator<Item = &str> {
        self.allow.iter().map(PathPattern::as_str)
    }

    /// The crawl-delay hint in seconds, if the document set one
    pub fn crawl_delay(&self) -> Option<u32> {
        self.crawl_delay
    }

    /// Returns true when every path on the host is disallowed by the root rule
    pub fn is_disallow_all(&self) -> bool {
        self.disallow.iter().any(|p| p.as_str().is_empty() || p.as_str() == "/")
    }
}

/// Parses the text of a robots.txt document into a crawl policy
///
/// # Arguments
///
/// * `content` - The raw robots.txt file content
///
/// # Returns
///
/// * `Ok(CrawlPolicy)` - The rules of the `User-agent: *` group
/// * `Err(PolicyParseError)` - The document is malformed; callers resolve this
///   to [`CrawlPolicy::disallow_all`]
pub fn parse_policy(content: &str) -> Result<CrawlPolicy, PolicyParseError> {
    let mut disallow = Vec::new();
    let mut allow = Vec::new();
    let mut crawl_delay = None;
    let mut in_wildcard_group = false;

    for (index, raw_line) in content.lines().enumerate() {
        let line_number = index + 1;
        let line: String = raw_line
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let Some(directive) = Directive::classify(&line) else {
            continue;
        };

        // Outside the wildcard group only user-agent lines matter
        if directive != Directive::UserAgent && !in_wildcard_group {
            continue;
        }

        let value = match line.split_once(':') {
            Some((_, value)) => value,
            None => {
                return Err(PolicyParseError::MissingSeparator {
                    line: line_number,
                    directive: directive.name().to_string(),
                })
            }
        };

        match directive {
            Directive::UserAgent => {
                in_wildcard_group = value == "*";
            }
            Directive::Allow => allow.push(compile(value)?),
            Directive::Disallow => {
                // An empty Disallow means "disallow nothing"
                if !value.is_empty() {
                    disallow.push(compile(value)?);
                }
            }
            Directive::CrawlDelay => {
                let invalid = || PolicyParseError::InvalidCrawlDelay {
                    line: line_number,
                    value: value.to_string(),
                };
                let seconds = value.parse::<i64>().map_err(|_| invalid())?;
                // A negative delay leaves the hint unset
                crawl_delay = if seconds < 0 {
                    None
                } else {
                    Some(u32::try_from(seconds).map_err(|_| invalid())?)
                };
            }
        }
    }

    Ok(CrawlPolicy {
        disallow,
        allow,
        crawl_delay,
    })
}

fn compile(pattern: &str) -> Result<PathPattern, PolicyParseError> {
    PathPattern::new(pattern).map_err(|source| PolicyParseError::InvalidPattern {
        pattern: pattern.to_string(),
        source,
    })
}

/// Directives this crawler understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Directive {
    UserAgent,
    Allow,
    Disallow,
    CrawlDelay,
}

impl Directive {
    /// Identifies the directive a normalized line starts with
    ///
    /// With a separator the key before the first `:` must equal a directive
    /// name. Without one, a line that merely starts with a directive name is
    /// still classified so the caller can reject it as malformed.
    fn classify(line: &str) -> Option<Self> {
        let all = [
            Self::UserAgent,
            Self::Allow,
            Self::Disallow,
            Self::CrawlDelay,
        ];

        match line.split_once(':') {
            Some((key, _)) => all.into_iter().find(|directive| key == directive.name()),
            None => all
                .into_iter()
                .find(|directive| line.starts_with(directive.name())),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::UserAgent => "user-agent",
            Self::Allow => "allow",
            Self::Disallow => "disallow",
            Self::CrawlDelay => "crawl-delay",
        }
    }
}
