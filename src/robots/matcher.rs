//! Robots.txt path pattern matching
//!
//! Patterns are simple globs: `*` matches any run of characters and every other
//! character is literal. A compiled pattern is searched for anywhere inside the
//! candidate path, it is not anchored to the start or the end.

use regex::Regex;

/// A single compiled allow/disallow path pattern
#[derive(Debug, Clone)]
pub struct PathPattern {
    raw: String,
    /// `None` for the empty pattern and for `/`, which match every path
    regex: Option<Regex>,
}

impl PathPattern {
    /// Compiles a robots.txt path pattern
    ///
    /// # Arguments
    ///
    /// * `raw` - The pattern as written in the policy document
    ///
    /// # Returns
    ///
    /// * `Ok(PathPattern)` - The compiled pattern
    /// * `Err(regex::Error)` - The translated expression could not be compiled
    pub fn new(raw: &str) -> Result<Self, regex::Error> {
        let regex = if matches_everything(raw) {
            None
        } else {
            Some(Regex::new(&wildcard_to_regex(raw))?)
        };

        Ok(Self {
            raw: raw.to_string(),
            regex,
        })
    }

    /// The root pattern `/`, which matches every path
    pub fn root() -> Self {
        Self {
            raw: "/".to_string(),
            regex: None,
        }
    }

    /// Returns the pattern as written in the policy document
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Checks whether the pattern occurs anywhere in `path`
    pub fn matches(&self, path: &str) -> bool {
        match &self.regex {
            None => true,
            Some(regex) => regex.is_match(path),
        }
    }
}

fn matches_everything(raw: &str) -> bool {
    raw.is_empty() || raw == "/"
}

/// Translates a wildcard pattern into a regular expression
///
/// Each `*` becomes `.*`; everything between wildcards is escaped so that
/// `/ ! . + $ ^ ?` and any other metacharacter match literally.
pub fn wildcard_to_regex(pattern: &str) -> String {
    pattern
        .split('*')
        .map(|literal| regex::escape(literal))
        .collect::<Vec<_>>()
        .join(".*")
}

/// Decides whether `path` may be crawled under the given rule lists
///
/// Disallow rules are tested first, in document order; the first match denies.
/// Allow rules are tested next; the first match allows. With no match at all
/// the path is allowed.
pub fn is_path_allowed(disallow: &[PathPattern], allow: &[PathPattern], path: &str) -> bool {
    if let Some(pattern) = disallow.iter().find(|p| p.matches(path)) {
        tracing::trace!("Path {} matched disallow pattern {}", path, pattern.as_str());
        return false;
    }

    if let Some(pattern) = allow.iter().find(|p| p.matches(path)) {
        tracing::trace!("Path {} matched allow pattern {}", path, pattern.as_str());
        return true;
    }

    true
}
