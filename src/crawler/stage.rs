//! Processing stages of a single frontier item
//!
//! Every URL popped from the frontier walks the same path:
//! `Pending -> PolicyChecking -> (Skipped | Fetching) -> Parsing -> Classifying
//! -> Persisting -> Done`. A fetch failure ends the walk in `Failed`.

use std::fmt;

/// Where a frontier item is in its crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlStage {
    // ===== Active Stages =====
    /// Popped from the frontier, not looked at yet
    Pending,

    /// Consulting the host's robots.txt policy
    PolicyChecking,

    /// Waiting out the politeness delay and downloading the page
    Fetching,

    /// Turning the response body into title, description and links
    Parsing,

    /// Splitting links by host and filtering same-host links
    Classifying,

    /// Writing the page record and new frontier entries
    Persisting,

    // ===== Terminal Stages =====
    /// Fully processed
    Done,

    /// Disallowed by robots.txt; nothing persisted
    Skipped,

    /// Fetch or parse failed; nothing persisted
    Failed,
}

impl CrawlStage {
    /// Returns true if no further processing happens after this stage
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Skipped | Self::Failed)
    }

    /// Returns true if moving from `self` to `next` is a legal step
    pub fn can_transition_to(&self, next: CrawlStage) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::PolicyChecking)
                | (Self::PolicyChecking, Self::Skipped)
                | (Self::PolicyChecking, Self::Fetching)
                | (Self::Fetching, Self::Parsing)
                | (Self::Fetching, Self::Failed)
                | (Self::Parsing, Self::Classifying)
                | (Self::Classifying, Self::Persisting)
                | (Self::Persisting, Self::Done)
        )
    }

    /// Moves to `next`, logging the step
    pub fn advance(&mut self, next: CrawlStage, url: &str) {
        debug_assert!(
            self.can_transition_to(next),
            "illegal stage transition {} -> {}",
            self,
            next
        );
        tracing::trace!("{}: {} -> {}", url, self, next);
        *self = next;
    }

    /// Short lowercase name used in logs
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::PolicyChecking => "policy_checking",
            Self::Fetching => "fetching",
            Self::Parsing => "parsing",
            Self::Classifying => "classifying",
            Self::Persisting => "persisting",
            Self::Done => "done",
            Self::Skipped => "skipped",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for CrawlStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
