use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::Result;

/// Author key used for records without an attributable author.
pub const ANONYMOUS_AUTHOR: &str = "null";

/// Opaque pagination position returned by a [`PageFetcher`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PageCursor(String);

impl PageCursor {
    #[inline]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One issue as seen by the aggregation engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    /// Author login; `None` for deleted or anonymous accounts.
    pub author: Option<String>,
    /// Creation instant.
    pub created_at: DateTime<Utc>,
    /// Raw closing timestamp as delivered by the platform.
    pub closed_at: Option<String>,
}

impl IssueRecord {
    /// Parsed closing instant. Missing or unparseable values mean "not closed".
    #[must_use]
    pub fn closed_at(&self) -> Option<DateTime<Utc>> {
        self.closed_at
            .as_deref()
            .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }
}

/// Parameters of a single page request.
#[derive(Debug, Clone, Copy)]
pub struct PageRequest<'a> {
    /// Repository owner (user or organization).
    pub owner: &'a str,
    /// Repository name.
    pub repo: &'a str,
    /// Maximum number of records in the page.
    pub page_size: u32,
    /// Position to fetch strictly older records from; `None` for the newest page.
    pub cursor: Option<&'a PageCursor>,
}

impl PageRequest<'_> {
    /// Get the full name (owner/repo).
    #[inline]
    #[must_use]
    pub fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }
}

/// One page of records plus the position of the next (older) page.
#[derive(Debug, Clone, Default)]
pub struct Page {
    /// Records in a stable chronological order.
    pub records: Vec<IssueRecord>,
    /// Cursor of the next older page, if any.
    pub next_cursor: Option<PageCursor>,
    /// Whether the platform reports older pages.
    pub has_more: bool,
}

/// Source of paginated issue history.
///
/// Implementations must return records in a consistent chronological order
/// and must support fetching pages strictly older than a given cursor.
/// Retries, if any, belong to the implementation; the walker aborts a run on
/// the first error.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Fetch one page of issues.
    async fn fetch(&self, request: PageRequest<'_>) -> Result<Page>;
}

#[async_trait]
impl<F: PageFetcher + ?Sized> PageFetcher for std::sync::Arc<F> {
    async fn fetch(&self, request: PageRequest<'_>) -> Result<Page> {
        (**self).fetch(request).await
    }
}
