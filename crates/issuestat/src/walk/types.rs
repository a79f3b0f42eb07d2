use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::aggregate::{AggregateError, NullAuthorPolicy};
use crate::platform::PlatformError;
use crate::snapshot::Snapshot;

/// Default number of records requested per page.
pub const DEFAULT_PAGE_SIZE: u32 = 50;

/// Which closures count toward closed totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClosedDatePolicy {
    /// Any valid closing instant up to the reference instant.
    #[default]
    Any,
    /// Only closing instants inside the window.
    WithinWindow,
}

impl std::str::FromStr for ClosedDatePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "any" => Ok(Self::Any),
            "within_window" | "within-window" => Ok(Self::WithinWindow),
            other => Err(format!("unknown closed-date policy: {other}")),
        }
    }
}

/// Per-run tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkOptions {
    /// Records per page; clamped to at least 1.
    pub page_size: u32,
    /// Applies to author runs only.
    pub null_authors: NullAuthorPolicy,
    pub closed_dates: ClosedDatePolicy,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            null_authors: NullAuthorPolicy::default(),
            closed_dates: ClosedDatePolicy::default(),
        }
    }
}

/// How a run ended when it did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkOutcome {
    /// The run terminated normally; carries the final snapshot.
    Completed(Snapshot),
    /// The run was cancelled between pages; no final snapshot was emitted.
    Cancelled {
        /// Pages processed before cancellation.
        pages: u32,
    },
}

impl WalkOutcome {
    /// The final snapshot, if the run completed.
    #[must_use]
    pub fn snapshot(&self) -> Option<&Snapshot> {
        match self {
            Self::Completed(snapshot) => Some(snapshot),
            Self::Cancelled { .. } => None,
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }
}

/// Errors that abort a run.
#[derive(Debug, Error)]
pub enum WalkError {
    /// The page source failed.
    #[error("Failed to fetch issues: {0}")]
    Fetch(#[from] PlatformError),

    /// A record could not be folded into the aggregate.
    #[error("Aggregation failed: {0}")]
    Aggregate(#[from] AggregateError),
}

/// Cooperative cancellation signal, checked between pages.
///
/// Clones share the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = WalkOptions::default();
        assert_eq!(options.page_size, 50);
        assert_eq!(options.null_authors, NullAuthorPolicy::Include);
        assert_eq!(options.closed_dates, ClosedDatePolicy::Any);
    }

    #[test]
    fn test_cancel_flag_is_shared_between_clones() {
        let flag = CancelFlag::new();
        let observer = flag.clone();
        assert!(!observer.is_cancelled());
        flag.cancel();
        assert!(observer.is_cancelled());
    }

    #[test]
    fn test_closed_date_policy_from_str() {
        assert_eq!("any".parse(), Ok(ClosedDatePolicy::Any));
        assert_eq!("within_window".parse(), Ok(ClosedDatePolicy::WithinWindow));
        assert!("sometimes".parse::<ClosedDatePolicy>().is_err());
    }

    #[test]
    fn test_walk_error_wraps_sources() {
        let err = WalkError::from(PlatformError::AuthRequired);
        assert_eq!(err.to_string(), "Failed to fetch issues: Authentication required");

        let err = WalkError::from(AggregateError::BucketNotFound {
            key: "2024-01".to_string(),
        });
        assert!(err.to_string().contains("2024-01"));
    }
}
