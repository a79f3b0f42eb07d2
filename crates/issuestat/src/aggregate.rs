//! Running aggregates folded from in-range records.
//!
//! Both aggregation shapes implement [`Accumulator`], which is all the walker
//! needs: it never knows whether it is counting per author or per bucket.
//!
//! - [`AuthorTable`] - per-author counts, discovered lazily, ranked top-K
//! - [`BucketSeries`] - per-time-bucket counts, seeded before the walk

mod authors;
mod buckets;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::platform::IssueRecord;
use crate::snapshot::SnapshotPayload;

pub use authors::{
    AuthorCount, AuthorMetric, AuthorTable, NullAuthorPolicy, TOP_AUTHOR_PERCENT, top_k_for,
};
pub use buckets::{BucketCount, BucketSeries};

/// Errors raised while folding a record into an aggregate.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AggregateError {
    /// A record was routed to a bucket that was never seeded.
    ///
    /// This means window classification and bucket seeding disagree, which is
    /// a bug rather than bad input.
    #[error("No bucket seeded for key {key}")]
    BucketNotFound { key: String },
}

/// Capability shared by the per-author and per-bucket aggregates.
pub trait Accumulator: Send {
    /// Count an in-range record as opened.
    fn record_opened(&mut self, record: &IssueRecord) -> Result<(), AggregateError>;

    /// Count an in-range record as closed at `closed_at`.
    fn record_closed(
        &mut self,
        record: &IssueRecord,
        closed_at: DateTime<Utc>,
    ) -> Result<(), AggregateError>;

    /// Copy out the mode-specific part of a snapshot.
    fn payload(&self) -> SnapshotPayload;
}
