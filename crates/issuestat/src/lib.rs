//! Issuestat - incremental issue statistics for hosted repositories.
//!
//! This library walks a repository's issue history backwards, page by page,
//! and folds it into either per-author rankings or per-time-bucket counts.
//! A snapshot of the running aggregate is pushed after every page so
//! listeners can render progress long before the walk finishes.
//!
//! # Features
//!
//! - `github` - GitHub GraphQL/REST page fetchers over `reqwest`.
//! - `migrate` - Database migration support via [`connect_and_migrate`].
//! - `sqlite` - SQLite driver for the history store.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use issuestat::{ChannelSink, GroupingRequest, IssueStats};
//!
//! let stats = IssueStats::new(fetcher);
//! let (sink, mut rx) = ChannelSink::new();
//! let request = GroupingRequest {
//!     owner: "rust-lang".into(),
//!     repo: "rust".into(),
//!     age_value: 3,
//!     age_unit: "months".into(),
//!     grouping: "weeks".into(),
//!     now: None,
//! };
//! stats.issues_by_grouping(&request, &sink, None, None).await?;
//! ```

pub mod aggregate;
pub mod db;
pub mod entity;
pub mod http;
pub mod platform;
pub mod service;
pub mod snapshot;
pub mod store;
pub mod walk;
pub mod window;

#[cfg(feature = "github")]
pub mod github;

#[cfg(feature = "migrate")]
pub mod migration;

pub use aggregate::{
    Accumulator, AggregateError, AuthorCount, AuthorTable, BucketCount, BucketSeries,
    NullAuthorPolicy,
};
pub use db::connect;
#[cfg(feature = "migrate")]
pub use db::connect_and_migrate;
pub use platform::{IssueRecord, Page, PageCursor, PageFetcher, PageRequest, PlatformError};
pub use service::{AuthorsRequest, GroupingRequest, IssueStats, ServiceError};
pub use snapshot::{ChannelSink, ResultSink, SinkEnvelope, SinkMessage, Snapshot};
pub use store::{
    AuthorSnapshotRecord, DbSnapshotStore, MemorySnapshotStore, SnapshotStore, StoreError,
};
pub use walk::{
    AggregationWalker, CancelFlag, ClosedDatePolicy, WalkError, WalkOptions, WalkOutcome,
};
pub use window::{Age, Granularity, TimeWindow, WindowError};
