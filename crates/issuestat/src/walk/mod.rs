//! Backward pagination over issue history with incremental aggregation.
//!
//! A run fetches pages newest-to-oldest, folds every in-range record into an
//! [`Accumulator`](crate::aggregate::Accumulator), and pushes a snapshot after
//! each page. The run ends once a page crosses the window's horizon or the
//! source runs out of pages; the last snapshot is marked final.
//!
//! # Example
//!
//! ```ignore
//! use issuestat::walk::AggregationWalker;
//! use issuestat::window::{Age, Granularity, TimeWindow};
//!
//! let window = TimeWindow::ending_now(Age::parse(3, "months")?)?;
//! let outcome = AggregationWalker::new(&fetcher, "rust-lang", "rust", &window)
//!     .issues_by_grouping(Granularity::Weeks, &sink)
//!     .await?;
//! ```

mod engine;
mod progress;
mod types;

pub use engine::AggregationWalker;
pub use progress::{ProgressCallback, WalkProgress, emit};
pub use types::{
    CancelFlag, ClosedDatePolicy, DEFAULT_PAGE_SIZE, WalkError, WalkOptions, WalkOutcome,
};
