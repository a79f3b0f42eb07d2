//! Boundary between the aggregation engine and issue-tracker clients.
//!
//! This module defines the `PageFetcher` trait that every paginated source
//! implements, plus the record and error types it exchanges with the walker.
//!
//! # Example
//!
//! ```ignore
//! use issuestat::platform::{PageFetcher, PageRequest};
//!
//! async fn newest<F: PageFetcher>(fetcher: &F) -> Result<usize, PlatformError> {
//!     let page = fetcher
//!         .fetch(PageRequest { owner: "rust-lang", repo: "rust", page_size: 50, cursor: None })
//!         .await?;
//!     Ok(page.records.len())
//! }
//! ```

mod errors;
mod types;

pub use errors::{PlatformError, Result, short_error_message};
pub use types::{ANONYMOUS_AUTHOR, IssueRecord, Page, PageCursor, PageFetcher, PageRequest};
