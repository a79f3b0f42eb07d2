//! Request orchestration: validation, the walk, and author history.
//!
//! [`IssueStats`] is what a front end (CLI, socket server) talks to. It
//! parses raw request parameters, runs the walker against the configured
//! source, and, for author runs, relays and extends the stored history.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

use crate::platform::PageFetcher;
use crate::snapshot::{AUTHORS_HISTORY_CHANNEL, ResultSink, SinkMessage, Snapshot};
use crate::store::{AuthorSnapshotRecord, HISTORY_TOP_N, SnapshotStore, StoreError};
use crate::walk::{
    AggregationWalker, CancelFlag, ProgressCallback, WalkError, WalkOptions, WalkOutcome,
};
use crate::window::{Age, Granularity, TimeWindow, WindowError};

/// Errors returned by [`IssueStats`] entry points.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Rejected request parameters; nothing was fetched or emitted.
    #[error(transparent)]
    Window(#[from] WindowError),

    /// The run failed after it started; an error message was already pushed.
    #[error(transparent)]
    Walk(#[from] WalkError),

    /// History could not be read or written.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Result type alias for service operations.
pub type Result<T> = std::result::Result<T, ServiceError>;

/// Parameters of an author run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorsRequest {
    pub owner: String,
    pub repo: String,
    #[serde(alias = "dataAgeValue")]
    pub age_value: i64,
    #[serde(alias = "dataAgeUnit")]
    pub age_unit: String,
    /// Reference instant of the window; the current time when absent.
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

/// Parameters of a grouping run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupingRequest {
    pub owner: String,
    pub repo: String,
    #[serde(alias = "dataAgeValue")]
    pub age_value: i64,
    #[serde(alias = "dataAgeUnit")]
    pub age_unit: String,
    #[serde(alias = "dataAgeGrouping")]
    pub grouping: String,
    #[serde(default)]
    pub now: Option<DateTime<Utc>>,
}

fn window_for(age_value: i64, age_unit: &str, now: Option<DateTime<Utc>>) -> Result<TimeWindow> {
    let age = Age::parse(age_value, age_unit)?;
    Ok(TimeWindow::new(age, now.unwrap_or_else(Utc::now))?)
}

/// Entry points for issue statistics over one page source.
pub struct IssueStats {
    fetcher: Arc<dyn PageFetcher>,
    store: Option<Arc<dyn SnapshotStore>>,
    options: WalkOptions,
    keep_top: usize,
}

impl IssueStats {
    pub fn new(fetcher: Arc<dyn PageFetcher>) -> Self {
        Self {
            fetcher,
            store: None,
            options: WalkOptions::default(),
            keep_top: HISTORY_TOP_N,
        }
    }

    /// Relay and extend author history through `store`.
    #[must_use]
    pub fn with_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    /// Entries kept per ranking when saving history.
    #[must_use]
    pub fn with_keep_top(mut self, keep_top: usize) -> Self {
        self.keep_top = keep_top;
        self
    }

    fn walker<'a>(
        &'a self,
        request_owner: &'a str,
        request_repo: &'a str,
        window: &'a TimeWindow,
        cancel: Option<CancelFlag>,
        on_progress: Option<&'a ProgressCallback>,
    ) -> AggregationWalker<'a, dyn PageFetcher> {
        let walker = AggregationWalker::new(self.fetcher.as_ref(), request_owner, request_repo, window)
            .with_options(self.options.clone())
            .with_progress(on_progress);
        match cancel {
            Some(cancel) => walker.with_cancel(cancel),
            None => walker,
        }
    }

    /// Rank authors of opened and closed issues.
    ///
    /// On completion the stored history for the repository is pushed on
    /// [`AUTHORS_HISTORY_CHANNEL`] and the new ranking is saved. History
    /// failures are reported on that channel only.
    pub async fn issues_by_authors(
        &self,
        request: &AuthorsRequest,
        sink: &dyn ResultSink,
        cancel: Option<CancelFlag>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<WalkOutcome> {
        let window = window_for(request.age_value, &request.age_unit, request.now)?;
        let outcome = self
            .walker(&request.owner, &request.repo, &window, cancel, on_progress)
            .issues_by_authors(sink)
            .await?;

        if let WalkOutcome::Completed(snapshot) = &outcome {
            self.record_history(&request.owner, &request.repo, snapshot, sink)
                .await;
        }

        Ok(outcome)
    }

    /// Count opened and closed issues per time bucket.
    ///
    /// The grouping is validated before anything is fetched or emitted.
    pub async fn issues_by_grouping(
        &self,
        request: &GroupingRequest,
        sink: &dyn ResultSink,
        cancel: Option<CancelFlag>,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<WalkOutcome> {
        let granularity = Granularity::parse(&request.grouping)?;
        let window = window_for(request.age_value, &request.age_unit, request.now)?;

        Ok(self
            .walker(&request.owner, &request.repo, &window, cancel, on_progress)
            .issues_by_grouping(granularity, sink)
            .await?)
    }

    /// Stored author rankings for a repository, newest first.
    ///
    /// Empty when no store is configured.
    pub async fn history(&self, owner: &str, repo: &str) -> Result<Vec<AuthorSnapshotRecord>> {
        match &self.store {
            Some(store) => Ok(store.query(owner, repo).await?),
            None => Ok(Vec::new()),
        }
    }

    async fn record_history(
        &self,
        owner: &str,
        repo: &str,
        snapshot: &Snapshot,
        sink: &dyn ResultSink,
    ) {
        let Some(store) = &self.store else {
            return;
        };

        let previous = match store.query(owner, repo).await {
            Ok(previous) => previous,
            Err(e) => {
                tracing::warn!(repo = %format!("{owner}/{repo}"), error = %e, "Failed to load author history");
                sink.push(AUTHORS_HISTORY_CHANNEL, SinkMessage::Error(e.to_string()));
                return;
            }
        };
        sink.push(AUTHORS_HISTORY_CHANNEL, SinkMessage::History(previous));

        let saved = AuthorSnapshotRecord::from_snapshot(owner, repo, snapshot, Utc::now(), self.keep_top);
        let result = match saved {
            Ok(record) => store.save(&record).await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            tracing::warn!(repo = %format!("{owner}/{repo}"), error = %e, "Failed to save author history");
            sink.push(AUTHORS_HISTORY_CHANNEL, SinkMessage::Error(e.to_string()));
        }
    }
}
