//! The page loop shared by author and grouping runs.

use chrono::{DateTime, Utc};

use super::progress::{ProgressCallback, WalkProgress, emit};
use super::types::{CancelFlag, ClosedDatePolicy, WalkError, WalkOptions, WalkOutcome};
use crate::aggregate::{Accumulator, AggregateError, AuthorTable, BucketSeries};
use crate::platform::{IssueRecord, Page, PageCursor, PageFetcher, PageRequest};
use crate::snapshot::{AUTHORS_CHANNEL, GROUPING_CHANNEL, ResultSink, SnapshotEmitter};
use crate::window::{Granularity, Placement, TimeWindow};

/// What one page contributed.
#[derive(Debug, Default)]
struct PageTally {
    in_range: usize,
    crossed_horizon: bool,
}

/// Walks one repository's issue history backwards over a fixed window.
///
/// The walker owns no aggregate itself; each run is handed a fresh
/// [`Accumulator`] and [`SnapshotEmitter`], so one walker can serve several
/// sequential runs over the same window.
pub struct AggregationWalker<'a, F: PageFetcher + ?Sized> {
    fetcher: &'a F,
    owner: &'a str,
    repo: &'a str,
    window: &'a TimeWindow,
    options: WalkOptions,
    cancel: Option<CancelFlag>,
    on_progress: Option<&'a ProgressCallback>,
}

impl<'a, F: PageFetcher + ?Sized> AggregationWalker<'a, F> {
    pub fn new(fetcher: &'a F, owner: &'a str, repo: &'a str, window: &'a TimeWindow) -> Self {
        Self {
            fetcher,
            owner,
            repo,
            window,
            options: WalkOptions::default(),
            cancel: None,
            on_progress: None,
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: WalkOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = Some(cancel);
        self
    }

    #[must_use]
    pub fn with_progress(mut self, on_progress: Option<&'a ProgressCallback>) -> Self {
        self.on_progress = on_progress;
        self
    }

    #[must_use]
    pub fn options(&self) -> &WalkOptions {
        &self.options
    }

    fn full_name(&self) -> String {
        format!("{}/{}", self.owner, self.repo)
    }

    fn is_cancelled(&self) -> bool {
        self.cancel.as_ref().is_some_and(CancelFlag::is_cancelled)
    }

    /// Count issues per author on [`AUTHORS_CHANNEL`].
    pub async fn issues_by_authors(
        &self,
        sink: &dyn ResultSink,
    ) -> Result<WalkOutcome, WalkError> {
        let mut table = AuthorTable::new(self.options.null_authors);
        let emitter = SnapshotEmitter::new(self.window, AUTHORS_CHANNEL, sink);
        self.run(&mut table, &emitter).await
    }

    /// Count issues per time bucket on [`GROUPING_CHANNEL`].
    pub async fn issues_by_grouping(
        &self,
        granularity: Granularity,
        sink: &dyn ResultSink,
    ) -> Result<WalkOutcome, WalkError> {
        let mut series = BucketSeries::seed(self.window, granularity);
        let emitter = SnapshotEmitter::new(self.window, GROUPING_CHANNEL, sink);
        self.run(&mut series, &emitter).await
    }

    /// Drive the fetch/fold/emit loop until the horizon, the end of history,
    /// cancellation, or the first error.
    ///
    /// A non-final snapshot is emitted after every page; on normal
    /// termination a final snapshot follows. Errors are pushed once on the
    /// emitter's channel before being returned.
    pub async fn run<A: Accumulator + ?Sized>(
        &self,
        accumulator: &mut A,
        emitter: &SnapshotEmitter<'_>,
    ) -> Result<WalkOutcome, WalkError> {
        let repo = self.full_name();
        let page_size = self.options.page_size.max(1);
        let mut cursor: Option<PageCursor> = None;
        let mut pages = 0u32;
        let mut records = 0usize;

        tracing::info!(
            repo = %repo,
            channel = emitter.channel(),
            start = %self.window.start_label(),
            end = %self.window.end_label(),
            "Starting issue walk"
        );

        loop {
            if self.is_cancelled() {
                tracing::info!(repo = %repo, pages, "Issue walk cancelled");
                emit(
                    self.on_progress,
                    WalkProgress::WalkCancelled {
                        repo: repo.clone(),
                        pages,
                    },
                );
                return Ok(WalkOutcome::Cancelled { pages });
            }

            let page_number = pages + 1;
            emit(
                self.on_progress,
                WalkProgress::FetchingPage {
                    repo: repo.clone(),
                    page: page_number,
                },
            );

            let request = PageRequest {
                owner: self.owner,
                repo: self.repo,
                page_size,
                cursor: cursor.as_ref(),
            };
            let page = match self.fetcher.fetch(request).await {
                Ok(page) => page,
                Err(e) => return Err(self.fail(emitter, &repo, page_number, e.into())),
            };
            pages = page_number;

            let tally = match self.fold_page(accumulator, &page) {
                Ok(tally) => tally,
                Err(e) => return Err(self.fail(emitter, &repo, page_number, e.into())),
            };
            records += tally.in_range;

            tracing::debug!(
                repo = %repo,
                page = page_number,
                count = page.records.len(),
                in_range = tally.in_range,
                "Folded page"
            );
            emit(
                self.on_progress,
                WalkProgress::FetchedPage {
                    repo: repo.clone(),
                    page: page_number,
                    count: page.records.len(),
                    in_range: tally.in_range,
                    total_in_range: records,
                },
            );

            emitter.emit(accumulator, false);

            if tally.crossed_horizon {
                emit(
                    self.on_progress,
                    WalkProgress::HorizonReached {
                        repo: repo.clone(),
                        page: page_number,
                    },
                );
            }

            let next = match page.next_cursor {
                Some(next) if page.has_more && !tally.crossed_horizon => next,
                _ => break,
            };
            cursor = Some(next);
        }

        let snapshot = emitter.emit(accumulator, true);

        tracing::info!(repo = %repo, pages, records, "Issue walk complete");
        emit(
            self.on_progress,
            WalkProgress::WalkComplete {
                repo,
                pages,
                records,
            },
        );

        Ok(WalkOutcome::Completed(snapshot))
    }

    /// Fold every record of a page; out-of-range records never stop the drain.
    fn fold_page<A: Accumulator + ?Sized>(
        &self,
        accumulator: &mut A,
        page: &Page,
    ) -> Result<PageTally, AggregateError> {
        let mut tally = PageTally::default();

        for record in &page.records {
            match self.window.classify(record.created_at) {
                Placement::BeforeWindow => {
                    tally.crossed_horizon = true;
                    continue;
                }
                Placement::AfterNow => {
                    tracing::trace!(created_at = %record.created_at, "Skipping record newer than run start");
                    continue;
                }
                Placement::InRange => {}
            }

            accumulator.record_opened(record)?;
            tally.in_range += 1;

            if let Some(closed_at) = self.counted_closure(record) {
                accumulator.record_closed(record, closed_at)?;
            }
        }

        Ok(tally)
    }

    /// Closing instant of `record` if it counts under the run's policy.
    fn counted_closure(&self, record: &IssueRecord) -> Option<DateTime<Utc>> {
        let closed_at = record.closed_at()?;
        if closed_at > self.window.now() {
            return None;
        }
        match self.options.closed_dates {
            ClosedDatePolicy::Any => Some(closed_at),
            ClosedDatePolicy::WithinWindow => {
                (closed_at >= self.window.oldest()).then_some(closed_at)
            }
        }
    }

    fn fail(
        &self,
        emitter: &SnapshotEmitter<'_>,
        repo: &str,
        page: u32,
        error: WalkError,
    ) -> WalkError {
        tracing::warn!(repo = %repo, page, error = %error, "Issue walk failed");
        emitter.emit_error(error.to_string());
        emit(
            self.on_progress,
            WalkProgress::WalkFailed {
                repo: repo.to_string(),
                page,
                error: error.to_string(),
            },
        );
        error
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::aggregate::NullAuthorPolicy;
    use crate::platform::{self, PlatformError};
    use crate::snapshot::{SinkMessage, Snapshot};
    use crate::window::Age;

    /// Serves pre-built pages in order and records the cursors it was asked for.
    #[derive(Default)]
    struct ScriptedFetcher {
        pages: Mutex<VecDeque<platform::Result<Page>>>,
        cursors: Mutex<Vec<Option<String>>>,
    }

    impl ScriptedFetcher {
        fn new(pages: Vec<platform::Result<Page>>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                cursors: Mutex::default(),
            }
        }

        fn calls(&self) -> usize {
            self.cursors.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedFetcher {
        async fn fetch(&self, request: PageRequest<'_>) -> platform::Result<Page> {
            self.cursors
                .lock()
                .unwrap()
                .push(request.cursor.map(|c| c.as_str().to_string()));
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(PlatformError::internal("script exhausted")))
        }
    }

    #[derive(Default)]
    struct Collected(Mutex<Vec<(String, SinkMessage)>>);

    impl ResultSink for Collected {
        fn push(&self, channel: &str, message: SinkMessage) {
            self.0.lock().unwrap().push((channel.to_string(), message));
        }
    }

    impl Collected {
        fn snapshots(&self) -> Vec<Snapshot> {
            self.0
                .lock()
                .unwrap()
                .iter()
                .filter_map(|(_, m)| match m {
                    SinkMessage::Data(s) => Some(s.clone()),
                    _ => None,
                })
                .collect()
        }

        fn errors(&self) -> usize {
            self.0.lock().unwrap().iter().filter(|(_, m)| m.is_error()).count()
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap()
    }

    fn window() -> TimeWindow {
        TimeWindow::new(Age::parse(1, "months").unwrap(), now()).unwrap()
    }

    fn record(author: Option<&str>, days_ago: i64, closed_days_ago: Option<i64>) -> IssueRecord {
        IssueRecord {
            author: author.map(String::from),
            created_at: now() - Duration::days(days_ago),
            closed_at: closed_days_ago.map(|d| (now() - Duration::days(d)).to_rfc3339()),
        }
    }

    fn page(records: Vec<IssueRecord>, next: Option<&str>) -> platform::Result<Page> {
        Ok(Page {
            records,
            has_more: next.is_some(),
            next_cursor: next.map(PageCursor::new),
        })
    }

    #[tokio::test]
    async fn test_follows_cursors_until_history_ends() {
        let fetcher = ScriptedFetcher::new(vec![
            page(vec![record(Some("a"), 1, None)], Some("c1")),
            page(vec![record(Some("b"), 2, None)], Some("c2")),
            page(vec![record(Some("a"), 3, Some(1))], None),
        ]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap();

        assert_eq!(
            *fetcher.cursors.lock().unwrap(),
            vec![None, Some("c1".to_string()), Some("c2".to_string())]
        );

        let snapshots = sink.snapshots();
        assert_eq!(snapshots.len(), 4);
        assert!(snapshots[..3].iter().all(|s| !s.is_final));
        assert!(snapshots[3].is_final);

        let final_snapshot = outcome.snapshot().unwrap();
        let authors = final_snapshot.authors().unwrap();
        assert_eq!(authors.author_count, 2);
        assert_eq!(authors.total_opened, 3);
        assert_eq!(authors.total_closed, 1);
        assert_eq!(authors.top_opened[0].author, "a");
    }

    #[tokio::test]
    async fn test_skips_records_created_after_run_start() {
        let fetcher = ScriptedFetcher::new(vec![page(
            vec![record(Some("future"), -1, None), record(Some("a"), 1, None)],
            None,
        )]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap();

        let authors = outcome.snapshot().unwrap().authors().unwrap().clone();
        assert_eq!(authors.author_count, 1);
        assert_eq!(authors.total_opened, 1);
    }

    #[tokio::test]
    async fn test_closures_after_run_start_are_not_counted() {
        let fetcher = ScriptedFetcher::new(vec![page(
            vec![record(Some("a"), 3, Some(-2)), record(Some("a"), 3, Some(1))],
            None,
        )]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap();

        let authors = outcome.snapshot().unwrap().authors().unwrap().clone();
        assert_eq!(authors.total_opened, 2);
        assert_eq!(authors.total_closed, 1);
    }

    #[tokio::test]
    async fn test_unparseable_closed_at_counts_as_open() {
        let mut broken = record(Some("a"), 2, None);
        broken.closed_at = Some("not a date".to_string());
        let fetcher = ScriptedFetcher::new(vec![page(vec![broken], None)]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap();

        let authors = outcome.snapshot().unwrap().authors().unwrap().clone();
        assert_eq!(authors.total_opened, 1);
        assert_eq!(authors.total_closed, 0);
        assert_eq!(sink.errors(), 0);
    }

    #[test]
    fn test_closed_date_policy_bounds_closures() {
        let fetcher = ScriptedFetcher::default();
        let window = window();
        let early_close = IssueRecord {
            author: None,
            created_at: now() - Duration::days(5),
            closed_at: Some((window.oldest() - Duration::days(1)).to_rfc3339()),
        };

        let walker = AggregationWalker::new(&fetcher, "o", "r", &window);
        assert!(walker.counted_closure(&early_close).is_some());

        let walker = walker.with_options(WalkOptions {
            closed_dates: ClosedDatePolicy::WithinWindow,
            ..WalkOptions::default()
        });
        assert!(walker.counted_closure(&early_close).is_none());

        let in_window = record(None, 5, Some(2));
        assert!(walker.counted_closure(&in_window).is_some());
    }

    #[tokio::test]
    async fn test_excluded_null_authors_are_not_ranked() {
        let fetcher = ScriptedFetcher::new(vec![page(
            vec![record(None, 1, None), record(Some("a"), 2, None)],
            None,
        )]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .with_options(WalkOptions {
                null_authors: NullAuthorPolicy::Exclude,
                ..WalkOptions::default()
            })
            .issues_by_authors(&sink)
            .await
            .unwrap();

        let authors = outcome.snapshot().unwrap().authors().unwrap().clone();
        assert_eq!(authors.author_count, 1);
        assert_eq!(authors.top_opened[0].author, "a");
    }

    #[tokio::test]
    async fn test_has_more_without_cursor_terminates() {
        let fetcher = ScriptedFetcher::new(vec![Ok(Page {
            records: vec![record(Some("a"), 1, None)],
            next_cursor: None,
            has_more: true,
        })]);
        let sink = Collected::default();
        let window = window();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap();

        assert!(!outcome.is_cancelled());
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn test_pre_cancelled_run_fetches_nothing() {
        let fetcher = ScriptedFetcher::new(vec![page(vec![], None)]);
        let sink = Collected::default();
        let window = window();
        let cancel = CancelFlag::new();
        cancel.cancel();

        let outcome = AggregationWalker::new(&fetcher, "o", "r", &window)
            .with_cancel(cancel)
            .issues_by_grouping(Granularity::Days, &sink)
            .await
            .unwrap();

        assert_eq!(outcome, WalkOutcome::Cancelled { pages: 0 });
        assert_eq!(fetcher.calls(), 0);
        assert!(sink.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_progress_events_follow_the_walk() {
        let fetcher = ScriptedFetcher::new(vec![
            page(vec![record(Some("a"), 1, None)], Some("c1")),
            page(vec![record(Some("a"), 2, None), record(Some("b"), 90, None)], Some("c2")),
        ]);
        let sink = Collected::default();
        let window = window();

        let events = Arc::new(Mutex::new(Vec::new()));
        let events_clone = Arc::clone(&events);
        let callback: ProgressCallback = Box::new(move |event| {
            let name = match event {
                WalkProgress::FetchingPage { .. } => "fetching",
                WalkProgress::FetchedPage { .. } => "fetched",
                WalkProgress::HorizonReached { .. } => "horizon",
                WalkProgress::WalkComplete { .. } => "complete",
                WalkProgress::WalkCancelled { .. } => "cancelled",
                WalkProgress::WalkFailed { .. } => "failed",
            };
            events_clone.lock().unwrap().push(name);
        });

        AggregationWalker::new(&fetcher, "o", "r", &window)
            .with_progress(Some(&callback))
            .issues_by_grouping(Granularity::Weeks, &sink)
            .await
            .unwrap();

        assert_eq!(
            *events.lock().unwrap(),
            vec!["fetching", "fetched", "fetching", "fetched", "horizon", "complete"]
        );
        assert_eq!(fetcher.calls(), 2);
    }

    #[tokio::test]
    async fn test_fetch_error_is_pushed_once_and_returned() {
        let fetcher = ScriptedFetcher::new(vec![Err(PlatformError::AuthRequired)]);
        let sink = Collected::default();
        let window = window();

        let err = AggregationWalker::new(&fetcher, "o", "r", &window)
            .issues_by_authors(&sink)
            .await
            .unwrap_err();

        assert!(matches!(err, WalkError::Fetch(PlatformError::AuthRequired)));
        assert_eq!(sink.errors(), 1);
        assert!(sink.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_closure_outside_seeded_buckets_aborts_grouping_run() {
        // Opened inside the window, closed two months before it starts.
        let fetcher =
            ScriptedFetcher::new(vec![page(vec![record(Some("a"), 10, Some(60))], None)]);
        let sink = Collected::default();
        let window = window();

        let err = AggregationWalker::new(&fetcher, "o", "r", &window)
            .with_options(WalkOptions {
                closed_dates: ClosedDatePolicy::Any,
                ..WalkOptions::default()
            })
            .issues_by_grouping(Granularity::Months, &sink)
            .await
            .unwrap_err();

        match err {
            WalkError::Aggregate(AggregateError::BucketNotFound { key }) => {
                assert_eq!(key, "2024-04");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(sink.errors(), 1);
        assert!(sink.snapshots().is_empty());
        assert_eq!(fetcher.calls(), 1);
    }
}
