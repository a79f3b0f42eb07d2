//! Progress events reported while a run walks pages.

/// Progress events emitted during a run.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum WalkProgress {
    /// About to request a page.
    FetchingPage {
        /// `owner/repo` being walked.
        repo: String,
        /// Page number (1-indexed).
        page: u32,
    },

    /// A page was fetched and folded into the aggregate.
    FetchedPage {
        repo: String,
        page: u32,
        /// Records on this page.
        count: usize,
        /// Records on this page that fell inside the window.
        in_range: usize,
        /// Running total of in-range records.
        total_in_range: usize,
    },

    /// A page contained a record older than the window; this is the last page.
    HorizonReached {
        repo: String,
        page: u32,
    },

    /// The run emitted its final snapshot.
    WalkComplete {
        repo: String,
        /// Pages processed.
        pages: u32,
        /// In-range records aggregated.
        records: usize,
    },

    /// The run stopped on cancellation.
    WalkCancelled {
        repo: String,
        pages: u32,
    },

    /// The run aborted with an error.
    WalkFailed {
        repo: String,
        page: u32,
        error: String,
    },
}

/// Callback for progress updates during a run.
pub type ProgressCallback = Box<dyn Fn(WalkProgress) + Send + Sync>;

/// Emit a progress event if a callback is provided.
#[inline]
pub fn emit(on_progress: Option<&ProgressCallback>, event: WalkProgress) {
    if let Some(cb) = on_progress {
        cb(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_emit_with_callback() {
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let callback: ProgressCallback = Box::new(move |_event| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        emit(
            Some(&callback),
            WalkProgress::FetchingPage {
                repo: "octo/widgets".to_string(),
                page: 1,
            },
        );
        emit(
            Some(&callback),
            WalkProgress::WalkComplete {
                repo: "octo/widgets".to_string(),
                pages: 1,
                records: 3,
            },
        );

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_emit_without_callback() {
        emit(
            None,
            WalkProgress::WalkCancelled {
                repo: "octo/widgets".to_string(),
                pages: 0,
            },
        );
    }

    #[test]
    fn test_walk_progress_debug() {
        let event = WalkProgress::WalkFailed {
            repo: "octo/widgets".to_string(),
            page: 2,
            error: "Authentication required".to_string(),
        };

        let debug_str = format!("{:?}", event);
        assert!(debug_str.contains("WalkFailed"));
        assert!(debug_str.contains("Authentication required"));
    }
}
