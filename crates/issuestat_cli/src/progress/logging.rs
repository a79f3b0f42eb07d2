use issuestat::walk::WalkProgress;

/// Logging reporter using tracing for structured output.
pub(crate) struct LoggingReporter;

impl LoggingReporter {
    pub(crate) fn new() -> Self {
        Self
    }

    pub(crate) fn handle(&self, event: WalkProgress) {
        match event {
            WalkProgress::FetchingPage { repo, page } => {
                tracing::debug!(repo = %repo, page, "Fetching page");
            }

            WalkProgress::FetchedPage {
                repo,
                page,
                count,
                in_range,
                total_in_range,
            } => {
                tracing::info!(repo = %repo, page, count, in_range, total_in_range, "Fetched page");
            }

            WalkProgress::HorizonReached { repo, page } => {
                tracing::info!(repo = %repo, page, "Reached start of window");
            }

            WalkProgress::WalkComplete {
                repo,
                pages,
                records,
            } => {
                tracing::info!(repo = %repo, pages, records, "Walk complete");
            }

            WalkProgress::WalkCancelled { repo, pages } => {
                tracing::warn!(repo = %repo, pages, "Walk cancelled");
            }

            WalkProgress::WalkFailed { repo, page, error } => {
                tracing::error!(repo = %repo, page, error = %error, "Walk failed");
            }

            _ => {}
        }
    }
}

impl Default for LoggingReporter {
    fn default() -> Self {
        Self::new()
    }
}
