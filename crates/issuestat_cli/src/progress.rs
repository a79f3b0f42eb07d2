//! Progress reporting for issue walks.
//!
//! This module provides two modes of progress reporting:
//! - Interactive mode (TTY): an animated spinner using indicatif
//! - Logging mode (non-TTY): structured logging using tracing

mod interactive;
mod logging;

use std::sync::Arc;

use console::Term;
use issuestat::walk::{ProgressCallback, WalkProgress};

pub(crate) use interactive::InteractiveReporter;
pub(crate) use logging::LoggingReporter;

/// Progress reporter that handles both interactive and logging modes.
pub(crate) enum ProgressReporter {
    /// Interactive spinner for TTY.
    Interactive(InteractiveReporter),
    /// Structured logging for non-TTY (CI, pipes).
    Logging(LoggingReporter),
}

impl ProgressReporter {
    /// Create a new progress reporter, auto-detecting TTY mode.
    pub(crate) fn new() -> Self {
        if Term::stdout().is_term() {
            Self::Interactive(InteractiveReporter::new())
        } else {
            Self::Logging(LoggingReporter::new())
        }
    }

    /// Handle a progress event.
    pub(crate) fn handle(&self, event: WalkProgress) {
        match self {
            Self::Interactive(r) => r.handle(event),
            Self::Logging(r) => r.handle(event),
        }
    }

    /// Convert to a ProgressCallback for the library.
    pub(crate) fn as_callback(self: &Arc<Self>) -> ProgressCallback {
        let reporter = Arc::clone(self);
        Box::new(move |event| {
            reporter.handle(event);
        })
    }

    /// Run `f` with the spinner hidden so terminal output does not tear.
    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        match self {
            Self::Interactive(r) => r.suspend(f),
            Self::Logging(_) => f(),
        }
    }

    /// Finish the spinner (interactive mode only).
    pub(crate) fn finish(&self) {
        if let Self::Interactive(r) = self {
            r.finish();
        }
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_logging_reporter_accepts_every_event() {
        let reporter = Arc::new(ProgressReporter::Logging(LoggingReporter::new()));
        let callback = reporter.as_callback();

        callback(WalkProgress::FetchingPage {
            repo: "octo/widgets".to_string(),
            page: 1,
        });
        callback(WalkProgress::FetchedPage {
            repo: "octo/widgets".to_string(),
            page: 1,
            count: 50,
            in_range: 50,
            total_in_range: 50,
        });
        callback(WalkProgress::HorizonReached {
            repo: "octo/widgets".to_string(),
            page: 1,
        });
        callback(WalkProgress::WalkComplete {
            repo: "octo/widgets".to_string(),
            pages: 1,
            records: 50,
        });

        assert_eq!(reporter.suspend(|| 7), 7);
        reporter.finish();
    }

    #[test]
    fn test_interactive_reporter_survives_full_lifecycle() {
        let reporter = InteractiveReporter::hidden();
        reporter.handle(WalkProgress::FetchingPage {
            repo: "octo/widgets".to_string(),
            page: 1,
        });
        reporter.handle(WalkProgress::WalkFailed {
            repo: "octo/widgets".to_string(),
            page: 1,
            error: "Authentication required".to_string(),
        });
        reporter.handle(WalkProgress::FetchingPage {
            repo: "octo/widgets".to_string(),
            page: 1,
        });
        reporter.handle(WalkProgress::WalkCancelled {
            repo: "octo/widgets".to_string(),
            pages: 1,
        });
        reporter.finish();
    }
}
