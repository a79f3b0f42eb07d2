use std::sync::Mutex;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use issuestat::walk::WalkProgress;

/// Interactive progress reporter using indicatif.
///
/// One spinner per walk, created on the first page and finished when the
/// walk completes, fails, or is cancelled.
pub(crate) struct InteractiveReporter {
    bar: Mutex<Option<ProgressBar>>,
    hidden: bool,
}

impl InteractiveReporter {
    pub(crate) fn new() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: false,
        }
    }

    /// A reporter that never draws.
    #[cfg(test)]
    pub(crate) fn hidden() -> Self {
        Self {
            bar: Mutex::new(None),
            hidden: true,
        }
    }

    fn spinner(&self, repo: &str) -> ProgressBar {
        let bar = if self.hidden {
            ProgressBar::with_draw_target(None, ProgressDrawTarget::hidden())
        } else {
            ProgressBar::new_spinner()
        };
        bar.set_style(Self::spinner_style());
        bar.set_prefix(repo.to_string());
        bar.enable_steady_tick(Duration::from_millis(100));
        bar
    }

    pub(crate) fn handle(&self, event: WalkProgress) {
        let Ok(mut slot) = self.bar.lock() else {
            return;
        };

        match event {
            WalkProgress::FetchingPage { repo, page } => {
                let bar = slot.get_or_insert_with(|| self.spinner(&repo));
                bar.set_message(format!("Fetching page {page}..."));
            }

            WalkProgress::FetchedPage {
                page,
                total_in_range,
                ..
            } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(format!("Page {page} ({total_in_range} issues in window)"));
                }
            }

            WalkProgress::HorizonReached { page, .. } => {
                if let Some(bar) = slot.as_ref() {
                    bar.set_message(format!("Reached start of window on page {page}"));
                }
            }

            WalkProgress::WalkComplete { pages, records, .. } => {
                if let Some(bar) = slot.take() {
                    bar.set_style(Self::done_style());
                    bar.finish_with_message(format!("{records} issues over {pages} pages"));
                }
            }

            WalkProgress::WalkCancelled { pages, .. } => {
                if let Some(bar) = slot.take() {
                    bar.set_style(Self::done_style());
                    bar.abandon_with_message(format!("Cancelled after {pages} pages"));
                }
            }

            WalkProgress::WalkFailed { error, .. } => {
                if let Some(bar) = slot.take() {
                    bar.set_style(Self::done_style());
                    bar.abandon_with_message(format!("Failed: {error}"));
                }
            }

            _ => {}
        }
    }

    pub(crate) fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        let bar = self.bar.lock().ok().and_then(|slot| slot.clone());
        match bar {
            Some(bar) => bar.suspend(f),
            None => f(),
        }
    }

    pub(crate) fn finish(&self) {
        if let Ok(mut slot) = self.bar.lock()
            && let Some(bar) = slot.take()
        {
            bar.finish_and_clear();
        }
    }

    fn spinner_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
    }

    fn done_style() -> ProgressStyle {
        ProgressStyle::default_spinner()
            .template("{prefix:.bold.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
    }
}

impl Default for InteractiveReporter {
    fn default() -> Self {
        Self::new()
    }
}
