use std::sync::Arc;
use std::time::Duration;

use issuestat::github::{self, TransportKind};
use issuestat::http::reqwest_transport::ReqwestTransport;
use issuestat::walk::{WalkOptions, WalkOutcome};
use issuestat::{IssueStats, NullAuthorPolicy, PageFetcher};

use crate::WalkArgs;
use crate::config::Config;

/// Timeout for a single GitHub request.
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Walk options from config with command-line overrides applied.
pub(crate) fn walk_options(args: &WalkArgs, config: &Config) -> WalkOptions {
    let mut options = config.walk_options();
    if let Some(page_size) = args.page_size {
        options.page_size = page_size;
    }
    if args.exclude_null_authors {
        options.null_authors = NullAuthorPolicy::Exclude;
    }
    if let Some(closed_dates) = args.closed_dates {
        options.closed_dates = closed_dates;
    }
    options
}

pub(crate) fn transport_kind(args: &WalkArgs, config: &Config) -> TransportKind {
    args.transport.unwrap_or(config.github.transport)
}

/// Build the issue source for the configured GitHub API.
pub(crate) fn build_fetcher(
    args: &WalkArgs,
    config: &Config,
) -> Result<Arc<dyn PageFetcher>, Box<dyn std::error::Error>> {
    if config.github.token.is_none() {
        tracing::warn!("No GitHub token configured; the GraphQL API requires one");
    }

    let transport = Arc::new(ReqwestTransport::with_timeout(HTTP_TIMEOUT)?);
    Ok(github::fetcher_for(
        transport_kind(args, config),
        transport,
        config.github_config(),
    ))
}

/// Service over the configured source, without history.
pub(crate) fn build_stats(
    args: &WalkArgs,
    config: &Config,
) -> Result<IssueStats, Box<dyn std::error::Error>> {
    Ok(IssueStats::new(build_fetcher(args, config)?).with_options(walk_options(args, config)))
}

/// Print a one-line summary of how the walk ended.
pub(crate) fn report_outcome(args: &WalkArgs, outcome: &WalkOutcome) {
    let repo = format!("{}/{}", args.owner, args.repo);
    match outcome {
        WalkOutcome::Completed(snapshot) => {
            tracing::info!(repo = %repo, start = %snapshot.start, end = %snapshot.end, "Results complete");
        }
        WalkOutcome::Cancelled { pages } => {
            eprintln!("{repo}: cancelled after {pages} pages; results above are partial.");
        }
    }
}
