use std::sync::Arc;

use issuestat::{AuthorsRequest, CancelFlag, DbSnapshotStore};

use crate::WalkArgs;
use crate::commands::shared;
use crate::config::Config;
use crate::output::JsonLinesSink;
use crate::progress::ProgressReporter;

/// Rank issue authors; history is read and extended when `history_db` is set.
pub(crate) async fn handle_authors(
    args: &WalkArgs,
    config: &Config,
    history_db: Option<&str>,
    cancel: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut stats = shared::build_stats(args, config)?;

    if let Some(database_url) = history_db {
        let db = issuestat::connect_and_migrate(database_url).await?;
        stats = stats
            .with_store(Arc::new(DbSnapshotStore::new(db)))
            .with_keep_top(config.history.keep_top);
    }

    let request = AuthorsRequest {
        owner: args.owner.clone(),
        repo: args.repo.clone(),
        age_value: args.age,
        age_unit: args.unit.clone(),
        now: None,
    };

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let sink = JsonLinesSink::new(Arc::clone(&reporter));

    let outcome = stats
        .issues_by_authors(&request, &sink, Some(cancel), Some(&callback))
        .await;
    reporter.finish();

    shared::report_outcome(args, &outcome?);
    Ok(())
}
