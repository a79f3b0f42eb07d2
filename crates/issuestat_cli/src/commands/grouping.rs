use std::sync::Arc;

use issuestat::{CancelFlag, GroupingRequest};

use crate::WalkArgs;
use crate::commands::shared;
use crate::config::Config;
use crate::output::JsonLinesSink;
use crate::progress::ProgressReporter;

pub(crate) async fn handle_grouping(
    args: &WalkArgs,
    grouping: &str,
    config: &Config,
    cancel: CancelFlag,
) -> Result<(), Box<dyn std::error::Error>> {
    let stats = shared::build_stats(args, config)?;

    let request = GroupingRequest {
        owner: args.owner.clone(),
        repo: args.repo.clone(),
        age_value: args.age,
        age_unit: args.unit.clone(),
        grouping: grouping.to_string(),
        now: None,
    };

    let reporter = Arc::new(ProgressReporter::new());
    let callback = reporter.as_callback();
    let sink = JsonLinesSink::new(Arc::clone(&reporter));

    let outcome = stats
        .issues_by_grouping(&request, &sink, Some(cancel), Some(&callback))
        .await;
    reporter.finish();

    shared::report_outcome(args, &outcome?);
    Ok(())
}
