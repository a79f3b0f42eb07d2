use std::io::Write;

use issuestat::{DbSnapshotStore, SnapshotStore};

/// Print stored author rankings for a repository, one JSON object per line.
pub(crate) async fn handle_history(
    owner: &str,
    repo: &str,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = issuestat::connect_and_migrate(database_url).await?;
    let records = DbSnapshotStore::new(db).query(owner, repo).await?;

    if records.is_empty() {
        eprintln!("No stored rankings for {owner}/{repo}.");
        return Ok(());
    }

    let mut stdout = std::io::stdout().lock();
    for record in &records {
        writeln!(stdout, "{}", serde_json::to_string(record)?)?;
    }

    Ok(())
}
