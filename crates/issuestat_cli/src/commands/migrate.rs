use issuestat::db;
use issuestat::migration::{Migrator, MigratorTrait};

use crate::MigrateAction;

pub(crate) async fn handle_migrate(
    action: MigrateAction,
    database_url: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let db = db::connect(database_url).await?;

    match action {
        MigrateAction::Up => {
            eprintln!("Applying migrations...");
            Migrator::up(&db, None).await?;
            eprintln!("Migrations applied successfully.");
        }
        MigrateAction::Down => {
            eprintln!("Rolling back last migration...");
            Migrator::down(&db, Some(1)).await?;
            eprintln!("Rollback complete.");
        }
        MigrateAction::Status => {
            eprintln!("Migration status:");
            Migrator::status(&db).await?;
        }
        MigrateAction::Fresh => {
            eprintln!("Dropping all tables and reapplying migrations...");
            Migrator::fresh(&db).await?;
            eprintln!("Fresh migration complete.");
        }
    }

    Ok(())
}
