//! issuestat CLI - issue statistics for GitHub repositories.

mod commands;
mod config;
mod output;
mod progress;
mod shutdown;

use clap::{Args, Parser, Subcommand};
use console::Term;
use issuestat::github::TransportKind;
use issuestat::walk::ClosedDatePolicy;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "issuestat")]
#[command(version)]
#[command(about = "Issue statistics for GitHub repositories")]
#[command(
    long_about = "issuestat walks a repository's issue history from newest to oldest and \
streams partial results as each page arrives. It ranks the most active issue authors or \
counts opened and closed issues per day, week, month, or year, and keeps a history of \
author rankings in a local database."
)]
#[command(after_long_help = r#"EXAMPLES
    Rank issue authors over the last 3 months:
        $ issuestat authors rust-lang rust

    Count issues per week over the last 6 months:
        $ issuestat grouping rust-lang rust --age 6 --unit months --grouping weeks

    Show stored author rankings:
        $ issuestat history rust-lang rust

    Generate shell completions:
        $ issuestat completions bash > ~/.local/share/bash-completion/completions/issuestat

OUTPUT
    Every result is printed to stdout as one JSON object per line, tagged with
    the channel it belongs to. Partial snapshots carry "final": false.

CONFIGURATION
    issuestat reads configuration from:
      1. ~/.config/issuestat/config.toml (or $XDG_CONFIG_HOME/issuestat/config.toml)
      2. ./issuestat.toml
      3. Environment variables (ISSUESTAT_* prefix, e.g., ISSUESTAT_GITHUB_TOKEN)
      4. .env file in current directory

ENVIRONMENT VARIABLES
    ISSUESTAT_DATABASE_URL       Database connection string (default: ~/.local/state/issuestat/issuestat.db)
    ISSUESTAT_GITHUB_TOKEN       GitHub personal access token (falls back to GITHUB_TOKEN)
    ISSUESTAT_GITHUB_TRANSPORT   "graphql" (default) or "rest"
    ISSUESTAT_WALK_PAGE_SIZE     Issues per request (default: 50)
"#)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Rank the authors of issues opened and closed in a time window
    Authors {
        #[command(flatten)]
        walk: WalkArgs,

        /// Don't read or extend the stored author history
        #[arg(long)]
        no_history: bool,
    },
    /// Count opened and closed issues per time bucket
    Grouping {
        #[command(flatten)]
        walk: WalkArgs,

        /// Bucket size: days, weeks, months, or years
        #[arg(short, long, default_value = "weeks")]
        grouping: String,
    },
    /// Show stored author rankings, newest first
    History {
        /// Repository owner (user or organization)
        owner: String,

        /// Repository name
        repo: String,
    },
    /// Run database migrations
    Migrate {
        #[command(subcommand)]
        action: MigrateAction,
    },
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Options shared by the walking commands.
#[derive(Args, Debug, Clone)]
struct WalkArgs {
    /// Repository owner (user or organization)
    owner: String,

    /// Repository name
    repo: String,

    /// How far back the window reaches, in units of --unit
    #[arg(short, long, default_value_t = 3)]
    age: i64,

    /// Unit of --age: days, weeks, months, or years
    #[arg(short, long, default_value = "months")]
    unit: String,

    /// Issues per request (overrides config)
    #[arg(long)]
    page_size: Option<u32>,

    /// GitHub API to use: graphql or rest (overrides config)
    #[arg(long)]
    transport: Option<TransportKind>,

    /// Leave issues without an author out of the ranking
    #[arg(long)]
    exclude_null_authors: bool,

    /// Which closures count: any or within_window (overrides config)
    #[arg(long)]
    closed_dates: Option<ClosedDatePolicy>,
}

#[derive(Subcommand, Clone, Copy)]
enum MigrateAction {
    /// Apply all pending migrations
    Up,
    /// Rollback the last migration
    Down,
    /// Show migration status
    Status,
    /// Drop all tables and reapply migrations
    Fresh,
}

impl Commands {
    /// Whether the command reads or writes the local database.
    fn uses_database(&self, history_enabled: bool) -> bool {
        match self {
            Self::Authors { no_history, .. } => history_enabled && !no_history,
            Self::History { .. } | Self::Migrate { .. } => true,
            Self::Grouping { .. } | Self::Completions { .. } => false,
        }
    }
}

/// Ensure the parent directory of a `sqlite://` database exists.
fn prepare_sqlite_path(database_url: &str) -> std::io::Result<()> {
    let Some(db_path) = database_url.strip_prefix("sqlite://") else {
        return Ok(());
    };
    // Strip query parameters (e.g., ?mode=rwc) before path operations
    let db_path = db_path.split('?').next().unwrap_or(db_path);
    let db_path = std::path::Path::new(db_path);

    if db_path.is_relative() && !db_path.as_os_str().is_empty() {
        tracing::warn!(
            "Database path '{}' is relative - behavior depends on current directory. \
             Consider using an absolute path.",
            db_path.display()
        );
    }

    if let Some(parent) = db_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Set up graceful shutdown handler (Ctrl+C)
    let cancel = shutdown::setup_shutdown_handler();

    // Initialize tracing for non-TTY mode (structured logging)
    // Only initialize if not connected to a TTY
    if !Term::stdout().is_term() {
        let env_filter = match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::new("issuestat=info,issuestat_cli=info"),
        };

        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .init();
    }

    // Load configuration (config file -> env vars -> defaults)
    let config = config::Config::load();

    let cli = Cli::parse();

    // Handle commands that don't require database access first
    if let Commands::Completions { shell } = &cli.command {
        commands::meta::handle_completions(*shell)?;
        return Ok(());
    }

    let database_url = if cli.command.uses_database(config.history.enabled) {
        let url = config
            .database_url()
            .ok_or("Failed to determine database URL; set ISSUESTAT_DATABASE_URL")?;
        prepare_sqlite_path(&url)?;
        Some(url)
    } else {
        None
    };

    match (cli.command, database_url.as_deref()) {
        (Commands::Authors { walk, .. }, history_db) => {
            commands::authors::handle_authors(&walk, &config, history_db, cancel).await?;
        }
        (Commands::Grouping { walk, grouping }, _) => {
            commands::grouping::handle_grouping(&walk, &grouping, &config, cancel).await?;
        }
        (Commands::History { owner, repo }, Some(url)) => {
            commands::history::handle_history(&owner, &repo, url).await?;
        }
        (Commands::Migrate { action }, Some(url)) => {
            commands::migrate::handle_migrate(action, url).await?;
        }
        (
            Commands::History { .. } | Commands::Migrate { .. } | Commands::Completions { .. },
            _,
        ) => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_authors_defaults_to_three_months() {
        let cli = Cli::try_parse_from(["issuestat", "authors", "octo", "widgets"]).unwrap();
        let Commands::Authors { walk, no_history } = cli.command else {
            panic!("expected authors command");
        };
        assert_eq!(walk.owner, "octo");
        assert_eq!(walk.repo, "widgets");
        assert_eq!(walk.age, 3);
        assert_eq!(walk.unit, "months");
        assert!(!no_history);
        assert!(walk.transport.is_none());
    }

    #[test]
    fn test_grouping_parses_overrides() {
        let cli = Cli::try_parse_from([
            "issuestat",
            "grouping",
            "octo",
            "widgets",
            "-a",
            "2",
            "-u",
            "years",
            "-g",
            "months",
            "--transport",
            "rest",
            "--closed-dates",
            "within_window",
            "--page-size",
            "100",
        ])
        .unwrap();
        let Commands::Grouping { walk, grouping } = cli.command else {
            panic!("expected grouping command");
        };
        assert_eq!(grouping, "months");
        assert_eq!(walk.age, 2);
        assert_eq!(walk.unit, "years");
        assert_eq!(walk.transport, Some(TransportKind::Rest));
        assert_eq!(walk.closed_dates, Some(ClosedDatePolicy::WithinWindow));
        assert_eq!(walk.page_size, Some(100));
    }

    #[test]
    fn test_unknown_transport_is_rejected() {
        let result = Cli::try_parse_from([
            "issuestat",
            "authors",
            "octo",
            "widgets",
            "--transport",
            "soap",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_only_history_commands_use_database() {
        let parse = |args: &[&str]| Cli::try_parse_from(args).unwrap().command;

        let grouping = parse(&["issuestat", "grouping", "octo", "widgets"]);
        assert!(!grouping.uses_database(true));

        let authors = parse(&["issuestat", "authors", "octo", "widgets"]);
        assert!(authors.uses_database(true));
        assert!(!authors.uses_database(false));

        let no_history = parse(&["issuestat", "authors", "octo", "widgets", "--no-history"]);
        assert!(!no_history.uses_database(true));

        assert!(parse(&["issuestat", "history", "octo", "widgets"]).uses_database(false));
        assert!(parse(&["issuestat", "migrate", "up"]).uses_database(false));
        assert!(!parse(&["issuestat", "completions", "bash"]).uses_database(true));
    }

    #[test]
    fn test_prepare_sqlite_path_creates_parent() {
        let dir = std::env::temp_dir().join(format!("issuestat-cli-{}", std::process::id()));
        let url = format!("sqlite://{}/nested/issuestat.db?mode=rwc", dir.display());

        prepare_sqlite_path(&url).unwrap();
        assert!(dir.join("nested").is_dir());

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_prepare_sqlite_path_ignores_other_schemes() {
        prepare_sqlite_path("postgres://localhost/issuestat").unwrap();
    }
}
