//! Configuration file support for issuestat.
//!
//! Configuration is loaded with the following precedence (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (prefixed with `ISSUESTAT_`, e.g., `ISSUESTAT_DATABASE_URL`)
//! 3. Config file (./issuestat.toml, then ~/.config/issuestat/config.toml)
//! 4. Built-in defaults
//!
//! The database URL defaults to `sqlite://~/.local/state/issuestat/issuestat.db` on Linux
//! (using the XDG state directory) if not explicitly configured.
//!
//! Example config file:
//! ```toml
//! [database]
//! url = "sqlite://~/.local/state/issuestat/issuestat.db"  # optional, this is the default
//!
//! [github]
//! token = "ghp_..."        # or ISSUESTAT_GITHUB_TOKEN / GITHUB_TOKEN
//! transport = "graphql"    # or "rest"
//!
//! [walk]
//! page_size = 50
//! null_authors = "include" # or "exclude"
//! closed_dates = "any"     # or "within_window"
//!
//! [history]
//! enabled = true
//! keep_top = 3
//! ```

use std::path::PathBuf;

use config::{Config as ConfigBuilder, ConfigError, File, FileFormat};
use directories::ProjectDirs;
use issuestat::NullAuthorPolicy;
use issuestat::github::{DEFAULT_API_URL, DEFAULT_GRAPHQL_URL, GitHubConfig, TransportKind};
use issuestat::store::HISTORY_TOP_N;
use issuestat::walk::{ClosedDatePolicy, DEFAULT_PAGE_SIZE, WalkOptions};
use serde::Deserialize;

/// Environment variables mapped onto config keys.
///
/// Keys contain underscores, so a separator-based environment source would
/// split them; the mapping is spelled out instead.
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("ISSUESTAT_DATABASE_URL", "database.url"),
    ("ISSUESTAT_GITHUB_TOKEN", "github.token"),
    ("ISSUESTAT_GITHUB_API_URL", "github.api_url"),
    ("ISSUESTAT_GITHUB_GRAPHQL_URL", "github.graphql_url"),
    ("ISSUESTAT_GITHUB_TRANSPORT", "github.transport"),
    ("ISSUESTAT_WALK_PAGE_SIZE", "walk.page_size"),
    ("ISSUESTAT_WALK_NULL_AUTHORS", "walk.null_authors"),
    ("ISSUESTAT_WALK_CLOSED_DATES", "walk.closed_dates"),
    ("ISSUESTAT_HISTORY_ENABLED", "history.enabled"),
    ("ISSUESTAT_HISTORY_KEEP_TOP", "history.keep_top"),
];

/// Top-level configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub github: GitHubSection,
    pub walk: WalkConfig,
    pub history: HistoryConfig,
}

/// Database configuration.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Database connection URL.
    /// Defaults to `sqlite://~/.local/state/issuestat/issuestat.db` if not specified.
    pub url: Option<String>,
}

/// GitHub configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GitHubSection {
    /// GitHub API token.
    pub token: Option<String>,
    pub api_url: String,
    pub graphql_url: String,
    pub transport: TransportKind,
}

impl Default for GitHubSection {
    fn default() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            transport: TransportKind::default(),
        }
    }
}

/// Default walk options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    pub page_size: u32,
    pub null_authors: NullAuthorPolicy,
    pub closed_dates: ClosedDatePolicy,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            null_authors: NullAuthorPolicy::default(),
            closed_dates: ClosedDatePolicy::default(),
        }
    }
}

/// Author history options.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Relay and save author history after author runs.
    pub enabled: bool,
    /// Entries kept per ranking.
    pub keep_top: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            keep_top: HISTORY_TOP_N,
        }
    }
}

impl Config {
    /// Load configuration using the config crate's layered approach.
    ///
    /// Sources are loaded in order (later sources override earlier):
    /// 1. Built-in defaults
    /// 2. XDG config file (~/.config/issuestat/config.toml)
    /// 3. Local config file (./issuestat.toml)
    /// 4. `ISSUESTAT_*` environment variables
    /// 5. `GITHUB_TOKEN`, when no token was configured otherwise
    pub fn load() -> Self {
        let mut files = Vec::new();
        if let Some(path) = Self::default_config_path()
            && path.exists()
        {
            tracing::debug!("Loading config from {:?}", path);
            files.push(path);
        }

        let local_config = PathBuf::from("issuestat.toml");
        if local_config.exists() {
            tracing::debug!("Loading config from ./issuestat.toml");
            files.push(local_config);
        }

        match Self::from_sources(&files, |name| std::env::var(name).ok()) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config: {}", e);
                Config::default()
            }
        }
    }

    /// Build configuration from TOML files and an environment lookup.
    pub fn from_sources(
        files: &[PathBuf],
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        for path in files {
            builder = builder.add_source(
                File::from(path.as_path())
                    .format(FileFormat::Toml)
                    .required(false),
            );
        }

        for &(var, key) in ENV_OVERRIDES {
            builder = builder.set_override_option(key, env(var))?;
        }

        let mut config: Config = builder.build()?.try_deserialize()?;
        if config.github.token.is_none() {
            config.github.token = env("GITHUB_TOKEN").filter(|t| !t.is_empty());
        }
        Ok(config)
    }

    /// Get the database URL, falling back to the default state directory path.
    ///
    /// The `mode=rwc` parameter enables read-write access and creates the file if it doesn't exist.
    pub fn database_url(&self) -> Option<String> {
        self.database.url.clone().or_else(|| {
            Self::default_state_dir().map(|state_dir| {
                let db_path = state_dir.join("issuestat.db");
                format!("sqlite://{}?mode=rwc", db_path.display())
            })
        })
    }

    /// Endpoint settings for the GitHub fetchers.
    pub fn github_config(&self) -> GitHubConfig {
        GitHubConfig {
            api_url: self.github.api_url.clone(),
            graphql_url: self.github.graphql_url.clone(),
            token: self.github.token.clone(),
        }
    }

    pub fn walk_options(&self) -> WalkOptions {
        WalkOptions {
            page_size: self.walk.page_size,
            null_authors: self.walk.null_authors,
            closed_dates: self.walk.closed_dates,
        }
    }

    /// Get the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", "issuestat").map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Get the default state directory path.
    ///
    /// On Linux, this is `$XDG_STATE_HOME/issuestat` or `~/.local/state/issuestat`.
    /// On macOS/Windows, falls back to the data directory.
    pub fn default_state_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "issuestat").map(|dirs| {
            // state_dir() returns None on macOS/Windows, fall back to data_dir
            dirs.state_dir()
                .map(|p| p.to_path_buf())
                .unwrap_or_else(|| dirs.data_dir().to_path_buf())
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.database.url.is_none());
        assert!(config.github.token.is_none());
        assert_eq!(config.github.transport, TransportKind::Graphql);
        assert_eq!(config.walk.page_size, 50);
        assert_eq!(config.walk.null_authors, NullAuthorPolicy::Include);
        assert_eq!(config.walk.closed_dates, ClosedDatePolicy::Any);
        assert!(config.history.enabled);
        assert_eq!(config.history.keep_top, 3);
    }

    #[test]
    fn test_config_builder_with_toml_string() {
        let toml_content = r#"
            [database]
            url = "sqlite:///tmp/test.db"

            [github]
            token = "ghp_test123"
            transport = "rest"

            [walk]
            page_size = 25
            null_authors = "exclude"
            closed_dates = "within_window"

            [history]
            enabled = false
        "#;

        let settings = ConfigBuilder::builder()
            .add_source(config::File::from_str(toml_content, FileFormat::Toml))
            .build()
            .unwrap();

        let config: Config = settings.try_deserialize().unwrap();
        assert_eq!(
            config.database.url,
            Some("sqlite:///tmp/test.db".to_string())
        );
        assert_eq!(config.github.token, Some("ghp_test123".to_string()));
        assert_eq!(config.github.transport, TransportKind::Rest);
        assert_eq!(config.github.api_url, DEFAULT_API_URL);
        assert_eq!(config.walk.page_size, 25);
        assert_eq!(config.walk.null_authors, NullAuthorPolicy::Exclude);
        assert_eq!(config.walk.closed_dates, ClosedDatePolicy::WithinWindow);
        assert!(!config.history.enabled);
        assert_eq!(config.history.keep_top, 3);
    }

    #[test]
    fn test_env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("ISSUESTAT_WALK_PAGE_SIZE", "10"),
            ("ISSUESTAT_GITHUB_TRANSPORT", "rest"),
            ("ISSUESTAT_HISTORY_KEEP_TOP", "5"),
            ("ISSUESTAT_DATABASE_URL", "sqlite::memory:"),
        ]);

        let config =
            Config::from_sources(&[], |name| env.get(name).map(|v| v.to_string())).unwrap();
        assert_eq!(config.walk.page_size, 10);
        assert_eq!(config.github.transport, TransportKind::Rest);
        assert_eq!(config.history.keep_top, 5);
        assert_eq!(config.database_url(), Some("sqlite::memory:".to_string()));
    }

    #[test]
    fn test_github_token_fallback() {
        let config = Config::from_sources(&[], |name| {
            (name == "GITHUB_TOKEN").then(|| "ghp_fallback".to_string())
        })
        .unwrap();
        assert_eq!(config.github.token, Some("ghp_fallback".to_string()));

        let config = Config::from_sources(&[], |name| match name {
            "GITHUB_TOKEN" => Some("ghp_fallback".to_string()),
            "ISSUESTAT_GITHUB_TOKEN" => Some("ghp_primary".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.github_config().token, Some("ghp_primary".to_string()));
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = Config::from_sources(&[], no_env).unwrap();
        assert_eq!(config.walk_options(), WalkOptions::default());
        assert!(config.database_url().is_some() || Config::default_state_dir().is_none());
    }
}
