//! Wire types for the GitHub issue endpoints.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::platform::IssueRecord;

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default GraphQL endpoint.
pub const DEFAULT_GRAPHQL_URL: &str = "https://api.github.com/graphql";

/// Largest page either API accepts (`last` on GraphQL, `per_page` on REST).
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size within the range GitHub accepts.
pub(crate) fn clamp_page_size(page_size: u32) -> u32 {
    page_size.clamp(1, MAX_PAGE_SIZE)
}

/// Endpoint and credential settings shared by both fetchers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GitHubConfig {
    pub api_url: String,
    pub graphql_url: String,
    /// Personal access token; anonymous requests when `None`.
    #[serde(default)]
    pub token: Option<String>,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            graphql_url: DEFAULT_GRAPHQL_URL.to_string(),
            token: None,
        }
    }
}

impl GitHubConfig {
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// Which GitHub API a fetcher talks to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    #[default]
    Graphql,
    Rest,
}

impl std::str::FromStr for TransportKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "graphql" => Ok(Self::Graphql),
            "rest" => Ok(Self::Rest),
            other => Err(format!("unknown GitHub transport: {other}")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Actor {
    pub login: String,
}

// ---------- GraphQL ----------

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlResponse {
    #[serde(default)]
    pub data: Option<GraphQlData>,
    #[serde(default)]
    pub errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlError {
    pub message: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlData {
    pub repository: Option<GraphQlRepository>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct GraphQlRepository {
    pub issues: GraphQlIssueConnection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQlIssueConnection {
    pub nodes: Vec<GraphQlIssue>,
    pub page_info: GraphQlPageInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQlIssue {
    pub author: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct GraphQlPageInfo {
    pub start_cursor: Option<String>,
    pub has_previous_page: bool,
}

impl From<GraphQlIssue> for IssueRecord {
    fn from(issue: GraphQlIssue) -> Self {
        IssueRecord {
            author: issue.author.map(|a| a.login),
            created_at: issue.created_at,
            closed_at: issue.closed_at,
        }
    }
}

// ---------- REST ----------

#[derive(Debug, Deserialize)]
pub(crate) struct RestIssue {
    pub user: Option<Actor>,
    pub created_at: DateTime<Utc>,
    pub closed_at: Option<String>,
    /// Present only when the "issue" is a pull request.
    #[serde(default)]
    pub pull_request: Option<serde_json::Value>,
}

impl RestIssue {
    pub fn is_pull_request(&self) -> bool {
        self.pull_request.is_some()
    }
}

impl From<RestIssue> for IssueRecord {
    fn from(issue: RestIssue) -> Self {
        IssueRecord {
            author: issue.user.map(|u| u.login),
            created_at: issue.created_at,
            closed_at: issue.closed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_graphql_issue_without_author_maps_to_none() {
        let issue: GraphQlIssue = serde_json::from_value(serde_json::json!({
            "author": null,
            "createdAt": "2024-01-02T03:04:05Z",
            "closedAt": null
        }))
        .unwrap();
        let record = IssueRecord::from(issue);
        assert_eq!(record.author, None);
        assert_eq!(record.closed_at, None);
    }

    #[test]
    fn test_rest_issue_detects_pull_requests() {
        let issue: RestIssue = serde_json::from_value(serde_json::json!({
            "user": {"login": "octocat"},
            "created_at": "2024-01-02T03:04:05Z",
            "closed_at": "2024-01-03T00:00:00Z",
            "pull_request": {"url": "https://api.github.com/repos/o/r/pulls/1"}
        }))
        .unwrap();
        assert!(issue.is_pull_request());

        let record = IssueRecord::from(issue);
        assert_eq!(record.author.as_deref(), Some("octocat"));
        assert!(record.closed_at().is_some());
    }

    #[test]
    fn test_transport_kind_parses_case_insensitively() {
        assert_eq!("GraphQL".parse::<TransportKind>(), Ok(TransportKind::Graphql));
        assert_eq!("rest".parse::<TransportKind>(), Ok(TransportKind::Rest));
        assert!("soap".parse::<TransportKind>().is_err());
    }

    #[test]
    fn test_clamp_page_size_bounds() {
        assert_eq!(clamp_page_size(0), 1);
        assert_eq!(clamp_page_size(50), 50);
        assert_eq!(clamp_page_size(100), 100);
        assert_eq!(clamp_page_size(500), MAX_PAGE_SIZE);
    }
}
