//! [`PageFetcher`] over the GitHub GraphQL API.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;

use super::error::check_status;
use super::types::{GitHubConfig, GraphQlResponse, clamp_page_size};
use crate::http::{HttpRequest, HttpTransport};
use crate::platform::{Page, PageCursor, PageFetcher, PageRequest, PlatformError, Result};

/// Issues of a repository, walked backwards from the newest by creation date.
const ISSUES_QUERY: &str = r#"query($owner: String!, $name: String!, $last: Int!, $before: String) {
  repository(owner: $owner, name: $name) {
    issues(last: $last, before: $before, orderBy: {field: CREATED_AT, direction: ASC}) {
      nodes {
        author { login }
        createdAt
        closedAt
      }
      pageInfo {
        startCursor
        hasPreviousPage
      }
    }
  }
}"#;

/// Fetches issue pages through `POST /graphql`.
///
/// Each page holds the `page_size` issues created just before the cursor,
/// in ascending creation order. The page's start cursor is the next
/// (older) position.
pub struct GraphQlIssueFetcher {
    transport: Arc<dyn HttpTransport>,
    config: GitHubConfig,
}

impl GraphQlIssueFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: GitHubConfig) -> Self {
        Self { transport, config }
    }

    fn build_request(&self, request: &PageRequest<'_>) -> Result<HttpRequest> {
        let body = json!({
            "query": ISSUES_QUERY,
            "variables": {
                "owner": request.owner,
                "name": request.repo,
                "last": clamp_page_size(request.page_size),
                "before": request.cursor.map(PageCursor::as_str),
            }
        });
        let body = serde_json::to_vec(&body).map_err(|e| PlatformError::internal(e.to_string()))?;

        let mut http = HttpRequest::post(&self.config.graphql_url, body)
            .with_header("Content-Type", "application/json")
            .with_header("Accept", "application/json");
        if let Some(token) = &self.config.token {
            http = http.with_header("Authorization", format!("Bearer {token}"));
        }
        Ok(http)
    }
}

#[async_trait]
impl PageFetcher for GraphQlIssueFetcher {
    async fn fetch(&self, request: PageRequest<'_>) -> Result<Page> {
        let resource = request.full_name();
        tracing::debug!(
            repo = %resource,
            cursor = request.cursor.map(PageCursor::as_str),
            "Fetching issues via GraphQL"
        );

        let response = self.transport.send(self.build_request(&request)?).await?;
        check_status(&response, &resource)?;

        let decoded: GraphQlResponse = serde_json::from_slice(&response.body)
            .map_err(|e| PlatformError::malformed(e.to_string()))?;

        if let Some(first) = decoded.errors.first() {
            if first.kind.as_deref() == Some("NOT_FOUND") {
                return Err(PlatformError::not_found(resource));
            }
            let messages: Vec<&str> = decoded.errors.iter().map(|e| e.message.as_str()).collect();
            return Err(PlatformError::api(messages.join("; ")));
        }

        let repository = decoded
            .data
            .ok_or_else(|| PlatformError::malformed("response carries neither data nor errors"))?
            .repository
            .ok_or_else(|| PlatformError::not_found(resource.clone()))?;

        let connection = repository.issues;
        let next_cursor = connection.page_info.start_cursor.map(PageCursor::new);
        let has_more = connection.page_info.has_previous_page && next_cursor.is_some();

        Ok(Page {
            records: connection.nodes.into_iter().map(Into::into).collect(),
            next_cursor,
            has_more,
        })
    }
}
