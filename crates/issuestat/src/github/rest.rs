//! [`PageFetcher`] over the GitHub REST issues endpoint.

use std::sync::Arc;

use async_trait::async_trait;

use super::error::check_status;
use super::pagination::parse_link_header;
use super::types::{GitHubConfig, RestIssue, clamp_page_size};
use crate::http::{HttpRequest, HttpTransport};
use crate::platform::{Page, PageCursor, PageFetcher, PageRequest, PlatformError, Result};

/// Fetches issue pages through `GET /repos/{owner}/{repo}/issues`.
///
/// Issues are requested newest first; the cursor is the page number of the
/// next (older) page as advertised by the `Link` header. Pull requests,
/// which the endpoint mixes in, are dropped.
pub struct RestIssueFetcher {
    transport: Arc<dyn HttpTransport>,
    config: GitHubConfig,
}

impl RestIssueFetcher {
    pub fn new(transport: Arc<dyn HttpTransport>, config: GitHubConfig) -> Self {
        Self { transport, config }
    }

    fn page_url(&self, request: &PageRequest<'_>, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/issues?state=all&sort=created&direction=desc&per_page={}&page={}",
            self.config.api_url.trim_end_matches('/'),
            request.owner,
            request.repo,
            clamp_page_size(request.page_size),
            page
        )
    }
}

fn page_number(cursor: Option<&PageCursor>) -> Result<u32> {
    match cursor {
        None => Ok(1),
        Some(c) => c
            .as_str()
            .parse()
            .map_err(|_| PlatformError::internal(format!("invalid REST page cursor: {c}"))),
    }
}

#[async_trait]
impl PageFetcher for RestIssueFetcher {
    async fn fetch(&self, request: PageRequest<'_>) -> Result<Page> {
        let resource = request.full_name();
        let page = page_number(request.cursor)?;
        tracing::debug!(repo = %resource, page, "Fetching issues via REST");

        let mut http = HttpRequest::get(self.page_url(&request, page))
            .with_header("Accept", "application/vnd.github+json");
        if let Some(token) = &self.config.token {
            http = http.with_header("Authorization", format!("Bearer {token}"));
        }

        let response = self.transport.send(http).await?;
        check_status(&response, &resource)?;

        let issues: Vec<RestIssue> = serde_json::from_slice(&response.body)
            .map_err(|e| PlatformError::malformed(e.to_string()))?;

        let links = response
            .header("link")
            .map(parse_link_header)
            .unwrap_or_default();

        Ok(Page {
            records: issues
                .into_iter()
                .filter(|issue| !issue.is_pull_request())
                .map(Into::into)
                .collect(),
            next_cursor: links.next_page.map(|p| PageCursor::new(p.to_string())),
            has_more: links.has_next(),
        })
    }
}
