//! GitHub issue sources.
//!
//! Two [`PageFetcher`](crate::platform::PageFetcher) implementations share a
//! status mapping and wire types:
//!
//! - [`GraphQlIssueFetcher`] - `POST /graphql`, cursor based
//! - [`RestIssueFetcher`] - `GET /repos/{owner}/{repo}/issues`, `Link` header based
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use issuestat::github::{GitHubConfig, GraphQlIssueFetcher};
//! use issuestat::http::reqwest_transport::ReqwestTransport;
//!
//! let transport = Arc::new(ReqwestTransport::with_timeout(Duration::from_secs(30))?);
//! let fetcher = GraphQlIssueFetcher::new(transport, GitHubConfig::default().with_token(token));
//! ```

mod error;
mod graphql;
mod pagination;
mod rest;
mod types;

use std::sync::Arc;

pub use error::{check_status, is_rate_limited};
pub use graphql::GraphQlIssueFetcher;
pub use pagination::{LinkPagination, parse_link_header};
pub use rest::RestIssueFetcher;
pub use types::{
    DEFAULT_API_URL, DEFAULT_GRAPHQL_URL, GitHubConfig, MAX_PAGE_SIZE, TransportKind,
};

use crate::http::HttpTransport;
use crate::platform::PageFetcher;

/// Build the fetcher for `kind` over a shared transport.
pub fn fetcher_for(
    kind: TransportKind,
    transport: Arc<dyn HttpTransport>,
    config: GitHubConfig,
) -> Arc<dyn PageFetcher> {
    match kind {
        TransportKind::Graphql => Arc::new(GraphQlIssueFetcher::new(transport, config)),
        TransportKind::Rest => Arc::new(RestIssueFetcher::new(transport, config)),
    }
}
