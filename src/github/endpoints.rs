// GitHub API endpoint functions.
// Typed fetchers for the quota, pull request list and review list endpoints.

use serde::de::DeserializeOwned;

use crate::error::{GhstatsError, Result};

use super::pagination;
use super::transport::Transport;
use super::types::{RateLimit, RateLimitStatus, RemotePullRequest, RemoteReview};

/// Page size for pull request listings. Snapshot cursors count pages of this size.
pub const PULLS_PER_PAGE: u32 = 30;

/// Reviews are fetched in a single request of this size.
pub const REVIEWS_PER_PAGE: u32 = 100;

/// Ordering of a pull request listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    /// Oldest first; stable page contents for the snapshot sweep.
    CreatedAsc,
    /// Most recently updated first; used for delta sweeps.
    UpdatedDesc,
}

impl SortOrder {
    fn params(&self) -> (&'static str, &'static str) {
        match self {
            SortOrder::CreatedAsc => ("created", "asc"),
            SortOrder::UpdatedDesc => ("updated", "desc"),
        }
    }
}

/// One pull request list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageQuery {
    pub order: SortOrder,
    pub state: &'static str,
    pub page: u32,
    /// Fail with a protocol error if the total page count cannot be determined.
    pub requires_total: bool,
}

impl PageQuery {
    pub fn snapshot(page: u32) -> Self {
        Self {
            order: SortOrder::CreatedAsc,
            state: "all",
            page,
            requires_total: true,
        }
    }

    pub fn delta(page: u32) -> Self {
        Self {
            order: SortOrder::UpdatedDesc,
            state: "all",
            page,
            requires_total: false,
        }
    }
}

/// One fetched page of pull requests.
#[derive(Debug, Clone)]
pub struct Page {
    pub records: Vec<RemotePullRequest>,
    pub total_pages: u32,
}

fn parse_body<T: DeserializeOwned>(path: &str, body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| GhstatsError::Protocol(format!("unexpected response from {}: {}", path, e)))
}

/// Get the current quota.
pub async fn check_quota<T: Transport>(transport: &mut T) -> Result<RateLimit> {
    let path = "/rate_limit";
    let response = transport.get(path, &[]).await?;
    let status: RateLimitStatus = parse_body(path, &response.body)?;
    Ok(status.rate)
}

/// Fetch one page of pull requests for `repository` (`owner/name`).
pub async fn fetch_page<T: Transport>(
    transport: &mut T,
    repository: &str,
    query: &PageQuery,
) -> Result<Page> {
    let path = format!("/repos/{}/pulls", repository);
    let (sort, direction) = query.order.params();
    let params = [
        ("sort", sort.to_string()),
        ("direction", direction.to_string()),
        ("state", query.state.to_string()),
        ("page", query.page.to_string()),
        ("per_page", PULLS_PER_PAGE.to_string()),
    ];

    let response = transport.get(&path, &params).await?;
    let total_pages =
        pagination::last_page(response.link.as_deref(), query.page, query.requires_total)?;
    let records: Vec<RemotePullRequest> = parse_body(&path, &response.body)?;

    Ok(Page {
        records,
        total_pages,
    })
}

/// Fetch the submitted reviews of one pull request, oldest first.
pub async fn fetch_reviews<T: Transport>(
    transport: &mut T,
    repository: &str,
    number: u64,
) -> Result<Vec<RemoteReview>> {
    let path = format!("/repos/{}/pulls/{}/reviews", repository, number);
    let params = [("per_page", REVIEWS_PER_PAGE.to_string())];

    let response = transport.get(&path, &params).await?;
    parse_body(&path, &response.body)
}
