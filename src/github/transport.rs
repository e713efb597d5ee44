// Transport seam between the sync engine and HTTP.
// Lets the endpoint functions run against the real client or an in-memory fake.

use std::future::Future;

use crate::error::Result;

/// Body and pagination header of a successful GET.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawResponse {
    pub body: String,
    /// Value of the `Link` response header, if any.
    pub link: Option<String>,
}

impl RawResponse {
    pub fn new(body: impl Into<String>) -> Self {
        Self {
            body: body.into(),
            link: None,
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }
}

/// Issues GET requests against the REST API.
///
/// Implementations return `GhstatsError::Transport` for network failures and
/// non-success statuses, and `GhstatsError::RateLimited` when the quota is spent.
pub trait Transport {
    fn get(&mut self, path: &str, query: &[(&str, String)])
    -> impl Future<Output = Result<RawResponse>>;
}
