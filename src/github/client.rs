// GitHub API HTTP client.
// Handles authentication headers, rate limit tracking, and status code mapping.

use reqwest::{
    Client, Response, StatusCode,
    header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue, LINK, USER_AGENT},
};
use tracing::debug;

use crate::error::{GhstatsError, Result};

use super::transport::{RawResponse, Transport};
use super::types::RateLimit;

pub const GITHUB_API_BASE: &str = "https://api.github.com";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// GitHub API client with optional authentication and rate limit tracking.
pub struct GitHubClient {
    client: Client,
    base_url: String,
    rate_limit: RateLimit,
}

impl GitHubClient {
    /// Create a client against `base_url`, authenticating with `token` when given.
    pub fn new(base_url: &str, token: Option<&str>) -> Result<Self> {
        let mut headers = HeaderMap::new();

        if let Some(token) = token {
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {}", token))
                    .map_err(|e| GhstatsError::Other(e.to_string()))?,
            );
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(
            "X-GitHub-Api-Version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static("ghstats"));

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GhstatsError::Other(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            rate_limit: RateLimit::default(),
        })
    }

    /// Get the rate limit seen on the most recent response.
    pub fn rate_limit(&self) -> &RateLimit {
        &self.rate_limit
    }

    /// Update rate limit from response headers.
    /// Returns the remaining count if this response carried one.
    fn update_rate_limit(&mut self, response: &Response) -> Option<u64> {
        let header = |name: &str| -> Option<u64> {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse().ok())
        };

        if let Some(limit) = header("x-ratelimit-limit") {
            self.rate_limit.limit = limit;
        }
        if let Some(reset) = header("x-ratelimit-reset") {
            self.rate_limit.reset = reset;
        }
        let remaining = header("x-ratelimit-remaining");
        if let Some(remaining) = remaining {
            self.rate_limit.remaining = remaining;
        }
        remaining
    }

    /// Check response status and convert errors.
    async fn check_response(&self, response: Response, remaining: Option<u64>) -> Result<Response> {
        let status = response.status();
        if status == StatusCode::OK {
            return Ok(response);
        }
        if is_rate_limited(status, remaining) {
            return Err(GhstatsError::RateLimited {
                reset_at: self.rate_limit.reset_at_local(),
            });
        }

        let url = response.url().to_string();
        Err(GhstatsError::Transport(format!(
            "HTTP {} from {}: {}",
            status,
            url,
            response.text().await.unwrap_or_default()
        )))
    }
}

/// Check if a failed response means the quota is spent.
///
/// A 403 only counts when the same response reports zero remaining requests,
/// so a forbidden proxy without rate limit headers stays a transport error.
fn is_rate_limited(status: StatusCode, remaining: Option<u64>) -> bool {
    match status {
        StatusCode::TOO_MANY_REQUESTS => true,
        StatusCode::FORBIDDEN => remaining == Some(0),
        _ => false,
    }
}

impl Transport for GitHubClient {
    async fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, ?query, "GET");

        let response = self.client.get(&url).query(query).send().await?;

        let remaining = self.update_rate_limit(&response);
        let response = self.check_response(response, remaining).await?;

        let link = response
            .headers()
            .get(LINK)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        Ok(RawResponse { body, link })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let client = GitHubClient::new("https://ghe.example.com/api/v3/", None).unwrap();
        assert_eq!(client.base_url, "https://ghe.example.com/api/v3");
        assert_eq!(client.rate_limit().reset_at_local(), "unknown");
    }

    #[test]
    fn test_forbidden_without_quota_headers_is_not_rate_limited() {
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, None));
        assert!(!is_rate_limited(StatusCode::FORBIDDEN, Some(12)));
        assert!(is_rate_limited(StatusCode::FORBIDDEN, Some(0)));
        assert!(is_rate_limited(StatusCode::TOO_MANY_REQUESTS, None));
        assert!(!is_rate_limited(StatusCode::NOT_FOUND, Some(0)));
    }

    #[test]
    fn test_new_rejects_unprintable_token() {
        let err = GitHubClient::new(GITHUB_API_BASE, Some("bad\ntoken")).err();
        assert!(matches!(err, Some(GhstatsError::Other(_))));
    }
}
