// GitHub API response types.
// Defines structs for deserializing pull request, review and rate limit responses.

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use crate::cache::{PullRequestState, ReviewOutcome};

/// GitHub user reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteUser {
    pub login: String,
}

/// Pull request summary as returned by the list endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemotePullRequest {
    pub number: u64,
    pub state: PullRequestState,
    pub updated_at: DateTime<Utc>,
    /// Reviewers asked to review who have not submitted a review since.
    #[serde(default)]
    pub requested_reviewers: Vec<RemoteUser>,
}

/// Submitted review on a pull request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteReview {
    /// Null for reviews left by deleted accounts.
    pub user: Option<RemoteUser>,
    pub state: ReviewOutcome,
}

/// Body of `GET /rate_limit`.
#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitStatus {
    pub rate: RateLimit,
}

/// Rate limit information from response headers or the quota endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RateLimit {
    pub limit: u64,
    pub remaining: u64,
    /// Reset time in seconds since the epoch.
    pub reset: u64,
}

impl RateLimit {
    /// Check if no requests remain.
    pub fn is_exhausted(&self) -> bool {
        self.remaining == 0
    }

    /// Reset time rendered in the local timezone, or "unknown" if never reported.
    pub fn reset_at_local(&self) -> String {
        if self.reset == 0 {
            return "unknown".to_string();
        }
        DateTime::from_timestamp(self.reset as i64, 0)
            .map(|dt| {
                dt.with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            })
            .unwrap_or_else(|| "unknown".to_string())
    }
}
