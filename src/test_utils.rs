//! Test utilities: an in-memory transport and JSON builders for GitHub responses.

use std::collections::HashMap;

use serde_json::json;

use crate::error::{GhstatsError, Result};
use crate::github::{RawResponse, Transport};

/// Canned reply for one route.
#[derive(Debug, Clone)]
pub enum Reply {
    Ok(RawResponse),
    TransportError,
    RateLimited,
}

/// Transport that serves canned replies and records every request.
///
/// Routes are keyed by path, plus `?page=N` when the request carries a page
/// parameter. Unrouted requests fail with a transport error.
#[derive(Debug, Default)]
pub struct FakeTransport {
    routes: HashMap<String, Reply>,
    pub requests: Vec<String>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&mut self, key: impl Into<String>, reply: Reply) -> &mut Self {
        self.routes.insert(key.into(), reply);
        self
    }

    pub fn respond(&mut self, key: impl Into<String>, response: RawResponse) -> &mut Self {
        self.route(key, Reply::Ok(response))
    }

    pub fn with_quota(&mut self, remaining: u64) -> &mut Self {
        self.respond("/rate_limit", quota(remaining))
    }

    /// Serve a pull request list page of a `total`-page listing.
    pub fn pulls_page(
        &mut self,
        repo: &str,
        page: u32,
        total: u32,
        records: serde_json::Value,
    ) -> &mut Self {
        let mut response = RawResponse::new(records.to_string());
        if let Some(link) = link_header(repo, page, total) {
            response = response.with_link(link);
        }
        self.respond(page_key(repo, page), response)
    }

    pub fn reviews(&mut self, repo: &str, number: u64, reviews: serde_json::Value) -> &mut Self {
        self.respond(reviews_key(repo, number), RawResponse::new(reviews.to_string()))
    }

    /// Number of recorded requests for `key`.
    pub fn count(&self, key: &str) -> usize {
        self.requests.iter().filter(|r| *r == key).count()
    }

    /// Recorded pull request list requests, in order.
    pub fn page_requests(&self) -> Vec<&str> {
        self.requests
            .iter()
            .filter(|r| r.contains("/pulls?page="))
            .map(String::as_str)
            .collect()
    }
}

impl Transport for FakeTransport {
    async fn get(&mut self, path: &str, query: &[(&str, String)]) -> Result<RawResponse> {
        let key = match query.iter().find(|(name, _)| *name == "page") {
            Some((_, page)) => format!("{}?page={}", path, page),
            None => path.to_string(),
        };
        self.requests.push(key.clone());

        match self.routes.get(&key) {
            Some(Reply::Ok(response)) => Ok(response.clone()),
            Some(Reply::RateLimited) => Err(GhstatsError::RateLimited {
                reset_at: "soon".to_string(),
            }),
            Some(Reply::TransportError) | None => {
                Err(GhstatsError::Transport(format!("unreachable: {}", key)))
            }
        }
    }
}

pub fn page_key(repo: &str, page: u32) -> String {
    format!("/repos/{}/pulls?page={}", repo, page)
}

pub fn reviews_key(repo: &str, number: u64) -> String {
    format!("/repos/{}/pulls/{}/reviews", repo, number)
}

pub fn quota(remaining: u64) -> RawResponse {
    RawResponse::new(
        json!({ "rate": { "limit": 60, "remaining": remaining, "reset": 1_600_000_000 } })
            .to_string(),
    )
}

/// Link header GitHub would send for `page` of `total`.
pub fn link_header(repo: &str, page: u32, total: u32) -> Option<String> {
    if total <= 1 {
        return None;
    }
    let url = |p: u32| format!("https://api.github.com/repos/{}/pulls?state=all&page={}", repo, p);
    let mut relations = Vec::new();
    if page > 1 {
        relations.push(format!("<{}>; rel=\"prev\"", url(page - 1)));
    }
    if page < total {
        relations.push(format!("<{}>; rel=\"next\"", url(page + 1)));
        relations.push(format!("<{}>; rel=\"last\"", url(total)));
    }
    if page > 1 {
        relations.push(format!("<{}>; rel=\"first\"", url(1)));
    }
    Some(relations.join(", "))
}

/// A pull request list entry.
pub fn pr(number: u64, state: &str, updated_at: &str, reviewers: &[&str]) -> serde_json::Value {
    let requested: Vec<_> = reviewers.iter().map(|login| json!({ "login": login })).collect();
    json!({
        "number": number,
        "state": state,
        "updated_at": updated_at,
        "requested_reviewers": requested,
    })
}

/// A review list entry.
pub fn review(login: &str, state: &str) -> serde_json::Value {
    json!({ "user": { "login": login }, "state": state })
}
