// GitHub API module.
// Provides the transport seam, the HTTP client and typed endpoint functions.

pub mod client;
pub mod endpoints;
pub mod pagination;
pub mod transport;
pub mod types;

pub use client::{GITHUB_API_BASE, GitHubClient};
pub use endpoints::{Page, PageQuery, SortOrder, check_quota, fetch_page, fetch_reviews};
pub use transport::{RawResponse, Transport};
pub use types::*;
