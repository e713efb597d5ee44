// Cache module for the local pull request mirror.
// Stores review state per repository so each run only fetches what changed.

pub mod paths;
pub mod store;

pub use paths::{cache_dir, store_path};
pub use store::{CacheStore, CachedPullRequest, PullRequestState, ReviewOutcome};
