// Cache store for pull request review state.
// Owns the per-repository record set, the snapshot cursor and the on-disk format.

use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{GhstatsError, Result};

/// Version tag written into every cache file.
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Pull request lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PullRequestState {
    #[default]
    Open,
    Closed,
}

impl PullRequestState {
    /// Get the API spelling of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            PullRequestState::Open => "open",
            PullRequestState::Closed => "closed",
        }
    }

    /// Placeholder outcome for a requested reviewer who has not submitted anything yet.
    pub fn placeholder_outcome(&self) -> ReviewOutcome {
        match self {
            PullRequestState::Open => ReviewOutcome::Waiting,
            PullRequestState::Closed => ReviewOutcome::Unreviewed,
        }
    }
}

/// Outcome of a review request for one reviewer.
///
/// `Waiting` and `Unreviewed` are assigned locally; everything else comes from
/// a submitted review. Unknown remote values are kept verbatim in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ReviewOutcome {
    Waiting,
    Unreviewed,
    Approved,
    Commented,
    ChangesRequested,
    Dismissed,
    Other(String),
}

impl ReviewOutcome {
    /// Get the name of this outcome as stored and displayed.
    pub fn as_str(&self) -> &str {
        match self {
            ReviewOutcome::Waiting => "Waiting",
            ReviewOutcome::Unreviewed => "Unreviewed",
            ReviewOutcome::Approved => "APPROVED",
            ReviewOutcome::Commented => "COMMENTED",
            ReviewOutcome::ChangesRequested => "CHANGES_REQUESTED",
            ReviewOutcome::Dismissed => "DISMISSED",
            ReviewOutcome::Other(raw) => raw,
        }
    }

    /// True for the locally assigned `Waiting`/`Unreviewed` stand-ins.
    pub fn is_placeholder(&self) -> bool {
        matches!(self, ReviewOutcome::Waiting | ReviewOutcome::Unreviewed)
    }
}

impl From<&str> for ReviewOutcome {
    fn from(raw: &str) -> Self {
        match raw {
            "Waiting" => ReviewOutcome::Waiting,
            "Unreviewed" => ReviewOutcome::Unreviewed,
            "APPROVED" => ReviewOutcome::Approved,
            "COMMENTED" => ReviewOutcome::Commented,
            "CHANGES_REQUESTED" => ReviewOutcome::ChangesRequested,
            "DISMISSED" => ReviewOutcome::Dismissed,
            other => ReviewOutcome::Other(other.to_string()),
        }
    }
}

impl From<String> for ReviewOutcome {
    fn from(raw: String) -> Self {
        ReviewOutcome::from(raw.as_str())
    }
}

impl From<ReviewOutcome> for String {
    fn from(outcome: ReviewOutcome) -> Self {
        outcome.as_str().to_string()
    }
}

impl fmt::Display for ReviewOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Cached state for a single pull request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CachedPullRequest {
    pub number: u64,
    pub state: PullRequestState,
    /// Last remote modification time we have seen.
    pub updated_at: Option<DateTime<Utc>>,
    /// Whether the review list was fetched at `updated_at`.
    pub reviews_fetched: bool,
    /// Reviewer login to outcome.
    #[serde(default)]
    pub reviewers: BTreeMap<String, ReviewOutcome>,
}

impl CachedPullRequest {
    fn new(number: u64) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

/// All cached state for one repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStore {
    version: u32,
    repository: String,
    /// Whether a full creation-ordered sweep has finished.
    #[serde(default)]
    snapshot_complete: bool,
    /// Resume point of the sweep while it is incomplete.
    #[serde(default)]
    last_snapshot_page_read: u32,
    #[serde(default)]
    pull_requests: BTreeMap<u64, CachedPullRequest>,
    #[serde(skip)]
    path: PathBuf,
}

impl CacheStore {
    /// Create an empty store that will be saved at `path`.
    pub fn new(path: impl Into<PathBuf>, repository: &str) -> Self {
        Self {
            version: CACHE_FORMAT_VERSION,
            repository: repository.to_string(),
            snapshot_complete: false,
            last_snapshot_page_read: 0,
            pull_requests: BTreeMap::new(),
            path: path.into(),
        }
    }

    /// Load the store for `repository` from `path`, or start empty if no file exists.
    pub fn load(path: impl Into<PathBuf>, repository: &str) -> Result<Self> {
        let path = path.into();
        if !path.exists() {
            return Ok(Self::new(path, repository));
        }

        let contents = fs::read_to_string(&path)?;
        let mut store: CacheStore =
            serde_json::from_str(&contents).map_err(|e| GhstatsError::CorruptCache {
                path: path.clone(),
                reason: e.to_string(),
            })?;

        if store.version != CACHE_FORMAT_VERSION {
            return Err(GhstatsError::CorruptCache {
                path,
                reason: format!(
                    "unsupported format version {} (expected {})",
                    store.version, CACHE_FORMAT_VERSION
                ),
            });
        }
        if store.repository != repository {
            return Err(GhstatsError::CorruptCache {
                path,
                reason: format!(
                    "file belongs to repository '{}', not '{}'",
                    store.repository, repository
                ),
            });
        }

        store.path = path;
        Ok(store)
    }

    /// Write the whole store to disk.
    pub fn save(&self) -> Result<()> {
        // Ensure parent directory exists
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;

        // Write atomically via temp file
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        fs::rename(&temp_path, &self.path)?;

        Ok(())
    }

    /// Get the repository this cache belongs to, as `owner/name`.
    pub fn repository(&self) -> &str {
        &self.repository
    }

    /// Check if the snapshot sweep has reached the final page.
    pub fn snapshot_complete(&self) -> bool {
        self.snapshot_complete
    }

    /// Get the last snapshot page merged and saved, 0 if none.
    pub fn last_snapshot_page_read(&self) -> u32 {
        self.last_snapshot_page_read
    }

    /// Record that `page` of the snapshot sweep has been merged. Never moves backwards.
    pub fn advance_snapshot_cursor(&mut self, page: u32) {
        self.last_snapshot_page_read = self.last_snapshot_page_read.max(page);
    }

    pub fn mark_snapshot_complete(&mut self) {
        self.snapshot_complete = true;
    }

    fn find_or_create(&mut self, number: u64) -> &mut CachedPullRequest {
        self.pull_requests
            .entry(number)
            .or_insert_with(|| CachedPullRequest::new(number))
    }

    /// Apply a remote state/timestamp pair. Returns true if `updated_at` changed,
    /// in which case the review list must be fetched again.
    pub fn upsert_pull_request_state(
        &mut self,
        number: u64,
        state: PullRequestState,
        updated_at: DateTime<Utc>,
    ) -> bool {
        let pr = self.find_or_create(number);
        pr.state = state;
        if pr.updated_at == Some(updated_at) {
            return false;
        }
        pr.updated_at = Some(updated_at);
        pr.reviews_fetched = false;
        true
    }

    /// Record that the reviews of `number` are up to date.
    pub fn mark_reviews_fetched(&mut self, number: u64) {
        self.find_or_create(number).reviews_fetched = true;
    }

    /// Set the outcome for one reviewer, replacing any earlier value.
    pub fn record_review_outcome(&mut self, number: u64, reviewer: &str, outcome: ReviewOutcome) {
        self.find_or_create(number)
            .reviewers
            .insert(reviewer.to_string(), outcome);
    }

    /// Get the `updated_at` last stored for `number`, if any.
    pub fn last_known_update_timestamp(&self, number: u64) -> Option<DateTime<Utc>> {
        self.pull_requests.get(&number).and_then(|pr| pr.updated_at)
    }

    pub fn pull_request(&self, number: u64) -> Option<&CachedPullRequest> {
        self.pull_requests.get(&number)
    }

    pub fn pull_requests(&self) -> impl Iterator<Item = &CachedPullRequest> {
        self.pull_requests.values()
    }

    pub fn len(&self) -> usize {
        self.pull_requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pull_requests.is_empty()
    }

    /// Numbers of pull requests whose reviews still need fetching, ascending.
    pub fn pending_review_fetches(&self) -> Vec<u64> {
        self.pull_requests
            .values()
            .filter(|pr| !pr.reviews_fetched)
            .map(|pr| pr.number)
            .collect()
    }

    /// Share of cached pull requests with reviews fetched, as a whole percentage.
    pub fn completion_percentage(&self) -> u32 {
        if self.pull_requests.is_empty() {
            return 100;
        }
        let fetched = self
            .pull_requests
            .values()
            .filter(|pr| pr.reviews_fetched)
            .count();
        (100 * fetched / self.pull_requests.len()) as u32
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn ts(s: &str) -> DateTime<Utc> {
        s.parse().unwrap()
    }

    fn store() -> CacheStore {
        CacheStore::new("/nonexistent/owner/repo.json", "owner/repo")
    }

    #[test]
    fn test_upsert_same_timestamp_is_idempotent() {
        let mut store = store();
        let t = ts("2020-05-01T10:00:00Z");

        assert!(store.upsert_pull_request_state(7, PullRequestState::Open, t));
        store.mark_reviews_fetched(7);
        store.record_review_outcome(7, "alice", ReviewOutcome::Approved);

        assert!(!store.upsert_pull_request_state(7, PullRequestState::Open, t));
        let pr = store.pull_request(7).unwrap();
        assert!(pr.reviews_fetched);
        assert_eq!(pr.reviewers.get("alice"), Some(&ReviewOutcome::Approved));
    }

    #[test]
    fn test_upsert_overwrites_state_without_timestamp_change() {
        let mut store = store();
        let t = ts("2020-05-01T10:00:00Z");

        store.upsert_pull_request_state(7, PullRequestState::Open, t);
        store.mark_reviews_fetched(7);

        assert!(!store.upsert_pull_request_state(7, PullRequestState::Closed, t));
        let pr = store.pull_request(7).unwrap();
        assert_eq!(pr.state, PullRequestState::Closed);
        assert!(pr.reviews_fetched);
    }

    #[test]
    fn test_timestamp_change_resets_reviews_fetched() {
        let mut store = store();

        store.upsert_pull_request_state(3, PullRequestState::Open, ts("2020-05-01T10:00:00Z"));
        store.mark_reviews_fetched(3);
        store.record_review_outcome(3, "bob", ReviewOutcome::Commented);

        assert!(store.upsert_pull_request_state(
            3,
            PullRequestState::Open,
            ts("2020-05-02T10:00:00Z")
        ));
        let pr = store.pull_request(3).unwrap();
        assert!(!pr.reviews_fetched);
        // Outcomes survive until the reviews are fetched again.
        assert_eq!(pr.reviewers.get("bob"), Some(&ReviewOutcome::Commented));
        assert_eq!(
            store.last_known_update_timestamp(3),
            Some(ts("2020-05-02T10:00:00Z"))
        );
    }

    #[test]
    fn test_mutators_create_missing_entities() {
        let mut store = store();

        store.mark_reviews_fetched(1);
        store.mark_reviews_fetched(1);
        store.record_review_outcome(2, "carol", ReviewOutcome::Waiting);

        assert!(store.pull_request(1).unwrap().reviews_fetched);
        assert_eq!(store.pull_request(2).unwrap().reviewers.len(), 1);
        assert_eq!(store.last_known_update_timestamp(1), None);
        assert_eq!(store.last_known_update_timestamp(99), None);
    }

    #[test]
    fn test_snapshot_cursor_never_moves_backwards() {
        let mut store = store();
        store.advance_snapshot_cursor(3);
        store.advance_snapshot_cursor(2);
        assert_eq!(store.last_snapshot_page_read(), 3);
    }

    #[test]
    fn test_pending_and_completion() {
        let mut store = store();
        assert_eq!(store.completion_percentage(), 100);

        let t = ts("2020-05-01T10:00:00Z");
        for number in [5, 1, 3] {
            store.upsert_pull_request_state(number, PullRequestState::Closed, t);
        }
        store.mark_reviews_fetched(3);

        assert_eq!(store.pending_review_fetches(), vec![1, 5]);
        assert_eq!(store.completion_percentage(), 33);
    }

    #[test]
    fn test_review_outcome_strings() {
        assert_eq!(ReviewOutcome::from("APPROVED"), ReviewOutcome::Approved);
        assert_eq!(ReviewOutcome::from("DISMISSED"), ReviewOutcome::Dismissed);
        assert_eq!(
            ReviewOutcome::from("PENDING"),
            ReviewOutcome::Other("PENDING".to_string())
        );
        assert_eq!(ReviewOutcome::ChangesRequested.as_str(), "CHANGES_REQUESTED");
        assert!(ReviewOutcome::Waiting.is_placeholder());
        assert!(!ReviewOutcome::Commented.is_placeholder());

        let json = serde_json::to_string(&ReviewOutcome::Other("NEW_KIND".into())).unwrap();
        assert_eq!(json, "\"NEW_KIND\"");
    }

    #[test]
    fn test_load_missing_file_gives_empty_store() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("owner").join("repo.json");

        let store = CacheStore::load(&path, "owner/repo").unwrap();
        assert!(store.is_empty());
        assert!(!store.snapshot_complete());
        assert_eq!(store.last_snapshot_page_read(), 0);
        assert_eq!(store.repository(), "owner/repo");
    }

    #[test]
    fn test_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("owner").join("repo.json");

        let mut store = CacheStore::load(&path, "owner/repo").unwrap();
        store.upsert_pull_request_state(13, PullRequestState::Open, ts("2020-05-01T10:00:00Z"));
        store.record_review_outcome(13, "user3", ReviewOutcome::Waiting);
        store.advance_snapshot_cursor(2);
        store.mark_snapshot_complete();
        store.save().unwrap();

        assert!(!path.with_extension("tmp").exists());

        let loaded = CacheStore::load(&path, "owner/repo").unwrap();
        assert!(loaded.snapshot_complete());
        assert_eq!(loaded.last_snapshot_page_read(), 2);
        assert_eq!(loaded.pull_request(13), store.pull_request(13));
    }

    #[test]
    fn test_load_corrupt_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repo.json");
        fs::write(&path, "{ not json").unwrap();

        let err = CacheStore::load(&path, "owner/repo").unwrap_err();
        assert!(matches!(err, GhstatsError::CorruptCache { .. }));
    }

    #[test]
    fn test_load_rejects_unknown_version() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repo.json");
        fs::write(
            &path,
            r#"{"version": 99, "repository": "owner/repo", "pull_requests": {}}"#,
        )
        .unwrap();

        let err = CacheStore::load(&path, "owner/repo").unwrap_err();
        assert!(matches!(err, GhstatsError::CorruptCache { .. }));
    }

    #[test]
    fn test_load_rejects_other_repository() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("repo.json");
        CacheStore::new(&path, "someone/else").save().unwrap();

        let err = CacheStore::load(&path, "owner/repo").unwrap_err();
        assert!(matches!(err, GhstatsError::CorruptCache { .. }));
    }
}
