// Per-reviewer statistics.
// Folds cached review outcomes into counters and renders the CSV tally.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use clap::ValueEnum;

use crate::cache::{CacheStore, PullRequestState, ReviewOutcome};

/// Which pull requests to count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum StateFilter {
    All,
    Open,
    #[default]
    Closed,
}

impl StateFilter {
    fn matches(&self, state: PullRequestState) -> bool {
        match self {
            StateFilter::All => true,
            StateFilter::Open => state == PullRequestState::Open,
            StateFilter::Closed => state == PullRequestState::Closed,
        }
    }
}

/// Review counters for one reviewer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewerStats {
    /// Pull requests the reviewer appears on in any way.
    pub review_requests: u32,
    /// Open pull requests still waiting on the reviewer.
    pub waiting: u32,
    /// Closed pull requests the reviewer never reviewed, plus dismissed reviews.
    pub unreviewed: u32,
    pub approved: u32,
    pub commented: u32,
    /// Changes requested and anything unrecognized.
    pub other: u32,
}

impl ReviewerStats {
    fn record(&mut self, outcome: &ReviewOutcome) {
        self.review_requests += 1;
        match outcome {
            ReviewOutcome::Waiting => self.waiting += 1,
            ReviewOutcome::Unreviewed | ReviewOutcome::Dismissed => self.unreviewed += 1,
            ReviewOutcome::Approved => self.approved += 1,
            ReviewOutcome::Commented => self.commented += 1,
            ReviewOutcome::ChangesRequested | ReviewOutcome::Other(_) => self.other += 1,
        }
    }

    pub fn total(&self) -> u32 {
        self.approved + self.commented + self.unreviewed + self.waiting + self.other
    }

    /// Share of requests that did not end unreviewed, as a whole percentage.
    pub fn reviewed_percentage(&self) -> u32 {
        let total = self.total();
        if total == 0 {
            return 0;
        }
        100 * (total - self.unreviewed) / total
    }
}

/// Tally outcomes per reviewer over the pull requests matching `filter`
/// and, when given, updated at or after `since`.
pub fn compute_stats(
    store: &CacheStore,
    filter: StateFilter,
    since: Option<DateTime<Utc>>,
) -> BTreeMap<String, ReviewerStats> {
    let mut stats: BTreeMap<String, ReviewerStats> = BTreeMap::new();

    for pr in store.pull_requests() {
        if !filter.matches(pr.state) {
            continue;
        }
        if let Some(since) = since {
            match pr.updated_at {
                Some(updated_at) if updated_at >= since => {}
                _ => continue,
            }
        }
        for (login, outcome) in &pr.reviewers {
            stats.entry(login.clone()).or_default().record(outcome);
        }
    }

    stats
}

/// Render the tally as CSV, one line per reviewer.
pub fn render_tally(stats: &BTreeMap<String, ReviewerStats>) -> String {
    let mut out = String::new();
    out.push_str("---------------------------\n");
    out.push_str("ID,Approved,Commented,Unreviewed,Waiting,Other,Total,Reviewed\n");
    for (login, s) in stats {
        out.push_str(&format!(
            "{},{},{},{},{},{},{},{}%\n",
            login,
            s.approved,
            s.commented,
            s.unreviewed,
            s.waiting,
            s.other,
            s.total(),
            s.reviewed_percentage()
        ));
    }
    out
}
