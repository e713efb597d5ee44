// Merge engine.
// Folds fetched pull request and review records into the cache store.

use tracing::debug;

use crate::cache::CacheStore;
use crate::github::{RemotePullRequest, RemoteReview};

/// Apply one pull request summary. Returns true if its update timestamp changed.
///
/// Placeholders go in before the timestamp gate so a pull request that now
/// needs its reviews re-fetched already shows its current reviewer set.
/// A reviewer who has a submitted outcome keeps it.
pub fn merge_pull_request(store: &mut CacheStore, record: &RemotePullRequest) -> bool {
    let placeholder = record.state.placeholder_outcome();

    for reviewer in &record.requested_reviewers {
        let submitted = store
            .pull_request(record.number)
            .and_then(|pr| pr.reviewers.get(&reviewer.login))
            .is_some_and(|outcome| !outcome.is_placeholder());
        if submitted {
            continue;
        }
        store.record_review_outcome(record.number, &reviewer.login, placeholder.clone());
    }

    let changed = store.upsert_pull_request_state(record.number, record.state, record.updated_at);
    if changed {
        debug!(
            number = record.number,
            state = record.state.as_str(),
            "pull request changed"
        );
    }
    changed
}

/// Apply a page of summaries. Returns how many of them changed.
pub fn merge_page(store: &mut CacheStore, records: &[RemotePullRequest]) -> usize {
    records
        .iter()
        .filter(|record| merge_pull_request(store, record))
        .count()
}

/// Apply the submitted reviews of one pull request and mark its reviews fetched.
///
/// Reviews arrive oldest first, so a reviewer's latest review wins.
pub fn merge_reviews(store: &mut CacheStore, number: u64, reviews: &[RemoteReview]) {
    for review in reviews {
        let Some(user) = &review.user else {
            continue;
        };
        store.record_review_outcome(number, &user.login, review.state.clone());
    }
    store.mark_reviews_fetched(number);
}
