// Synchronization controller.
// Runs page acquisition (snapshot or delta) and then review backfill, saving as it goes.

use std::fmt;

use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::error::{GhstatsError, Result};
use crate::github::{PageQuery, Transport, check_quota, fetch_page, fetch_reviews};

use super::merge::{merge_page, merge_reviews};

/// Stage of a synchronization run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    Quota,
    Snapshot,
    Delta,
    Reviews,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SyncPhase::Quota => "quota check",
            SyncPhase::Snapshot => "snapshot",
            SyncPhase::Delta => "delta",
            SyncPhase::Reviews => "review backfill",
        })
    }
}

/// How a synchronization run ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// Both phases finished.
    Complete,
    /// The API quota is spent; the cache is still usable read-only.
    QuotaExhausted { reset_at: String },
    /// A transport failure stopped the run. Progress up to it was saved.
    Incomplete { phase: SyncPhase, reason: String },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Complete)
    }
}

/// Bring `store` up to date, fetching at most `page_budget` list pages.
///
/// Transport failures and quota exhaustion end the run early with an
/// unsuccessful outcome. Protocol errors are returned as `Err`. Whenever the
/// store was touched it is saved before returning.
pub async fn synchronize<T: Transport>(
    transport: &mut T,
    store: &mut CacheStore,
    page_budget: u32,
) -> Result<SyncOutcome> {
    info!(
        repository = store.repository(),
        page_budget,
        snapshot_complete = store.snapshot_complete(),
        "Starting synchronization"
    );

    // Nothing has been mutated yet, so none of these exits save.
    match check_quota(transport).await {
        Ok(rate) if rate.is_exhausted() => {
            let reset_at = rate.reset_at_local();
            warn!(%reset_at, "API quota exhausted");
            return Ok(SyncOutcome::QuotaExhausted { reset_at });
        }
        Ok(rate) => debug!(remaining = rate.remaining, limit = rate.limit, "quota available"),
        Err(GhstatsError::Transport(reason)) => {
            warn!(%reason, "GitHub is unreachable, using only cached data");
            return Ok(SyncOutcome::Incomplete {
                phase: SyncPhase::Quota,
                reason,
            });
        }
        Err(GhstatsError::RateLimited { reset_at }) => {
            warn!(%reset_at, "API quota exhausted");
            return Ok(SyncOutcome::QuotaExhausted { reset_at });
        }
        Err(e) => return Err(e),
    }

    let (phase, acquired) = if store.snapshot_complete() {
        (
            SyncPhase::Delta,
            fetch_deltas(transport, store, page_budget).await,
        )
    } else {
        (
            SyncPhase::Snapshot,
            fetch_snapshot(transport, store, page_budget).await,
        )
    };
    if let Some(outcome) = settle(store, phase, acquired)? {
        return Ok(outcome);
    }

    let backfilled = backfill_reviews(transport, store).await;
    if let Some(outcome) = settle(store, SyncPhase::Reviews, backfilled)? {
        return Ok(outcome);
    }

    store.save()?;
    info!(
        pull_requests = store.len(),
        "Synchronization complete"
    );
    Ok(SyncOutcome::Complete)
}

/// Save after a phase and turn its failure into an early outcome, if any.
fn settle(store: &CacheStore, phase: SyncPhase, result: Result<()>) -> Result<Option<SyncOutcome>> {
    let Err(err) = result else {
        return Ok(None);
    };

    store.save()?;
    match err {
        GhstatsError::Transport(reason) => {
            warn!(%phase, %reason, "Synchronization stopped early");
            Ok(Some(SyncOutcome::Incomplete { phase, reason }))
        }
        GhstatsError::RateLimited { reset_at } => {
            warn!(%phase, %reset_at, "API quota exhausted");
            Ok(Some(SyncOutcome::QuotaExhausted { reset_at }))
        }
        other => Err(other),
    }
}

/// Continue the creation-ordered sweep from the persisted cursor.
///
/// The cursor and the records of each page are saved together, so a run
/// killed between pages resumes at the next unread page.
async fn fetch_snapshot<T: Transport>(
    transport: &mut T,
    store: &mut CacheStore,
    page_budget: u32,
) -> Result<()> {
    let repository = store.repository().to_string();
    let mut page = store.last_snapshot_page_read() + 1;

    for _ in 0..page_budget {
        let fetched = fetch_page(transport, &repository, &PageQuery::snapshot(page)).await?;
        let changed = merge_page(store, &fetched.records);
        store.advance_snapshot_cursor(page);

        info!(
            page,
            total_pages = fetched.total_pages,
            records = fetched.records.len(),
            changed,
            "Fetched snapshot page"
        );

        if page >= fetched.total_pages {
            store.mark_snapshot_complete();
            store.save()?;
            info!(pull_requests = store.len(), "Snapshot complete");
            break;
        }
        store.save()?;
        page += 1;
    }

    Ok(())
}

/// Walk most-recently-updated pages until one holds no changes.
async fn fetch_deltas<T: Transport>(
    transport: &mut T,
    store: &mut CacheStore,
    page_budget: u32,
) -> Result<()> {
    let repository = store.repository().to_string();
    let mut last_page = page_budget;
    let mut page = 1;

    while page <= last_page {
        let fetched = fetch_page(transport, &repository, &PageQuery::delta(page)).await?;
        let changed = merge_page(store, &fetched.records);
        last_page = last_page.min(fetched.total_pages);

        info!(
            page,
            total_pages = fetched.total_pages,
            records = fetched.records.len(),
            changed,
            "Fetched delta page"
        );

        if changed == 0 {
            debug!(page, "page unchanged, older pages are already known");
            break;
        }
        page += 1;
    }

    Ok(())
}

/// Fetch reviews for every pull request whose reviews are stale.
async fn backfill_reviews<T: Transport>(transport: &mut T, store: &mut CacheStore) -> Result<()> {
    let pending = store.pending_review_fetches();
    if pending.is_empty() {
        return Ok(());
    }

    info!(count = pending.len(), "Fetching reviews");
    let repository = store.repository().to_string();
    for number in pending {
        let reviews = fetch_reviews(transport, &repository, number).await?;
        debug!(number, reviews = reviews.len(), "Fetched reviews");
        merge_reviews(store, number, &reviews);
    }

    Ok(())
}
