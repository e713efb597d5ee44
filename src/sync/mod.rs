// Synchronization engine.
// Mirrors remote pull request and review metadata into the cache store.

pub mod controller;
pub mod merge;


pub use controller::{SyncOutcome, SyncPhase, synchronize};
pub use merge::{merge_page, merge_pull_request, merge_reviews};
