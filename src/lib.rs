//! ghstats: incremental GitHub pull request review mirror and per-reviewer statistics.

pub mod cache;
pub mod config;
pub mod error;
pub mod github;
pub mod stats;
pub mod sync;

#[cfg(test)]
mod test_utils;

pub use error::{GhstatsError, Result};
