// Command line and environment configuration.
// Flags take precedence over environment variables, which take precedence over defaults.

use std::path::PathBuf;

use chrono::{DateTime, NaiveDate, Utc};
use clap::Parser;

use crate::cache;
use crate::error::{GhstatsError, Result};
use crate::github::GITHUB_API_BASE;
use crate::stats::StateFilter;

#[derive(Debug, Parser)]
#[command(name = "ghstats")]
#[command(version)]
#[command(about = "Per-reviewer pull request review statistics for a GitHub repository")]
#[command(
    long_about = "ghstats keeps a local cache of a repository's pull requests and review \
outcomes, fetching only what changed since the last run, and prints how often each \
requested reviewer approved, commented, or never reviewed."
)]
#[command(after_long_help = r#"EXAMPLES
    Fetch up to 10 pages and report closed pull requests:
        $ ghstats --pages=10 openenclave/openenclave

    Report from the cache without touching the network:
        $ ghstats --cached-only --state=all openenclave/openenclave

ENVIRONMENT VARIABLES
    GITHUB_TOKEN          Personal access token (optional, raises the rate limit)
    GHSTATS_CACHE_DIR     Cache directory (default: platform cache dir)
    GHSTATS_API_URL       API base URL (default: https://api.github.com)
    RUST_LOG              Log filter (overrides -v)
"#)]
pub struct Cli {
    /// Repository to report on, as owner/name
    #[arg(value_parser = parse_repository)]
    pub repository: String,

    /// Don't query GitHub, only use cached data
    #[arg(short, long)]
    pub cached_only: bool,

    /// Fetch at most this many pages of pull requests
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
    pub pages: u32,

    /// Count pull requests in this state
    #[arg(long, value_enum, default_value_t = StateFilter::Closed)]
    pub state: StateFilter,

    /// Only count pull requests updated since this date (RFC 3339 or YYYY-MM-DD)
    #[arg(long, value_parser = parse_since)]
    pub since: Option<DateTime<Utc>>,

    /// Directory holding the cache files
    #[arg(long, env = "GHSTATS_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// GitHub API base URL
    #[arg(long, env = "GHSTATS_API_URL", default_value = GITHUB_API_BASE)]
    pub api_url: String,

    /// GitHub token
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Path of the cache file for the selected repository.
    pub fn store_path(&self) -> Result<PathBuf> {
        let base = match &self.cache_dir {
            Some(dir) => dir.clone(),
            None => cache::cache_dir().ok_or_else(|| {
                GhstatsError::Other(
                    "could not determine a cache directory, pass --cache-dir".to_string(),
                )
            })?,
        };
        Ok(cache::store_path(&base, &self.repository))
    }

    /// Default log filter for the chosen verbosity.
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "ghstats=info",
            1 => "ghstats=debug",
            _ => "ghstats=trace",
        }
    }
}

fn parse_repository(value: &str) -> std::result::Result<String, String> {
    match value.split_once('/') {
        Some((owner, name)) if !owner.is_empty() && !name.is_empty() => Ok(value.to_string()),
        _ => Err(GhstatsError::InvalidRepository(value.to_string()).to_string()),
    }
}

fn parse_since(value: &str) -> std::result::Result<DateTime<Utc>, String> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .ok_or_else(|| format!("invalid date '{}', expected RFC 3339 or YYYY-MM-DD", value))
}
