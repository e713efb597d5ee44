// ghstats entry point.
// Loads the cache, synchronizes unless cached-only, and prints the tally.

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

use ghstats::Result;
use ghstats::cache::CacheStore;
use ghstats::config::Cli;
use ghstats::github::GitHubClient;
use ghstats::stats::{compute_stats, render_tally};
use ghstats::sync::{SyncOutcome, synchronize};

/// Exit code when synchronization stopped early and no tally was printed.
const EXIT_INCOMPLETE: u8 = 2;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let env_filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(cli.log_filter()),
    };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode> {
    let path = cli.store_path()?;
    let mut store = CacheStore::load(&path, &cli.repository)?;
    info!(
        path = %path.display(),
        pull_requests = store.len(),
        snapshot_complete = store.snapshot_complete(),
        "Loaded cache"
    );

    if !cli.cached_only {
        let mut client = GitHubClient::new(&cli.api_url, cli.token.as_deref())?;
        let outcome = synchronize(&mut client, &mut store, cli.pages).await?;
        let quota = client.rate_limit();
        debug!(remaining = quota.remaining, limit = quota.limit, "API quota after sync");

        match &outcome {
            SyncOutcome::Complete => {}
            SyncOutcome::QuotaExhausted { reset_at } => {
                eprintln!("Rate limit will reset at {}", reset_at);
            }
            SyncOutcome::Incomplete { phase, reason } => {
                warn!(%phase, %reason, "Synchronization incomplete");
            }
        }

        if !outcome.is_success() {
            println!(
                "Synchronization incomplete: {}% of pull requests have reviews fetched",
                store.completion_percentage()
            );
            println!("Run again to continue, or pass --cached-only to report from the cache.");
            return Ok(ExitCode::from(EXIT_INCOMPLETE));
        }
    }

    let stats = compute_stats(&store, cli.state, cli.since);
    print!("{}", render_tally(&stats));
    Ok(ExitCode::SUCCESS)
}
