//! Geoharvest main entry point
//!
//! Command-line interface for the geoharvest place-discovery crawler.

use anyhow::Context;
use clap::Parser;
use geoharvest::config::load_config_with_hash;
use geoharvest::crawler::{crawl, AppContext};
use geoharvest::fetch::HttpFetchEngine;
use geoharvest::monitor::CpuMonitor;
use geoharvest::store::{DocumentStore, NewSearchTarget, SqliteStore};
use indicatif::MultiProgress;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Geoharvest: a resumable place-discovery crawler
///
/// Sweeps a partitioned set of search targets, discovers place URLs from each
/// result page, then extracts structured attributes per place. All progress
/// is durable, so interrupted runs simply continue where they left off.
#[derive(Parser, Debug)]
#[command(name = "geoharvest")]
#[command(version)]
#[command(about = "A resumable place-discovery crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Show store statistics and exit
    #[arg(long, conflicts_with_all = ["reset", "seed"])]
    stats: bool,

    /// Reset every search target back to 'entry' and exit
    #[arg(long, conflicts_with_all = ["stats", "seed"])]
    reset: bool,

    /// Import search targets from a JSON array file and exit
    #[arg(long, value_name = "FILE", conflicts_with_all = ["stats", "reset"])]
    seed: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) =
        load_config_with_hash(&cli.config).context("failed to load configuration")?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.stats {
        handle_stats(&config)?;
    } else if cli.reset {
        handle_reset(&config)?;
    } else if let Some(seed_path) = &cli.seed {
        handle_seed(&config, seed_path)?;
    } else {
        handle_crawl(config).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("geoharvest=info,warn"),
            1 => EnvFilter::new("geoharvest=debug,info"),
            2 => EnvFilter::new("geoharvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: prints store counts and exits
fn handle_stats(config: &geoharvest::config::Config) -> anyhow::Result<()> {
    let store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let summary = store.summary()?;

    println!("Database: {}\n", config.store.database_path);

    println!("Search targets:");
    for (status, count) in &summary.targets_by_status {
        println!("  {:<10} {}", status, count);
    }

    println!("\nPlaces:");
    for (status, count) in &summary.places_by_status {
        println!("  {:<10} {}", status, count);
    }

    println!("\nTotal places credited to targets: {}", summary.total_result_count);

    Ok(())
}

/// Handles the --reset mode: reverts all targets to 'entry'
fn handle_reset(config: &geoharvest::config::Config) -> anyhow::Result<()> {
    let mut store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let changed = store.reset_targets()?;
    println!("Reset {} search targets to 'entry'", changed);
    Ok(())
}

/// Handles the --seed mode: imports targets from a JSON array file
fn handle_seed(config: &geoharvest::config::Config, seed_path: &Path) -> anyhow::Result<()> {
    let content = std::fs::read_to_string(seed_path)
        .with_context(|| format!("failed to read {}", seed_path.display()))?;
    let targets: Vec<NewSearchTarget> =
        serde_json::from_str(&content).context("seed file must be a JSON array of targets")?;

    let mut store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let inserted = store.insert_targets(&targets)?;
    println!("Seeded {} search targets", inserted);
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: geoharvest::config::Config) -> anyhow::Result<()> {
    tracing::info!(
        "Running batch groups {}..={} (window {} records, chunk width {})",
        config.batch.first_group,
        config.batch.first_group + config.batch.group_count - 1,
        config.batch.batch_size,
        config.batch.scrap_batch_size
    );

    let store = SqliteStore::new(Path::new(&config.store.database_path))?;
    let engine = Arc::new(HttpFetchEngine::new()?);
    let monitor = CpuMonitor::spawn(config.monitor.clone());
    let ctx = AppContext::new(config, store, engine, monitor, MultiProgress::new());

    match crawl(&ctx).await {
        Ok(report) => {
            tracing::info!(
                "Crawl drained: {} targets completed, {} failed, {} places discovered",
                report.targets_completed,
                report.targets_failed,
                report.places_discovered
            );
            Ok(())
        }
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            Err(e.into())
        }
    }
}
