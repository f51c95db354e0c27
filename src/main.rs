//! Driftnet main entry point
//!
//! This is the command-line interface for the Driftnet crawler.

use anyhow::Context;
use clap::Parser;
use driftnet::config::{load_config_with_hash, validate_seeds, Config};
use driftnet::crawler::Coordinator;
use driftnet::output::{load_statistics, print_crawl_report, print_statistics};
use driftnet::storage::{open_frontier, open_pages};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Driftnet: a concurrent crawler over a shared URL frontier
///
/// Driftnet runs a fixed pool of workers that claim seed URLs from a
/// persisted frontier, fetch pages, record their metadata and outbound
/// links, and feed newly seen URLs back into the frontier.
#[derive(Parser, Debug)]
#[command(name = "driftnet")]
#[command(version)]
#[command(about = "A concurrent crawler over a shared URL frontier", long_about = None)]
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

    /// Add a seed URL to the frontier before crawling (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the databases and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    validate_seeds(&cli.seeds).context("Invalid --seed argument")?;

    if cli.dry_run {
        handle_dry_run(&config, &cli.seeds);
    } else if cli.stats {
        handle_stats(&config)?;
    } else {
        handle_crawl(config, cli.seeds).await?;
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("driftnet=info,warn"),
            1 => EnvFilter::new("driftnet=debug,info"),
            2 => EnvFilter::new("driftnet=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, extra_seeds: &[String]) {
    println!("=== Driftnet Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!("  Fetch budget per worker: {}", config.crawler.fetch_budget);
    println!("  Initial seeds per worker: {}", config.crawler.initial_seeds);
    println!("  Flush interval: {} iterations", config.crawler.flush_interval);
    println!("  Minimum URL flush batch: {}", config.crawler.min_flush_batch);
    println!("  Iteration delay: {}ms", config.crawler.iteration_delay_ms);

    println!("\nFetch:");
    println!("  User agent: {}", config.fetch.user_agent);
    println!("  Timeout: {}s", config.fetch.timeout_secs);
    println!("  Connect timeout: {}s", config.fetch.connect_timeout_secs);
    println!("  Max redirects: {}", config.fetch.max_redirects);

    println!("\nStorage:");
    println!("  Frontier: {}", config.storage.frontier_path);
    println!("  Pages: {}", config.storage.pages_path);

    let seeds: Vec<&String> = config.seeds.iter().chain(extra_seeds).collect();
    println!("\nBootstrap Seeds ({}):", seeds.len());
    for seed in &seeds {
        println!("  - {}", seed);
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would start {} workers with up to {} fetches each",
        config.crawler.workers, config.crawler.fetch_budget
    );
}

/// Handles the --stats mode: shows statistics from the databases
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Frontier: {}", config.storage.frontier_path);
    println!("Pages: {}\n", config.storage.pages_path);

    let frontier = open_frontier(Path::new(&config.storage.frontier_path))
        .context("Failed to open frontier database")?;
    let pages = open_pages(Path::new(&config.storage.pages_path))
        .context("Failed to open page database")?;

    let stats = load_statistics(&frontier, &pages)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, extra_seeds: Vec<String>) -> anyhow::Result<()> {
    tracing::info!(
        "Workers: {}, budget: {}, seeds from config: {}, from command line: {}",
        config.crawler.workers,
        config.crawler.fetch_budget,
        config.seeds.len(),
        extra_seeds.len()
    );

    let report = Coordinator::new(config)
        .context("Failed to open crawl stores")?
        .with_seeds(extra_seeds)
        .run()
        .await
        .map_err(|e| {
            tracing::error!("Crawl failed: {}", e);
            e
        })?;

    print_crawl_report(&report);

    Ok(())
}
