//! Statistics generation from the crawl databases
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::crawler::CrawlReport;
use crate::storage::{FrontierStats, FrontierStore, PageStore};
use crate::DriftnetError;

/// Crawl statistics summary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlStatistics {
    /// Counts over the URL frontier
    pub frontier: FrontierStats,

    /// Number of stored page records
    pub total_pages: u64,
}

impl CrawlStatistics {
    /// Percentage of known URLs that have had a fetch attempt
    pub fn discovered_percentage(&self) -> f64 {
        percentage(self.frontier.discovered, self.frontier.total)
    }

    /// Percentage of attempted URLs that produced a page record
    pub fn success_rate(&self) -> f64 {
        percentage(self.total_pages, self.frontier.discovered)
    }
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Loads statistics from both stores
///
/// # Arguments
///
/// * `frontier` - The URL frontier to query
/// * `pages` - The page record store to query
///
/// # Returns
///
/// * `Ok(CrawlStatistics)` - Successfully loaded statistics
/// * `Err(DriftnetError)` - Failed to query a store
pub fn load_statistics(
    frontier: &dyn FrontierStore,
    pages: &dyn PageStore,
) -> Result<CrawlStatistics, DriftnetError> {
    Ok(CrawlStatistics {
        frontier: frontier.stats()?,
        total_pages: pages.count_pages()?,
    })
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    println!("=== Crawl Statistics ===\n");

    println!("Frontier:");
    println!("  Total URLs known: {}", stats.frontier.total);
    println!(
        "  Discovered: {} ({:.1}%)",
        stats.frontier.discovered,
        stats.discovered_percentage()
    );
    println!("  Claimed as seeds: {}", stats.frontier.claimed);
    println!("  Available as seeds: {}", stats.frontier.available);
    println!("  Retry suppressed: {}", stats.frontier.retry_suppressed);
    println!();

    println!("Pages:");
    println!("  Records stored: {}", stats.total_pages);
    println!();

    println!(
        "Success Rate: {:.1}% ({} / {} attempted URLs produced a record)",
        stats.success_rate(),
        stats.total_pages,
        stats.frontier.discovered
    );
}

/// Prints the per-worker summary of a finished crawl
pub fn print_crawl_report(report: &CrawlReport) {
    println!("=== Crawl Summary ===\n");

    for worker in &report.workers {
        println!(
            "  Worker {:>3}: {} seeds, {} iterations, {} pages, {} records, {} skipped, {} failed",
            worker.worker,
            worker.seeds,
            worker.iterations,
            worker.pages_crawled,
            worker.records_produced,
            worker.skipped,
            worker.transport_failures + worker.extraction_failures + worker.status_failures
        );
    }
    println!();

    println!("Seeds bootstrapped: {}", report.bootstrapped);
    println!("Pages fetched: {}", report.pages_crawled());
    println!("Records produced: {}", report.records_produced());
    println!("Failures: {}", report.failures());
    println!("Elapsed: {:.1}s", report.elapsed.as_secs_f64());
}
