//! Crawler module for web page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with redirect following
//! - HTML extraction of metadata, headers, captions and links
//! - The per-worker crawl loop
//! - Overall crawl coordination

mod coordinator;
mod extractor;
mod fetcher;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlReport};
pub use extractor::{
    Extraction, ExtractionError, Extractor, HtmlExtractor, MetaField, MetaRule,
    DEFAULT_META_RULES,
};
pub use fetcher::{build_http_client, fetch_url, FetchError, FetchedPage, SUCCESS_STATUS};
pub use worker::{CrawlContext, VisitOutcome, Worker, WorkerReport, WorkerSettings};

use crate::config::Config;
use crate::DriftnetError;

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the frontier and page stores
/// 2. Insert any configured seed URLs into the frontier
/// 3. Build the HTTP client
/// 4. Seed and run the worker pool
/// 5. Wait for every worker to finish
///
/// # Arguments
///
/// * `config` - The crawler configuration
///
/// # Returns
///
/// * `Ok(CrawlReport)` - Crawl completed successfully
/// * `Err(DriftnetError)` - A store failed or a worker panicked
pub async fn crawl(config: Config) -> Result<CrawlReport, DriftnetError> {
    run_crawl(config).await
}
