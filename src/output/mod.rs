//! Output module for reporting on crawl results
//!
//! This module handles:
//! - Loading aggregate statistics from the frontier and page stores
//! - Printing those statistics and per-worker crawl summaries

pub mod stats;

pub use stats::{load_statistics, print_crawl_report, print_statistics, CrawlStatistics};
