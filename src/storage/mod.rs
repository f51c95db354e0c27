//! Storage module for persisting crawl data
//!
//! This module handles all database operations for the crawler:
//! - The shared URL frontier (every URL ever seen, with claim/discovery flags)
//! - The append-only page record sink
//!
//! Both stores serialize each call internally and may be shared between
//! workers behind an `Arc`. No atomicity is provided across calls.

mod schema;
mod sqlite;
mod traits;

pub use sqlite::{SqliteFrontierStore, SqlitePageStore};
pub use traits::{FrontierStore, PageStore, StorageError, StorageResult};

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::path::Path;

/// Opens (or creates) the frontier database at `path`
pub fn open_frontier(path: &Path) -> StorageResult<SqliteFrontierStore> {
    SqliteFrontierStore::open(path)
}

/// Opens (or creates) the page database at `path`
pub fn open_pages(path: &Path) -> StorageResult<SqlitePageStore> {
    SqlitePageStore::open(path)
}

/// A row of the URL frontier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlRecord {
    pub url: String,
    pub first_seen: DateTime<Utc>,
    /// A fetch attempt for this URL has completed
    pub discovered: bool,
    /// Handed to a worker as a seed
    pub claimed: bool,
    /// Cleared when a fetch returned a non-success status
    pub retry_allowed: bool,
}

/// Structured content extracted from one successfully parsed page
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageRecord {
    pub url: String,
    pub title: String,
    pub description: String,
    pub keywords: Vec<String>,
    pub headers: BTreeSet<String>,
    pub image_captions: BTreeSet<String>,
    pub child_urls: BTreeSet<String>,
}

/// Aggregate counts over the frontier table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrontierStats {
    pub total: u64,
    pub discovered: u64,
    pub claimed: u64,
    /// Unclaimed and undiscovered, i.e. still available as seeds
    pub available: u64,
    pub retry_suppressed: u64,
}
