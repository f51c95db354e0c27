//! Storage traits and error types
//!
//! This module defines the trait interfaces for the frontier and page
//! stores, and the associated error types.

use crate::storage::{FrontierStats, PageRecord, UrlRecord};
use std::collections::HashSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Storage lock poisoned: {0}")]
    LockPoisoned(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// The shared URL frontier
///
/// Every operation is serialized inside the store, so implementations are
/// safe to call from many workers at once. Calls do not compose: a caller
/// that checks `is_discovered` and then fetches may race another worker
/// doing the same.
pub trait FrontierStore: Send + Sync {
    /// Claims up to `n` URLs that are neither discovered nor claimed
    ///
    /// Oldest `first_seen` first. The selected rows are marked claimed
    /// within the same critical section, so concurrent callers never receive
    /// the same URL. Returns an empty vector when nothing is available.
    fn claim_seeds(&self, n: usize) -> StorageResult<Vec<String>>;

    /// Inserts a fresh record for each URL not already present
    ///
    /// Existing records are left untouched.
    fn insert_if_absent(&self, urls: &HashSet<String>) -> StorageResult<()>;

    /// Sets `discovered` for each URL that is present and not yet discovered
    fn mark_discovered(&self, urls: &HashSet<String>) -> StorageResult<()>;

    /// Returns false when the URL is absent
    fn is_discovered(&self, url: &str) -> StorageResult<bool>;

    /// Point update of the retry flag; no-op when the URL is absent
    fn set_retry_allowed(&self, url: &str, value: bool) -> StorageResult<()>;

    /// Fetches a single record by URL
    fn get_record(&self, url: &str) -> StorageResult<Option<UrlRecord>>;

    /// Counts records by flag
    fn stats(&self) -> StorageResult<FrontierStats>;
}

/// Append-only sink for extracted page records
pub trait PageStore: Send + Sync {
    /// Appends a batch of page records
    fn insert_pages(&self, pages: &[PageRecord]) -> StorageResult<()>;

    /// Counts stored page records
    fn count_pages(&self) -> StorageResult<u64>;
}
