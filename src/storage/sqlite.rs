//! SQLite storage implementation
//!
//! This module provides SQLite-based implementations of the frontier and
//! page store traits. Each store owns one connection behind a mutex; holding
//! the mutex for the duration of a call is what serializes the call.

use crate::storage::schema::{initialize_frontier_schema, initialize_pages_schema};
use crate::storage::traits::{FrontierStore, PageStore, StorageError, StorageResult};
use crate::storage::{FrontierStats, PageRecord, UrlRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

/// Rows written per transaction by `insert_if_absent`
const INSERT_CHUNK_SIZE: usize = 50;

/// How long a connection waits on a locked database file before failing
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Opens a connection with the pragmas both stores share
fn open_connection(path: &Path) -> StorageResult<Connection> {
    let conn = Connection::open(path)?;

    // Configure SQLite for better performance
    conn.execute_batch(
        "
        PRAGMA journal_mode = WAL;
        PRAGMA synchronous = NORMAL;
        PRAGMA temp_store = MEMORY;
    ",
    )?;
    conn.busy_timeout(BUSY_TIMEOUT)?;

    Ok(conn)
}

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order
fn timestamp_now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(column: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(column, Type::Text, Box::new(e)))
}

fn lock_connection<'a>(
    conn: &'a Mutex<Connection>,
    store: &str,
) -> StorageResult<MutexGuard<'a, Connection>> {
    conn.lock()
        .map_err(|e| StorageError::LockPoisoned(format!("{} store: {}", store, e)))
}

/// SQLite-backed URL frontier
pub struct SqliteFrontierStore {
    conn: Mutex<Connection>,
}

impl SqliteFrontierStore {
    /// Opens or creates the frontier database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_frontier_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory frontier (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_frontier_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn, "frontier")
    }
}

impl FrontierStore for SqliteFrontierStore {
    fn claim_seeds(&self, n: usize) -> StorageResult<Vec<String>> {
        if n == 0 {
            return Ok(Vec::new());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let claimed = {
            let mut select = tx.prepare(
                "SELECT url FROM urls WHERE discovered = 0 AND claimed = 0
                 ORDER BY first_seen ASC, id ASC LIMIT ?1",
            )?;
            let urls = select
                .query_map(params![n as i64], |row| row.get::<_, String>(0))?
                .collect::<Result<Vec<_>, _>>()?;

            let mut update = tx.prepare("UPDATE urls SET claimed = 1 WHERE url = ?1")?;
            for url in &urls {
                update.execute(params![url])?;
            }
            urls
        };

        tx.commit()?;
        Ok(claimed)
    }

    fn insert_if_absent(&self, urls: &HashSet<String>) -> StorageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut ordered: Vec<&String> = urls.iter().collect();
        ordered.sort();

        let mut conn = self.lock()?;
        for chunk in ordered.chunks(INSERT_CHUNK_SIZE) {
            let tx = conn.transaction()?;
            {
                let now = timestamp_now();
                let mut insert =
                    tx.prepare("INSERT OR IGNORE INTO urls (url, first_seen) VALUES (?1, ?2)")?;
                for url in chunk {
                    insert.execute(params![url, now])?;
                }
            }
            tx.commit()?;
        }

        Ok(())
    }

    fn mark_discovered(&self, urls: &HashSet<String>) -> StorageResult<()> {
        if urls.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let mut update =
                tx.prepare("UPDATE urls SET discovered = 1 WHERE url = ?1 AND discovered = 0")?;
            for url in urls {
                update.execute(params![url])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn is_discovered(&self, url: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let discovered: Option<bool> = conn
            .query_row(
                "SELECT discovered FROM urls WHERE url = ?1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;

        Ok(discovered.unwrap_or(false))
    }

    fn set_retry_allowed(&self, url: &str, value: bool) -> StorageResult<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE urls SET retry_allowed = ?1 WHERE url = ?2",
            params![value, url],
        )?;
        Ok(())
    }

    fn get_record(&self, url: &str) -> StorageResult<Option<UrlRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT url, first_seen, discovered, claimed, retry_allowed FROM urls WHERE url = ?1",
                params![url],
                |row| {
                    let first_seen: String = row.get(1)?;
                    Ok(UrlRecord {
                        url: row.get(0)?,
                        first_seen: parse_timestamp(1, &first_seen)?,
                        discovered: row.get(2)?,
                        claimed: row.get(3)?,
                        retry_allowed: row.get(4)?,
                    })
                },
            )
            .optional()?;

        Ok(record)
    }

    fn stats(&self) -> StorageResult<FrontierStats> {
        let conn = self.lock()?;
        let stats = conn.query_row(
            "SELECT COUNT(*),
                    COALESCE(SUM(discovered), 0),
                    COALESCE(SUM(claimed), 0),
                    COALESCE(SUM(CASE WHEN discovered = 0 AND claimed = 0 THEN 1 ELSE 0 END), 0),
                    COALESCE(SUM(CASE WHEN retry_allowed = 0 THEN 1 ELSE 0 END), 0)
             FROM urls",
            [],
            |row| {
                Ok(FrontierStats {
                    total: row.get::<_, i64>(0)? as u64,
                    discovered: row.get::<_, i64>(1)? as u64,
                    claimed: row.get::<_, i64>(2)? as u64,
                    available: row.get::<_, i64>(3)? as u64,
                    retry_suppressed: row.get::<_, i64>(4)? as u64,
                })
            },
        )?;

        Ok(stats)
    }
}

/// SQLite-backed page record sink
pub struct SqlitePageStore {
    conn: Mutex<Connection>,
}

impl SqlitePageStore {
    /// Opens or creates the page database at `path`
    pub fn open(path: &Path) -> StorageResult<Self> {
        let conn = open_connection(path)?;
        initialize_pages_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory page store (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_pages_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        lock_connection(&self.conn, "page")
    }

    /// Loads every stored page record in insertion order
    pub fn all_pages(&self) -> StorageResult<Vec<PageRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, title, description, keywords, headers, image_captions, child_urls
             FROM pages ORDER BY id ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                    row.get::<_, String>(4)?,
                    row.get::<_, String>(5)?,
                    row.get::<_, String>(6)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut pages = Vec::with_capacity(rows.len());
        for (url, title, description, keywords, headers, captions, children) in rows {
            pages.push(PageRecord {
                url,
                title,
                description,
                keywords: serde_json::from_str(&keywords)?,
                headers: serde_json::from_str::<BTreeSet<String>>(&headers)?,
                image_captions: serde_json::from_str::<BTreeSet<String>>(&captions)?,
                child_urls: serde_json::from_str::<BTreeSet<String>>(&children)?,
            });
        }

        Ok(pages)
    }
}

impl PageStore for SqlitePageStore {
    fn insert_pages(&self, pages: &[PageRecord]) -> StorageResult<()> {
        if pages.is_empty() {
            return Ok(());
        }

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        {
            let now = timestamp_now();
            let mut insert = tx.prepare(
                "INSERT INTO pages
                 (url, title, description, keywords, headers, image_captions, child_urls, stored_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            )?;
            for page in pages {
                insert.execute(params![
                    page.url,
                    page.title,
                    page.description,
                    serde_json::to_string(&page.keywords)?,
                    serde_json::to_string(&page.headers)?,
                    serde_json::to_string(&page.image_captions)?,
                    serde_json::to_string(&page.child_urls)?,
                    now,
                ])?;
            }
        }
        tx.commit()?;

        Ok(())
    }

    fn count_pages(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM pages", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn url_set(urls: &[&str]) -> HashSet<String> {
        urls.iter().map(|u| u.to_string()).collect()
    }

    fn row_count(store: &SqliteFrontierStore, url: &str) -> i64 {
        let conn = store.lock().unwrap();
        conn.query_row(
            "SELECT COUNT(*) FROM urls WHERE url = ?1",
            params![url],
            |row| row.get(0),
        )
        .unwrap()
    }

    #[test]
    fn test_insert_if_absent_creates_fresh_records() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store
            .insert_if_absent(&url_set(&["https://a.test", "https://b.test"]))
            .unwrap();

        let record = store.get_record("https://a.test").unwrap().unwrap();
        assert!(!record.discovered);
        assert!(!record.claimed);
        assert!(record.retry_allowed);
        assert_eq!(store.stats().unwrap().total, 2);
    }

    #[test]
    fn test_insert_duplicate_leaves_existing_fields() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.insert_if_absent(&url_set(&["https://a.test"])).unwrap();
        store.mark_discovered(&url_set(&["https://a.test"])).unwrap();
        store.set_retry_allowed("https://a.test", false).unwrap();
        let before = store.get_record("https://a.test").unwrap().unwrap();

        store
            .insert_if_absent(&url_set(&["https://a.test", "https://b.test"]))
            .unwrap();

        assert_eq!(row_count(&store, "https://a.test"), 1);
        let after = store.get_record("https://a.test").unwrap().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn test_insert_spans_multiple_chunks() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        let urls: HashSet<String> = (0..(INSERT_CHUNK_SIZE * 2 + 7))
            .map(|i| format!("https://site{}.test", i))
            .collect();

        store.insert_if_absent(&urls).unwrap();

        assert_eq!(store.stats().unwrap().total, urls.len() as u64);
    }

    #[test]
    fn test_claim_seeds_oldest_first() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.insert_if_absent(&url_set(&["https://old.test"])).unwrap();
        thread::sleep(Duration::from_millis(5));
        store.insert_if_absent(&url_set(&["https://new.test"])).unwrap();

        assert_eq!(store.claim_seeds(1).unwrap(), vec!["https://old.test"]);
        assert_eq!(store.claim_seeds(1).unwrap(), vec!["https://new.test"]);
        assert!(store.claim_seeds(1).unwrap().is_empty());
    }

    #[test]
    fn test_claim_seeds_marks_claimed() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.insert_if_absent(&url_set(&["https://a.test"])).unwrap();

        store.claim_seeds(5).unwrap();

        let record = store.get_record("https://a.test").unwrap().unwrap();
        assert!(record.claimed);
        assert!(!record.discovered);
    }

    #[test]
    fn test_claim_seeds_skips_discovered() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store
            .insert_if_absent(&url_set(&["https://a.test", "https://b.test"]))
            .unwrap();
        store.mark_discovered(&url_set(&["https://a.test"])).unwrap();

        assert_eq!(store.claim_seeds(10).unwrap(), vec!["https://b.test"]);
    }

    #[test]
    fn test_claim_seeds_empty_store() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        assert!(store.claim_seeds(3).unwrap().is_empty());
        assert!(store.claim_seeds(0).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_claims_are_disjoint() {
        let store = Arc::new(SqliteFrontierStore::new_in_memory().unwrap());
        let urls: HashSet<String> = (0..40).map(|i| format!("https://s{}.test", i)).collect();
        store.insert_if_absent(&urls).unwrap();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.claim_seeds(5).unwrap())
            })
            .collect();

        let mut seen = HashSet::new();
        let mut total = 0;
        for handle in handles {
            for url in handle.join().unwrap() {
                total += 1;
                assert!(seen.insert(url), "URL claimed twice");
            }
        }

        assert_eq!(total, 40);
        assert_eq!(store.stats().unwrap().available, 0);
    }

    #[test]
    fn test_mark_discovered_is_idempotent() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.insert_if_absent(&url_set(&["https://a.test"])).unwrap();

        store.mark_discovered(&url_set(&["https://a.test"])).unwrap();
        store.mark_discovered(&url_set(&["https://a.test"])).unwrap();

        assert!(store.is_discovered("https://a.test").unwrap());
        assert_eq!(store.stats().unwrap().discovered, 1);
    }

    #[test]
    fn test_mark_discovered_ignores_absent_urls() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.mark_discovered(&url_set(&["https://ghost.test"])).unwrap();

        assert!(!store.is_discovered("https://ghost.test").unwrap());
        assert!(store.get_record("https://ghost.test").unwrap().is_none());
    }

    #[test]
    fn test_set_retry_allowed() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store.insert_if_absent(&url_set(&["https://a.test"])).unwrap();

        store.set_retry_allowed("https://a.test", false).unwrap();
        assert!(!store.get_record("https://a.test").unwrap().unwrap().retry_allowed);

        store.set_retry_allowed("https://a.test", true).unwrap();
        assert!(store.get_record("https://a.test").unwrap().unwrap().retry_allowed);

        // Absent URL is a no-op
        store.set_retry_allowed("https://ghost.test", false).unwrap();
        assert_eq!(store.stats().unwrap().total, 1);
    }

    #[test]
    fn test_stats() {
        let store = SqliteFrontierStore::new_in_memory().unwrap();
        store
            .insert_if_absent(&url_set(&["https://a.test", "https://b.test", "https://c.test"]))
            .unwrap();
        store.mark_discovered(&url_set(&["https://a.test"])).unwrap();
        store.set_retry_allowed("https://a.test", false).unwrap();
        store.claim_seeds(1).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.discovered, 1);
        assert_eq!(stats.claimed, 1);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.retry_suppressed, 1);
    }

    #[test]
    fn test_page_store_roundtrip() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        let page = PageRecord {
            url: "https://ex.com".to_string(),
            title: "Example".to_string(),
            description: "An example".to_string(),
            keywords: vec!["a".to_string(), "b".to_string()],
            headers: ["A", "B"].iter().map(|s| s.to_string()).collect(),
            image_captions: ["cap"].iter().map(|s| s.to_string()).collect(),
            child_urls: ["https://ex.com/x"].iter().map(|s| s.to_string()).collect(),
        };

        store.insert_pages(&[page.clone()]).unwrap();
        store.insert_pages(&[]).unwrap();

        assert_eq!(store.count_pages().unwrap(), 1);
        assert_eq!(store.all_pages().unwrap(), vec![page]);
    }

    #[test]
    fn test_page_store_is_append_only() {
        let store = SqlitePageStore::new_in_memory().unwrap();
        let page = PageRecord {
            url: "https://ex.com".to_string(),
            ..Default::default()
        };

        store.insert_pages(&[page.clone()]).unwrap();
        store.insert_pages(&[page]).unwrap();

        assert_eq!(store.count_pages().unwrap(), 2);
    }

    #[test]
    fn test_open_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("url.db");

        {
            let store = SqliteFrontierStore::open(&path).unwrap();
            store.insert_if_absent(&url_set(&["https://a.test"])).unwrap();
        }

        let reopened = SqliteFrontierStore::open(&path).unwrap();
        assert!(reopened.get_record("https://a.test").unwrap().is_some());
    }
}
