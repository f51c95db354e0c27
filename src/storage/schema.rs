//! Database schema definitions
//!
//! The frontier and the page records live in separate SQLite files so the
//! page sink can be swapped out without touching frontier state.

/// SQL schema for the frontier database
pub const FRONTIER_SCHEMA_SQL: &str = r#"
-- Every URL ever seen by any worker
CREATE TABLE IF NOT EXISTS urls (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL UNIQUE,
    first_seen TEXT NOT NULL,
    discovered INTEGER NOT NULL DEFAULT 0,
    claimed INTEGER NOT NULL DEFAULT 0,
    retry_allowed INTEGER NOT NULL DEFAULT 1
);

CREATE INDEX IF NOT EXISTS idx_urls_available ON urls(discovered, claimed, first_seen);
"#;

/// SQL schema for the page database
pub const PAGES_SCHEMA_SQL: &str = r#"
-- Extracted page records, append only
CREATE TABLE IF NOT EXISTS pages (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    url TEXT NOT NULL,
    title TEXT NOT NULL,
    description TEXT NOT NULL,
    keywords TEXT NOT NULL,
    headers TEXT NOT NULL,
    image_captions TEXT NOT NULL,
    child_urls TEXT NOT NULL,
    stored_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_pages_url ON pages(url);
"#;

/// Initializes the frontier schema
pub fn initialize_frontier_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(FRONTIER_SCHEMA_SQL)?;
    Ok(())
}

/// Initializes the page schema
pub fn initialize_pages_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(PAGES_SCHEMA_SQL)?;
    Ok(())
}
