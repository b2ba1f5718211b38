//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Bookmatch database.

/// SQL schema for the database
///
/// Identity keys are indexed, not UNIQUE. The upsert coordinator enforces
/// uniqueness and reports pre-existing duplicates as integrity violations.
pub const SCHEMA_SQL: &str = r#"
-- Track crawl runs
CREATE TABLE IF NOT EXISTS runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    started_at TEXT NOT NULL,
    finished_at TEXT,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL
);

-- Per-source outcome of a run
CREATE TABLE IF NOT EXISTS source_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    run_id INTEGER NOT NULL REFERENCES runs(id),
    source TEXT NOT NULL,
    pages_fetched INTEGER NOT NULL DEFAULT 0,
    items_seen INTEGER NOT NULL DEFAULT 0,
    committed INTEGER NOT NULL DEFAULT 0,
    extraction_failures INTEGER NOT NULL DEFAULT 0,
    fetch_failures INTEGER NOT NULL DEFAULT 0,
    integrity_violations INTEGER NOT NULL DEFAULT 0,
    persistence_failures INTEGER NOT NULL DEFAULT 0,
    stop_reason TEXT NOT NULL,
    finished_at TEXT NOT NULL,
    UNIQUE(run_id, source)
);

CREATE INDEX IF NOT EXISTS idx_source_runs_run ON source_runs(run_id);

-- Canonical books
CREATE TABLE IF NOT EXISTS books (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    author TEXT NOT NULL,
    description TEXT NOT NULL,
    publication_date TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_books_identity ON books(title, author);

-- Latest price seen at a source URL
CREATE TABLE IF NOT EXISTS prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    price TEXT NOT NULL,
    image_url TEXT NOT NULL,
    source_url TEXT NOT NULL,
    book_id INTEGER NOT NULL REFERENCES books(id)
);

CREATE INDEX IF NOT EXISTS idx_prices_identity ON prices(source_url, book_id, image_url);

-- Per-retailer price snapshots
CREATE TABLE IF NOT EXISTS compare_prices (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    price TEXT NOT NULL,
    image_url TEXT NOT NULL,
    source_url TEXT NOT NULL,
    book_id INTEGER NOT NULL REFERENCES books(id),
    retailer_name TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_compare_prices_identity
    ON compare_prices(source_url, book_id, retailer_name, image_url);
CREATE INDEX IF NOT EXISTS idx_compare_prices_book ON compare_prices(book_id);
"#;

/// Initializes the database schema
///
/// # Arguments
///
/// * `conn` - The database connection
///
/// # Returns
///
/// * `Ok(())` - Schema initialized successfully
/// * `Err(rusqlite::Error)` - Failed to initialize schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
