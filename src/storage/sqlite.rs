//! SQLite record store
//!
//! All workers share one `SqliteStore`. Each unit of work takes the session lock,
//! opens an IMMEDIATE transaction, and releases both when it commits or rolls back,
//! so a find-then-insert can never interleave with another worker's.

use crate::crawler::{SourceStats, StopReason};
use crate::model::{EntityKind, RecordId, Stored};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Entity, StorageError, StorageResult};
use crate::storage::{RunRecord, RunStatus, SourceRunRecord};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction, TransactionBehavior};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// SQLite storage backend
#[derive(Clone)]
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

/// An open transaction on the store
///
/// Changes become visible when the unit of work that owns the session returns
/// `Ok`; any error drops the transaction, which rolls it back.
pub struct Session<'conn> {
    tx: Transaction<'conn>,
}

impl Session<'_> {
    /// Finds every row sharing the probe's identity key
    pub fn find_by_key<E: Entity>(&self, probe: &E) -> StorageResult<Vec<Stored<E>>> {
        Ok(E::find_by_key(&self.tx, probe)?)
    }

    /// Inserts a record and returns its generated id
    pub fn insert<E: Entity>(&mut self, record: &E) -> StorageResult<RecordId> {
        Ok(E::insert(&self.tx, record)?)
    }

    /// Overwrites the record stored under `id`
    pub fn update<E: Entity>(&mut self, id: RecordId, record: &E) -> StorageResult<()> {
        match E::update(&self.tx, id, record)? {
            0 => Err(StorageError::RecordNotFound { kind: E::KIND, id }),
            _ => Ok(()),
        }
    }
}

impl SqliteStore {
    /// Opens (or creates) the database at `path`
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStore)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self::from_connection(conn))
    }

    /// Creates an in-memory database
    pub fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self::from_connection(conn))
    }

    fn from_connection(conn: Connection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }

    /// Runs `work` inside one transaction
    ///
    /// The transaction commits when `work` returns `Ok` and rolls back otherwise.
    pub fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut Session<'_>) -> Result<T, E>,
        E: From<StorageError>,
    {
        let mut conn = self.lock()?;
        let tx = conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(StorageError::from)?;
        let mut session = Session { tx };

        let value = work(&mut session)?;

        session.tx.commit().map_err(StorageError::from)?;
        Ok(value)
    }

    /// Loads every stored record of one entity type
    pub fn load_all<E: Entity>(&self) -> StorageResult<Vec<Stored<E>>> {
        let conn = self.lock()?;
        Ok(E::load_all(&conn)?)
    }

    /// Counts the rows of one entity type
    pub fn count(&self, kind: EntityKind) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {}", kind.table()),
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Counts retailer price snapshots per retailer, busiest first
    pub fn retailer_breakdown(&self) -> StorageResult<Vec<(String, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT retailer_name, COUNT(*) FROM compare_prices
             GROUP BY retailer_name ORDER BY COUNT(*) DESC, retailer_name",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Run Management =====

    /// Creates a new run and returns its id
    pub fn create_run(&self, config_hash: &str) -> StorageResult<i64> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT INTO runs (started_at, config_hash, status) VALUES (?1, ?2, ?3)",
            params![now, config_hash, RunStatus::Running.to_db_string()],
        )?;
        Ok(conn.last_insert_rowid())
    }

    /// Marks a run as finished with the given status
    pub fn finish_run(&self, run_id: i64, status: RunStatus) -> StorageResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        let changed = conn.execute(
            "UPDATE runs SET status = ?1, finished_at = ?2 WHERE id = ?3",
            params![status.to_db_string(), now, run_id],
        )?;
        if changed == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    /// Gets a run by ID
    pub fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        let conn = self.lock()?;
        conn.query_row(
            "SELECT id, started_at, finished_at, config_hash, status FROM runs WHERE id = ?1",
            params![run_id],
            run_from_row,
        )
        .optional()?
        .ok_or(StorageError::RunNotFound(run_id))
    }

    /// Gets the most recent run
    pub fn latest_run(&self) -> StorageResult<Option<RunRecord>> {
        let conn = self.lock()?;
        let run = conn
            .query_row(
                "SELECT id, started_at, finished_at, config_hash, status
                 FROM runs ORDER BY id DESC LIMIT 1",
                [],
                run_from_row,
            )
            .optional()?;
        Ok(run)
    }

    /// Records how one source's crawl ended within a run
    pub fn record_source_run(&self, run_id: i64, stats: &SourceStats) -> StorageResult<()> {
        let conn = self.lock()?;
        let now = Utc::now().to_rfc3339();
        conn.execute(
            "INSERT OR REPLACE INTO source_runs (
                run_id, source, pages_fetched, items_seen, committed, extraction_failures,
                fetch_failures, integrity_violations, persistence_failures, stop_reason, finished_at
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                run_id,
                stats.source,
                stats.pages_fetched as i64,
                stats.items_seen as i64,
                stats.committed as i64,
                stats.extraction_failures as i64,
                stats.fetch_failures as i64,
                stats.integrity_violations as i64,
                stats.persistence_failures as i64,
                stats.stop_reason.to_db_string(),
                now
            ],
        )?;
        Ok(())
    }

    /// Gets the per-source records of a run, ordered by source name
    pub fn source_runs(&self, run_id: i64) -> StorageResult<Vec<SourceRunRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT run_id, source, pages_fetched, items_seen, committed, extraction_failures,
                    fetch_failures, integrity_violations, persistence_failures, stop_reason,
                    finished_at
             FROM source_runs WHERE run_id = ?1 ORDER BY source",
        )?;

        let rows = stmt
            .query_map(params![run_id], |row| {
                Ok(SourceRunRecord {
                    run_id: row.get(0)?,
                    stats: SourceStats {
                        source: row.get(1)?,
                        pages_fetched: row.get::<_, i64>(2)? as usize,
                        items_seen: row.get::<_, i64>(3)? as usize,
                        committed: row.get::<_, i64>(4)? as usize,
                        extraction_failures: row.get::<_, i64>(5)? as usize,
                        fetch_failures: row.get::<_, i64>(6)? as usize,
                        integrity_violations: row.get::<_, i64>(7)? as usize,
                        persistence_failures: row.get::<_, i64>(8)? as usize,
                        stop_reason: StopReason::from_db_string(&row.get::<_, String>(9)?)
                            .unwrap_or(StopReason::Exhausted),
                    },
                    finished_at: row.get(10)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}

fn run_from_row(row: &Row<'_>) -> rusqlite::Result<RunRecord> {
    Ok(RunRecord {
        id: row.get(0)?,
        started_at: row.get(1)?,
        finished_at: row.get(2)?,
        config_hash: row.get(3)?,
        status: RunStatus::from_db_string(&row.get::<_, String>(4)?)
            .unwrap_or(RunStatus::Running),
    })
}
