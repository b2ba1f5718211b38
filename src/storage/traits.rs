//! Storage traits and error types
//!
//! This module defines how canonical records map onto the record store and the
//! errors the store can report.

use crate::model::{EntityKind, RecordId, Stored};
use rusqlite::Connection;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{kind} {id} not found")]
    RecordNotFound { kind: EntityKind, id: RecordId },

    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("Store session lock poisoned")]
    LockPoisoned,
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// A record type the store can look up by identity key, insert and update
///
/// The `find_by_key` query matches every row sharing the probe's identity key;
/// callers decide what zero, one or several matches mean.
pub trait Entity: Clone + PartialEq + Sized {
    /// Which table this entity lives in
    const KIND: EntityKind;

    /// Human-readable identity key, used in error reports
    fn describe_key(&self) -> String;

    /// Finds all rows whose identity key equals the probe's
    fn find_by_key(conn: &Connection, probe: &Self) -> rusqlite::Result<Vec<Stored<Self>>>;

    /// Inserts a new row and returns its generated id
    fn insert(conn: &Connection, record: &Self) -> rusqlite::Result<RecordId>;

    /// Overwrites the row `id`, returning the number of rows changed
    fn update(conn: &Connection, id: RecordId, record: &Self) -> rusqlite::Result<usize>;

    /// Loads every row of this entity, ordered by id
    fn load_all(conn: &Connection) -> rusqlite::Result<Vec<Stored<Self>>>;
}
