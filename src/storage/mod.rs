//! Storage module for persisting canonical records
//!
//! This module is the record store boundary of the pipeline:
//! - SQLite database initialization and schema management
//! - Identity-key lookups, inserts and updates inside scoped transactions
//! - Run and per-source bookkeeping

mod entities;
mod schema;
mod sqlite;
mod traits;

pub use sqlite::{Session, SqliteStore};
pub use traits::{Entity, StorageError, StorageResult};

use crate::crawler::SourceStats;

/// Represents a pipeline run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub started_at: String,
    pub finished_at: Option<String>,
    pub config_hash: String,
    pub status: RunStatus,
}

/// The outcome of one source within a run
#[derive(Debug, Clone)]
pub struct SourceRunRecord {
    pub run_id: i64,
    pub stats: SourceStats,
    pub finished_at: String,
}

/// Status of a pipeline run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}
