//! Upsert coordinator
//!
//! Commits canonical triples into the record store. For each entity the
//! coordinator looks up rows sharing the identity key and decides:
//!
//! - no match: insert
//! - one match: update in place when any field differs, otherwise leave it
//! - several matches: refuse with an integrity violation
//!
//! The book is always decided first because its id is part of the price keys.

use crate::model::{CanonicalTriple, EntityKind, RecordId};
use crate::storage::{Entity, Session, SqliteStore, StorageError};
use serde::Deserialize;
use thiserror::Error;

/// What the coordinator did with one entity
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted(RecordId),
    Updated(RecordId),
    Unchanged(RecordId),
}

impl UpsertOutcome {
    /// Id of the row the outcome refers to
    pub fn id(&self) -> RecordId {
        match self {
            Self::Inserted(id) | Self::Updated(id) | Self::Unchanged(id) => *id,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Inserted(_) => "inserted",
            Self::Updated(_) => "updated",
            Self::Unchanged(_) => "unchanged",
        }
    }
}

/// Outcomes for the three records of one triple
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TripleReport {
    pub book: UpsertOutcome,
    pub price: UpsertOutcome,
    pub compare_price: UpsertOutcome,
}

/// Errors surfaced by a commit
#[derive(Debug, Error)]
pub enum UpsertError {
    #[error("{matches} {kind} rows share the identity key ({key})")]
    IntegrityViolation {
        kind: EntityKind,
        key: String,
        matches: usize,
    },

    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),

    #[error("Book {book_id} was committed but its prices were not: {source}")]
    PartialCommit {
        book_id: RecordId,
        #[source]
        source: Box<UpsertError>,
    },
}

impl UpsertError {
    /// Whether the failure comes from duplicate rows rather than the store itself
    pub fn is_integrity_violation(&self) -> bool {
        match self {
            Self::IntegrityViolation { .. } => true,
            Self::Persistence(_) => false,
            Self::PartialCommit { source, .. } => source.is_integrity_violation(),
        }
    }
}

/// How the writes of one triple are grouped into transactions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CommitMode {
    /// The book commits alone; both prices commit together afterwards
    #[default]
    Independent,
    /// All three records commit in one transaction
    Coupled,
}

impl CommitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Independent => "independent",
            Self::Coupled => "coupled",
        }
    }
}

/// Applies the 0/1/many rule for one entity inside an open session
///
/// # Arguments
///
/// * `session` - The open transaction
/// * `record` - The freshly extracted record
///
/// # Returns
///
/// * `Ok(UpsertOutcome)` - What happened to the stored row
/// * `Err(UpsertError)` - Duplicate rows or a store failure
pub fn upsert_entity<E: Entity>(
    session: &mut Session<'_>,
    record: &E,
) -> Result<UpsertOutcome, UpsertError> {
    let mut matches = session.find_by_key(record)?;

    match matches.len() {
        0 => {
            let id = session.insert(record)?;
            tracing::debug!(kind = %E::KIND, id, "inserted");
            Ok(UpsertOutcome::Inserted(id))
        }
        1 => {
            let existing = matches.remove(0);
            if existing.record == *record {
                tracing::trace!(kind = %E::KIND, id = existing.id, "unchanged");
                Ok(UpsertOutcome::Unchanged(existing.id))
            } else {
                session.update(existing.id, record)?;
                tracing::debug!(kind = %E::KIND, id = existing.id, "updated");
                Ok(UpsertOutcome::Updated(existing.id))
            }
        }
        n => Err(UpsertError::IntegrityViolation {
            kind: E::KIND,
            key: record.describe_key(),
            matches: n,
        }),
    }
}

/// Commits canonical triples into a shared store
#[derive(Clone)]
pub struct UpsertCoordinator {
    store: SqliteStore,
    mode: CommitMode,
}

impl UpsertCoordinator {
    pub fn new(store: SqliteStore, mode: CommitMode) -> Self {
        Self { store, mode }
    }

    pub fn mode(&self) -> CommitMode {
        self.mode
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    /// Commits one triple
    ///
    /// # Arguments
    ///
    /// * `triple` - The normalized output of one detail page
    ///
    /// # Returns
    ///
    /// * `Ok(TripleReport)` - Outcome per record
    /// * `Err(UpsertError)` - The unit of work was aborted
    pub fn commit(&self, triple: &CanonicalTriple) -> Result<TripleReport, UpsertError> {
        match self.mode {
            CommitMode::Coupled => self.store.unit_of_work(|session| {
                let book = upsert_entity(session, &triple.book)?;
                let (price, compare_price) = upsert_offer(session, triple, book.id())?;
                Ok(TripleReport {
                    book,
                    price,
                    compare_price,
                })
            }),
            CommitMode::Independent => {
                let book = self
                    .store
                    .unit_of_work(|session| upsert_entity(session, &triple.book))?;

                let (price, compare_price) = self
                    .store
                    .unit_of_work(|session| upsert_offer(session, triple, book.id()))
                    .map_err(|e| UpsertError::PartialCommit {
                        book_id: book.id(),
                        source: Box::new(e),
                    })?;

                Ok(TripleReport {
                    book,
                    price,
                    compare_price,
                })
            }
        }
    }
}

fn upsert_offer(
    session: &mut Session<'_>,
    triple: &CanonicalTriple,
    book_id: RecordId,
) -> Result<(UpsertOutcome, UpsertOutcome), UpsertError> {
    let price = upsert_entity(session, &triple.price_for(book_id))?;
    let compare_price = upsert_entity(session, &triple.compare_price_for(book_id))?;
    Ok((price, compare_price))
}
