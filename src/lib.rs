//! Bookmatch: a multi-storefront book price aggregator
//!
//! This crate crawls the listings of several book retailers, extracts each product
//! page into a canonical record, and upserts the records into a shared SQLite store
//! so repeated runs converge instead of duplicating data.

pub mod config;
pub mod crawler;
pub mod model;
pub mod output;
pub mod renderer;
pub mod sources;
pub mod storage;
pub mod upsert;

use thiserror::Error;

/// Main error type for Bookmatch operations
#[derive(Debug, Error)]
pub enum BookmatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Renderer error: {0}")]
    Render(#[from] renderer::RenderError),

    #[error("Unknown source adapter: {0}")]
    UnknownSource(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Unknown source '{0}'")]
    UnknownSource(String),
}

/// Why a single detail page could not be turned into a canonical record
///
/// Extraction failures are scoped to one item: the crawl runner records them and
/// moves on to the next URL.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractionFailure {
    #[error("missing {field}: nothing matched `{selector}`")]
    MissingElement { field: &'static str, selector: String },

    #[error("missing {field}: `{selector}` has no `{attribute}` attribute")]
    MissingAttribute {
        field: &'static str,
        selector: String,
        attribute: &'static str,
    },

    #[error("{field} is empty")]
    EmptyField { field: &'static str },

    #[error("cannot parse {field} from {value:?}: {reason}")]
    Unparsable {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("invalid selector `{selector}`: {reason}")]
    InvalidSelector { selector: String, reason: String },
}

/// Result type alias for Bookmatch operations
pub type Result<T> = std::result::Result<T, BookmatchError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CrawlRunner, Orchestrator, RunSummary, SourceStats};
pub use model::{Book, CanonicalTriple, ComparePrice, Offer, Price};
pub use sources::SourceAdapter;
pub use storage::SqliteStore;
pub use upsert::{CommitMode, UpsertCoordinator, UpsertError, UpsertOutcome};
