//! Statistics generation from the record store
//!
//! This module provides functionality for extracting and displaying
//! record counts and run history from the storage layer.

use crate::model::EntityKind;
use crate::storage::{RunRecord, SourceRunRecord, SqliteStore, StorageResult};

/// Record store statistics summary
#[derive(Debug, Clone)]
pub struct RunStatistics {
    pub books: u64,
    pub prices: u64,
    pub compare_prices: u64,

    /// Compare-price rows per retailer, largest first
    pub by_retailer: Vec<(String, u64)>,

    /// Most recent run, if any
    pub latest_run: Option<RunRecord>,

    /// Per-source outcomes of the latest run
    pub latest_sources: Vec<SourceRunRecord>,
}

/// Loads statistics from the store
///
/// # Arguments
///
/// * `store` - The record store to query
///
/// # Returns
///
/// * `Ok(RunStatistics)` - Successfully loaded statistics
/// * `Err(StorageError)` - Failed to query statistics
pub fn load_statistics(store: &SqliteStore) -> StorageResult<RunStatistics> {
    let latest_run = store.latest_run()?;
    let latest_sources = match &latest_run {
        Some(run) => store.source_runs(run.id)?,
        None => Vec::new(),
    };

    Ok(RunStatistics {
        books: store.count(EntityKind::Book)?,
        prices: store.count(EntityKind::Price)?,
        compare_prices: store.count(EntityKind::ComparePrice)?,
        by_retailer: store.retailer_breakdown()?,
        latest_run,
        latest_sources,
    })
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &RunStatistics) {
    println!("=== Bookmatch Statistics ===\n");

    println!("Records:");
    println!("  Books: {}", stats.books);
    println!("  Prices: {}", stats.prices);
    println!("  Compare prices: {}", stats.compare_prices);
    println!();

    if !stats.by_retailer.is_empty() {
        println!("Compare Prices by Retailer:");
        for (retailer, count) in &stats.by_retailer {
            let percentage = if stats.compare_prices > 0 {
                (*count as f64 / stats.compare_prices as f64) * 100.0
            } else {
                0.0
            };
            println!("  {}: {} ({:.1}%)", retailer, count, percentage);
        }
        println!();
    }

    let run = match &stats.latest_run {
        Some(run) => run,
        None => {
            println!("No runs recorded yet");
            return;
        }
    };

    println!("Latest Run (#{}):", run.id);
    println!("  Status: {}", run.status.to_db_string());
    println!("  Started: {}", run.started_at);
    println!(
        "  Finished: {}",
        run.finished_at.as_deref().unwrap_or("-")
    );
    println!("  Config hash: {}", run.config_hash);
    println!();

    if !stats.latest_sources.is_empty() {
        println!("Sources:");
        for record in &stats.latest_sources {
            let s = &record.stats;
            println!(
                "  {}: {} committed, {} failed, {} pages ({})",
                s.source,
                s.committed,
                s.failures(),
                s.pages_fetched,
                s.stop_reason.to_db_string()
            );
        }
    }
}
