//! Output module for reporting pipeline results
//!
//! This module handles:
//! - Printing the outcome of a run as it finishes
//! - Loading and printing record store statistics

pub mod stats;

pub use stats::{load_statistics, print_statistics, RunStatistics};

use crate::crawler::RunSummary;

/// Prints a finished run to stdout
///
/// # Arguments
///
/// * `summary` - The summary returned by the orchestrator
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Run #{} ===\n", summary.run_id);

    for stats in &summary.sources {
        println!(
            "{}: {} committed / {} seen over {} pages ({})",
            stats.source,
            stats.committed,
            stats.items_seen,
            stats.pages_fetched,
            stats.stop_reason.to_db_string()
        );
        if stats.failures() > 0 {
            println!(
                "  extraction: {}, fetch: {}, integrity: {}, persistence: {}",
                stats.extraction_failures,
                stats.fetch_failures,
                stats.integrity_violations,
                stats.persistence_failures
            );
        }
    }

    for source in &summary.failed {
        println!("{}: worker failed", source);
    }

    println!("\nTotal committed: {}", summary.total_committed());
}
