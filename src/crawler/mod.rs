//! Crawler module for walking storefronts
//!
//! This module contains the core crawling logic, including:
//! - The per-source pagination and extraction loop (`CrawlRunner`)
//! - Progress events and their observers
//! - Concurrent orchestration of all sources (`Orchestrator`)

mod events;
mod orchestrator;
mod runner;

pub use events::{CrawlEvent, CrawlObserver, RecordingObserver, TracingObserver};
pub use orchestrator::{plan_sources, Orchestrator, RunSummary};
pub use runner::{
    CrawlPlan, CrawlRunner, SourceStats, StopReason, OFFSET_PLACEHOLDER, PAGE_PLACEHOLDER,
};

use crate::config::Config;
use crate::Result;

/// Runs a complete pipeline pass
///
/// This is the main entry point for a crawl. It will:
/// 1. Open the record store and the HTTP renderer
/// 2. Plan every enabled source
/// 3. Crawl all sources concurrently
/// 4. Record the run and its per-source outcomes
///
/// # Arguments
///
/// * `config` - The validated configuration
/// * `config_hash` - Hash of the configuration file, stored with the run
/// * `only` - Restricts the run to these sources when non-empty
///
/// # Example
///
/// ```no_run
/// use bookmatch::config::load_config_with_hash;
/// use bookmatch::crawler::crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("bookmatch.toml"))?;
/// let summary = crawl(&config, &hash, &[]).await?;
/// println!("{} items committed", summary.total_committed());
/// # Ok(())
/// # }
/// ```
pub async fn crawl(
    config: &Config,
    config_hash: &str,
    only: &[String],
) -> Result<RunSummary> {
    Orchestrator::from_config(config, only)?
        .run(config_hash)
        .await
}
