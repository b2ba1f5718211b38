//! Run orchestration
//!
//! The orchestrator starts one crawl runner per source as its own tokio task,
//! waits for all of them, and records the run in the store:
//! - a `runs` row before the workers start
//! - one `source_runs` row per finished worker
//! - the final run status once every worker has been joined

use crate::config::Config;
use crate::crawler::events::{CrawlObserver, TracingObserver};
use crate::crawler::runner::{CrawlPlan, CrawlRunner, SourceStats};
use crate::renderer::{HttpRenderer, PageRenderer};
use crate::sources::{build_adapter, is_known_source, SourceAdapter, SOURCE_KEYS};
use crate::storage::{RunStatus, SqliteStore, StorageError};
use crate::upsert::{CommitMode, UpsertCoordinator};
use crate::{BookmatchError, Result};
use std::path::Path;
use std::sync::Arc;

/// Outcome of a whole run
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: i64,
    /// Stats of every worker that finished
    pub sources: Vec<SourceStats>,
    /// Sources whose worker task panicked
    pub failed: Vec<String>,
}

impl RunSummary {
    pub fn total_committed(&self) -> usize {
        self.sources.iter().map(|s| s.committed).sum()
    }

    pub fn source(&self, name: &str) -> Option<&SourceStats> {
        self.sources.iter().find(|s| s.source == name)
    }
}

/// Selects the sources taking part in a run and builds their plans
///
/// # Arguments
///
/// * `config` - The loaded configuration
/// * `only` - Source names given on the command line; empty means no restriction
///
/// # Returns
///
/// * `Ok(Vec<...>)` - Adapters and plans in start order
/// * `Err(BookmatchError::UnknownSource)` - `only` names a source that does not exist
pub fn plan_sources(
    config: &Config,
    only: &[String],
) -> Result<Vec<(Arc<dyn SourceAdapter>, CrawlPlan)>> {
    if let Some(unknown) = only.iter().find(|name| !is_known_source(name)) {
        return Err(BookmatchError::UnknownSource(unknown.clone()));
    }

    let mut planned = Vec::new();
    for key in SOURCE_KEYS {
        if !only.is_empty() && !only.iter().any(|name| name == key) {
            continue;
        }
        if !config.is_enabled(key) {
            tracing::debug!("Source {} is disabled", key);
            continue;
        }

        let adapter = build_adapter(key).ok_or_else(|| BookmatchError::UnknownSource(key.to_string()))?;
        let plan = CrawlPlan::from_profile(adapter.profile(), config.source(key), &config.pipeline);
        planned.push((adapter, plan));
    }

    Ok(planned)
}

/// Starts every source concurrently and joins them
pub struct Orchestrator {
    store: SqliteStore,
    renderer: Arc<dyn PageRenderer>,
    observer: Arc<dyn CrawlObserver>,
    upsert: UpsertCoordinator,
    workers: Vec<(Arc<dyn SourceAdapter>, CrawlPlan)>,
}

impl Orchestrator {
    /// Creates an orchestrator with no sources
    ///
    /// # Arguments
    ///
    /// * `store` - The shared record store
    /// * `renderer` - Page renderer shared by all workers
    /// * `observer` - Receives every worker's crawl events
    /// * `mode` - Transaction grouping for commits
    pub fn new(
        store: SqliteStore,
        renderer: Arc<dyn PageRenderer>,
        observer: Arc<dyn CrawlObserver>,
        mode: CommitMode,
    ) -> Self {
        let upsert = UpsertCoordinator::new(store.clone(), mode);
        Self {
            store,
            renderer,
            observer,
            upsert,
            workers: Vec::new(),
        }
    }

    /// Builds the production wiring from a configuration
    ///
    /// Opens the database, creates an HTTP renderer and logs events through
    /// `tracing`.
    pub fn from_config(config: &Config, only: &[String]) -> Result<Self> {
        let store = SqliteStore::open(Path::new(&config.output.database_path))?;
        let renderer = HttpRenderer::new(&config.renderer)?;

        let mut orchestrator = Self::new(
            store,
            Arc::new(renderer),
            Arc::new(TracingObserver),
            config.pipeline.commit_mode,
        );
        for (adapter, plan) in plan_sources(config, only)? {
            orchestrator.add_source(adapter, plan);
        }

        Ok(orchestrator)
    }

    /// Adds a source to the next run
    pub fn add_source(&mut self, adapter: Arc<dyn SourceAdapter>, plan: CrawlPlan) {
        self.workers.push((adapter, plan));
    }

    /// Plans of the sources that will run
    pub fn plans(&self) -> impl Iterator<Item = &CrawlPlan> {
        self.workers.iter().map(|(_, plan)| plan)
    }

    /// Runs every source to completion
    ///
    /// A panicking worker marks the run as failed but does not affect the
    /// others. The renderer is closed once all workers are joined. A failure
    /// to record the run is returned only after every worker has been joined
    /// and the run has been marked as failed.
    ///
    /// # Arguments
    ///
    /// * `config_hash` - Hash of the configuration file, stored with the run
    pub async fn run(self, config_hash: &str) -> Result<RunSummary> {
        let run_id = self.store.create_run(config_hash)?;
        tracing::info!(
            "Starting run {} with {} sources ({} commits)",
            run_id,
            self.workers.len(),
            self.upsert.mode().as_str()
        );

        let mut handles = Vec::with_capacity(self.workers.len());
        for (adapter, plan) in self.workers {
            let source = plan.source.clone();
            let runner = CrawlRunner::new(
                adapter,
                plan,
                Arc::clone(&self.renderer),
                self.upsert.clone(),
                Arc::clone(&self.observer),
            );
            handles.push((source, tokio::spawn(async move { runner.run().await })));
        }

        let mut summary = RunSummary {
            run_id,
            sources: Vec::new(),
            failed: Vec::new(),
        };

        // Every worker is joined even when bookkeeping fails
        let mut bookkeeping: Option<StorageError> = None;
        for (source, handle) in handles {
            match handle.await {
                Ok(stats) => {
                    if let Err(e) = self.store.record_source_run(run_id, &stats) {
                        tracing::error!(source = %source, "Failed to record source run: {}", e);
                        bookkeeping.get_or_insert(e);
                    }
                    summary.sources.push(stats);
                }
                Err(e) => {
                    tracing::error!(source = %source, "Worker did not finish: {}", e);
                    summary.failed.push(source);
                }
            }
        }

        let status = if summary.failed.is_empty() && bookkeeping.is_none() {
            RunStatus::Completed
        } else {
            RunStatus::Failed
        };
        if let Err(e) = self.store.finish_run(run_id, status) {
            tracing::error!("Failed to finish run {}: {}", run_id, e);
            bookkeeping.get_or_insert(e);
        }

        if let Err(e) = self.renderer.close().await {
            tracing::warn!("Failed to close renderer: {}", e);
        }

        if let Some(e) = bookkeeping {
            return Err(e.into());
        }

        tracing::info!(
            "Run {} {}: {} items committed",
            run_id,
            status.to_db_string(),
            summary.total_committed()
        );

        Ok(summary)
    }
}
