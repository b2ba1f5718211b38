//! Crawl progress events
//!
//! The runner reports everything it does as a `CrawlEvent` to a `CrawlObserver`.
//! The default observer writes them to `tracing`; tests record them.

use crate::crawler::runner::{CrawlPlan, SourceStats};
use crate::upsert::TripleReport;
use crate::ExtractionFailure;
use std::sync::Mutex;

/// Something that happened during a source run
#[derive(Debug, Clone, PartialEq)]
pub enum CrawlEvent {
    SourceStarted {
        source: String,
        plan: CrawlPlan,
    },
    ListPageFetched {
        source: String,
        page: u32,
        url: String,
        items: usize,
    },
    /// The listing ended at `page`
    PageExhausted {
        source: String,
        page: u32,
    },
    ListPageFailed {
        source: String,
        page: u32,
        url: String,
        reason: String,
    },
    ItemCommitted {
        source: String,
        url: String,
        report: TripleReport,
    },
    /// A detail page could not be extracted
    ItemSkipped {
        source: String,
        url: String,
        failure: ExtractionFailure,
    },
    /// A detail page could not be loaded
    FetchFailed {
        source: String,
        url: String,
        reason: String,
    },
    CommitFailed {
        source: String,
        url: String,
        integrity: bool,
        reason: String,
    },
    ItemCapReached {
        source: String,
        committed: usize,
    },
    SourceFinished {
        stats: SourceStats,
    },
}

/// Receives crawl events
///
/// Observers are shared between worker tasks and called synchronously from the
/// crawl loop, so they should return quickly.
pub trait CrawlObserver: Send + Sync {
    fn on_event(&self, event: &CrawlEvent);
}

/// Forwards crawl events to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl CrawlObserver for TracingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        match event {
            CrawlEvent::SourceStarted { source, plan } => {
                tracing::info!(
                    source = %source,
                    cap = plan.max_items,
                    first_page = plan.first_page,
                    "Starting source ({})",
                    plan.retailer
                );
            }
            CrawlEvent::ListPageFetched {
                source,
                page,
                url,
                items,
            } => {
                tracing::info!(source = %source, page, url = %url, "Listing page has {} items", items);
            }
            CrawlEvent::PageExhausted { source, page } => {
                tracing::info!(source = %source, page, "Listing exhausted");
            }
            CrawlEvent::ListPageFailed {
                source,
                page,
                url,
                reason,
            } => {
                tracing::warn!(source = %source, page, url = %url, "Listing page unavailable: {}", reason);
            }
            CrawlEvent::ItemCommitted {
                source,
                url,
                report,
            } => {
                tracing::debug!(
                    source = %source,
                    url = %url,
                    book = report.book.label(),
                    price = report.price.label(),
                    compare_price = report.compare_price.label(),
                    "Committed book {}",
                    report.book.id()
                );
            }
            CrawlEvent::ItemSkipped {
                source,
                url,
                failure,
            } => {
                tracing::warn!(source = %source, url = %url, "Skipping item: {}", failure);
            }
            CrawlEvent::FetchFailed {
                source,
                url,
                reason,
            } => {
                tracing::warn!(source = %source, url = %url, "Fetch failed: {}", reason);
            }
            CrawlEvent::CommitFailed {
                source,
                url,
                integrity,
                reason,
            } => {
                tracing::warn!(source = %source, url = %url, integrity, "Commit failed: {}", reason);
            }
            CrawlEvent::ItemCapReached { source, committed } => {
                tracing::info!(source = %source, "Item cap reached after {} commits", committed);
            }
            CrawlEvent::SourceFinished { stats } => {
                tracing::info!(
                    source = %stats.source,
                    pages = stats.pages_fetched,
                    seen = stats.items_seen,
                    committed = stats.committed,
                    failures = stats.failures(),
                    stop = stats.stop_reason.to_db_string(),
                    "Source finished"
                );
            }
        }
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<CrawlEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Events received so far, in order
    pub fn events(&self) -> Vec<CrawlEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Events for one source
    pub fn events_for(&self, source: &str) -> Vec<CrawlEvent> {
        self.events()
            .into_iter()
            .filter(|event| event.source() == source)
            .collect()
    }
}

impl CrawlObserver for RecordingObserver {
    fn on_event(&self, event: &CrawlEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

impl CrawlEvent {
    /// Source the event belongs to
    pub fn source(&self) -> &str {
        match self {
            CrawlEvent::SourceStarted { source, .. }
            | CrawlEvent::ListPageFetched { source, .. }
            | CrawlEvent::PageExhausted { source, .. }
            | CrawlEvent::ListPageFailed { source, .. }
            | CrawlEvent::ItemCommitted { source, .. }
            | CrawlEvent::ItemSkipped { source, .. }
            | CrawlEvent::FetchFailed { source, .. }
            | CrawlEvent::CommitFailed { source, .. }
            | CrawlEvent::ItemCapReached { source, .. } => source,
            CrawlEvent::SourceFinished { stats } => &stats.source,
        }
    }
}
