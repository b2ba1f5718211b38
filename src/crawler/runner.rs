//! Per-source crawl loop
//!
//! A `CrawlRunner` walks one storefront: it fetches listing pages in order,
//! visits every detail URL on them, hands each detail page to the source
//! adapter for extraction and commits the result through the upsert
//! coordinator. An empty listing page is the only pagination stop signal;
//! the item cap and an unreachable listing end the run early.

use crate::config::{PipelineConfig, SourceConfig};
use crate::crawler::events::{CrawlEvent, CrawlObserver};
use crate::model::CanonicalTriple;
use crate::renderer::{PageRenderer, RenderError, RenderedPage};
use crate::sources::{SourceAdapter, SourceProfile};
use crate::upsert::UpsertCoordinator;
use crate::ExtractionFailure;
use std::sync::Arc;
use std::time::Duration;

/// Placeholder replaced by the page index in listing URL templates
pub const PAGE_PLACEHOLDER: &str = "{page}";

/// Placeholder replaced by the offset of a page's first item
pub const OFFSET_PLACEHOLDER: &str = "{start}";

/// Why a source run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A listing page came back empty
    Exhausted,
    /// The item cap was reached
    CapReached,
    /// A listing page could not be loaded or read
    ListingUnavailable,
}

impl StopReason {
    /// Converts stop reason to database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            StopReason::Exhausted => "exhausted",
            StopReason::CapReached => "cap_reached",
            StopReason::ListingUnavailable => "listing_unavailable",
        }
    }

    /// Parses stop reason from database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "exhausted" => Some(StopReason::Exhausted),
            "cap_reached" => Some(StopReason::CapReached),
            "listing_unavailable" => Some(StopReason::ListingUnavailable),
            _ => None,
        }
    }
}

/// Counters for one source run
#[derive(Debug, Clone, PartialEq)]
pub struct SourceStats {
    pub source: String,
    /// Listing pages loaded
    pub pages_fetched: usize,
    /// Detail URLs taken from listing pages and visited
    pub items_seen: usize,
    /// Triples committed, whether inserted, updated or unchanged
    pub committed: usize,
    pub extraction_failures: usize,
    /// Detail pages that could not be loaded
    pub fetch_failures: usize,
    pub integrity_violations: usize,
    pub persistence_failures: usize,
    pub stop_reason: StopReason,
}

impl SourceStats {
    pub fn new(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            pages_fetched: 0,
            items_seen: 0,
            committed: 0,
            extraction_failures: 0,
            fetch_failures: 0,
            integrity_violations: 0,
            persistence_failures: 0,
            stop_reason: StopReason::Exhausted,
        }
    }

    /// Items that were visited but not committed
    pub fn failures(&self) -> usize {
        self.extraction_failures
            + self.fetch_failures
            + self.integrity_violations
            + self.persistence_failures
    }
}

/// Everything a runner needs to know about one source
///
/// A plan is the adapter's profile with the configuration overrides applied.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlPlan {
    pub source: String,
    pub retailer: String,
    /// Listing URL, optionally containing `{page}` or `{start}`
    pub listing_template: String,
    pub first_page: u32,
    /// Items per listing page; `{start}` is `(page - 1) * page_size`
    pub page_size: Option<u32>,
    pub max_items: usize,
    /// Wait after each listing navigation
    pub listing_settle: Duration,
    /// Wait after each detail navigation
    pub detail_settle: Duration,
    /// Extra attempts after a failed navigation
    pub max_fetch_retries: u32,
    pub retry_delay: Duration,
}

impl CrawlPlan {
    /// Builds a plan from a source profile
    ///
    /// # Arguments
    ///
    /// * `profile` - The adapter's built-in defaults
    /// * `overrides` - The source's `[[source]]` entry, if any
    /// * `pipeline` - Retry policy shared by all sources
    pub fn from_profile(
        profile: &SourceProfile,
        overrides: Option<&SourceConfig>,
        pipeline: &PipelineConfig,
    ) -> Self {
        let mut plan = Self {
            source: profile.key.to_string(),
            retailer: profile.retailer.to_string(),
            listing_template: profile.listing_url.to_string(),
            first_page: profile.first_page,
            page_size: profile.page_size,
            max_items: profile.max_items,
            listing_settle: profile.listing_settle,
            detail_settle: profile.detail_settle,
            max_fetch_retries: pipeline.max_fetch_retries,
            retry_delay: Duration::from_millis(pipeline.retry_delay_ms),
        };

        if let Some(source) = overrides {
            if let Some(max_items) = source.max_items {
                plan.max_items = max_items;
            }
            if let Some(ms) = source.listing_settle_ms {
                plan.listing_settle = Duration::from_millis(ms);
            }
            if let Some(ms) = source.detail_settle_ms {
                plan.detail_settle = Duration::from_millis(ms);
            }
            if let Some(url) = &source.listing_url {
                plan.listing_template = url.clone();
            }
        }

        plan
    }

    /// Listing URL for a page index
    ///
    /// A template without a placeholder describes a single-page listing, so
    /// every index after the first returns `None`. So does a `{start}`
    /// template without a page size.
    pub fn listing_url(&self, page: u32) -> Option<String> {
        let by_page = self.listing_template.contains(PAGE_PLACEHOLDER);
        let by_offset = self.listing_template.contains(OFFSET_PLACEHOLDER);

        if !by_page && !by_offset {
            return (page == self.first_page).then(|| self.listing_template.clone());
        }

        let mut url = self
            .listing_template
            .replace(PAGE_PLACEHOLDER, &page.to_string());
        if by_offset {
            let start = page.saturating_sub(1).checked_mul(self.page_size?)?;
            url = url.replace(OFFSET_PLACEHOLDER, &start.to_string());
        }
        Some(url)
    }
}

/// Runs the crawl loop for one source
pub struct CrawlRunner {
    adapter: Arc<dyn SourceAdapter>,
    plan: CrawlPlan,
    renderer: Arc<dyn PageRenderer>,
    upsert: UpsertCoordinator,
    observer: Arc<dyn CrawlObserver>,
}

impl CrawlRunner {
    pub fn new(
        adapter: Arc<dyn SourceAdapter>,
        plan: CrawlPlan,
        renderer: Arc<dyn PageRenderer>,
        upsert: UpsertCoordinator,
        observer: Arc<dyn CrawlObserver>,
    ) -> Self {
        Self {
            adapter,
            plan,
            renderer,
            upsert,
            observer,
        }
    }

    pub fn plan(&self) -> &CrawlPlan {
        &self.plan
    }

    /// Crawls the source until its listing is exhausted, the item cap is
    /// reached or a listing page cannot be loaded
    ///
    /// Item-level failures are counted and reported to the observer; they never
    /// end the run.
    pub async fn run(&self) -> SourceStats {
        let source = self.plan.source.as_str();
        let mut stats = SourceStats::new(source);

        self.emit(CrawlEvent::SourceStarted {
            source: source.to_string(),
            plan: self.plan.clone(),
        });

        let mut page = self.plan.first_page;
        let stop_reason = 'pages: loop {
            if self.cap_reached(&stats) {
                break StopReason::CapReached;
            }

            let url = match self.plan.listing_url(page) {
                Some(url) => url,
                None => {
                    self.emit(CrawlEvent::PageExhausted {
                        source: source.to_string(),
                        page,
                    });
                    break StopReason::Exhausted;
                }
            };

            let listing = match self.navigate(&url, self.plan.listing_settle).await {
                Ok(listing) => listing,
                Err(error) => {
                    self.emit(CrawlEvent::ListPageFailed {
                        source: source.to_string(),
                        page,
                        url,
                        reason: error.to_string(),
                    });
                    break StopReason::ListingUnavailable;
                }
            };
            stats.pages_fetched += 1;

            let items = match self.list(&listing) {
                Ok(items) => items,
                Err(failure) => {
                    self.emit(CrawlEvent::ListPageFailed {
                        source: source.to_string(),
                        page,
                        url,
                        reason: failure.to_string(),
                    });
                    break StopReason::ListingUnavailable;
                }
            };

            self.emit(CrawlEvent::ListPageFetched {
                source: source.to_string(),
                page,
                url,
                items: items.len(),
            });

            if items.is_empty() {
                self.emit(CrawlEvent::PageExhausted {
                    source: source.to_string(),
                    page,
                });
                break StopReason::Exhausted;
            }

            for item in &items {
                if self.cap_reached(&stats) {
                    break 'pages StopReason::CapReached;
                }
                stats.items_seen += 1;
                self.visit(item, &mut stats).await;
            }

            page += 1;
        };

        stats.stop_reason = stop_reason;
        self.emit(CrawlEvent::SourceFinished {
            stats: stats.clone(),
        });
        stats
    }

    /// Visits one detail URL and commits what it yields
    async fn visit(&self, url: &str, stats: &mut SourceStats) {
        let source = self.plan.source.as_str();

        let detail = match self.navigate(url, self.plan.detail_settle).await {
            Ok(detail) => detail,
            Err(error) => {
                stats.fetch_failures += 1;
                self.emit(CrawlEvent::FetchFailed {
                    source: source.to_string(),
                    url: url.to_string(),
                    reason: error.to_string(),
                });
                return;
            }
        };

        let triple = match self.extract(url, &detail) {
            Ok(triple) => triple,
            Err(failure) => {
                stats.extraction_failures += 1;
                self.emit(CrawlEvent::ItemSkipped {
                    source: source.to_string(),
                    url: url.to_string(),
                    failure,
                });
                return;
            }
        };

        match self.upsert.commit(&triple) {
            Ok(report) => {
                stats.committed += 1;
                self.emit(CrawlEvent::ItemCommitted {
                    source: source.to_string(),
                    url: url.to_string(),
                    report,
                });
                if self.cap_reached(stats) {
                    self.emit(CrawlEvent::ItemCapReached {
                        source: source.to_string(),
                        committed: stats.committed,
                    });
                }
            }
            Err(error) => {
                if error.is_integrity_violation() {
                    stats.integrity_violations += 1;
                } else {
                    stats.persistence_failures += 1;
                }
                self.emit(CrawlEvent::CommitFailed {
                    source: source.to_string(),
                    url: url.to_string(),
                    integrity: error.is_integrity_violation(),
                    reason: error.to_string(),
                });
            }
        }
    }

    /// Loads a page, retrying per the plan, then waits for it to settle
    async fn navigate(&self, url: &str, settle: Duration) -> Result<RenderedPage, RenderError> {
        let mut attempt = 0;

        loop {
            match self.renderer.navigate(url).await {
                Ok(page) => {
                    tokio::time::sleep(settle).await;
                    return Ok(page);
                }
                Err(error) if attempt < self.plan.max_fetch_retries => {
                    attempt += 1;
                    tracing::debug!(
                        source = %self.plan.source,
                        url,
                        attempt,
                        "Retrying after fetch failure: {}",
                        error
                    );
                    tokio::time::sleep(self.plan.retry_delay).await;
                }
                Err(error) => return Err(error),
            }
        }
    }

    // The parsed document is not Send, so parsing and extraction stay in
    // these synchronous helpers and never straddle an await.

    fn list(&self, page: &RenderedPage) -> Result<Vec<String>, ExtractionFailure> {
        let document = page.document();
        self.adapter.list_page(&document)
    }

    fn extract(&self, url: &str, page: &RenderedPage) -> Result<CanonicalTriple, ExtractionFailure> {
        let document = page.document();
        self.adapter.extract_detail(url, &document)
    }

    fn cap_reached(&self, stats: &SourceStats) -> bool {
        stats.committed >= self.plan.max_items
    }

    fn emit(&self, event: CrawlEvent) {
        self.observer.on_event(&event);
    }
}
