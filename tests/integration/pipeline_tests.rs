//! Crawl runner tests against generated storefronts
//!
//! Every test serves pages from a `StaticRenderer` and commits into an
//! in-memory store, so the whole extract-and-upsert path runs without a network.

use crate::common::{detail_html, detail_url, listing_html, listing_url, plan, stock, title, FixtureAdapter};
use bookmatch::crawler::{CrawlEvent, CrawlPlan, CrawlRunner, RecordingObserver, SourceStats, StopReason};
use bookmatch::model::EntityKind;
use bookmatch::renderer::StaticRenderer;
use bookmatch::storage::StorageError;
use bookmatch::upsert::UpsertOutcome;
use bookmatch::{Book, CommitMode, ComparePrice, ExtractionFailure, SqliteStore, UpsertCoordinator};
use chrono::NaiveDate;
use std::sync::Arc;

async fn crawl(
    plan: CrawlPlan,
    renderer: &Arc<StaticRenderer>,
    store: &SqliteStore,
    observer: &Arc<RecordingObserver>,
) -> SourceStats {
    crawl_with_mode(plan, renderer, store, observer, CommitMode::Independent).await
}

async fn crawl_with_mode(
    plan: CrawlPlan,
    renderer: &Arc<StaticRenderer>,
    store: &SqliteStore,
    observer: &Arc<RecordingObserver>,
    mode: CommitMode,
) -> SourceStats {
    let runner = CrawlRunner::new(
        Arc::new(FixtureAdapter::new("alpha", "Alpha.test")),
        plan,
        renderer.clone(),
        UpsertCoordinator::new(store.clone(), mode),
        observer.clone(),
    );
    runner.run().await
}

fn titles(store: &SqliteStore) -> Vec<String> {
    let mut titles: Vec<String> = store
        .load_all::<Book>()
        .unwrap()
        .into_iter()
        .map(|stored| stored.record.title)
        .collect();
    titles.sort();
    titles
}

fn committed_reports(observer: &RecordingObserver) -> Vec<bookmatch::upsert::TripleReport> {
    observer
        .events()
        .into_iter()
        .filter_map(|event| match event {
            CrawlEvent::ItemCommitted { report, .. } => Some(report),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_pagination_stops_at_first_empty_page() {
    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[2, 2]));
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &observer).await;

    // Page 3 is empty: two pages processed, three listing loads
    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.items_seen, 4);
    assert_eq!(stats.committed, 4);
    assert_eq!(stats.failures(), 0);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);

    let visits = renderer.visits();
    assert_eq!(visits.len(), 7);
    assert_eq!(visits.last(), Some(&listing_url("alpha", 3)));
    assert!(!visits.contains(&listing_url("alpha", 4)));

    assert!(observer
        .events()
        .contains(&CrawlEvent::PageExhausted {
            source: "alpha".to_string(),
            page: 3
        }));
    assert_eq!(store.count(EntityKind::Book).unwrap(), 4);
}

#[tokio::test]
async fn test_item_cap_stops_before_next_page() {
    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[10, 10]));
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl(plan("alpha", "Alpha.test", 3), &renderer, &store, &observer).await;

    assert_eq!(stats.committed, 3);
    assert_eq!(stats.items_seen, 3);
    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.stop_reason, StopReason::CapReached);

    assert_eq!(
        renderer.visits(),
        vec![
            listing_url("alpha", 1),
            detail_url("alpha", 1, 1),
            detail_url("alpha", 1, 2),
            detail_url("alpha", 1, 3),
        ]
    );
    assert_eq!(store.count(EntityKind::Book).unwrap(), 3);
    assert!(observer.events().contains(&CrawlEvent::ItemCapReached {
        source: "alpha".to_string(),
        committed: 3
    }));
}

#[tokio::test]
async fn test_extraction_failure_skips_only_that_item() {
    let renderer = Arc::new(
        stock(StaticRenderer::new(), "alpha", &[5])
            .with_page(detail_url("alpha", 1, 3), "<html><body><h1>Layout changed</h1></body></html>"),
    );
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &observer).await;

    assert_eq!(stats.items_seen, 5);
    assert_eq!(stats.committed, 4);
    assert_eq!(stats.extraction_failures, 1);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);

    assert_eq!(
        titles(&store),
        vec![
            title("alpha", 1, 1),
            title("alpha", 1, 2),
            title("alpha", 1, 4),
            title("alpha", 1, 5),
        ]
    );

    let skipped: Vec<_> = observer
        .events()
        .into_iter()
        .filter_map(|event| match event {
            CrawlEvent::ItemSkipped { url, failure, .. } => Some((url, failure)),
            _ => None,
        })
        .collect();
    assert_eq!(skipped.len(), 1);
    assert_eq!(skipped[0].0, detail_url("alpha", 1, 3));
    assert!(matches!(skipped[0].1, ExtractionFailure::MissingElement { .. }));
}

#[tokio::test]
async fn test_fetch_failure_moves_to_next_item() {
    let renderer = Arc::new(
        stock(StaticRenderer::new(), "alpha", &[3]).with_failure(detail_url("alpha", 1, 2), 503),
    );
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &observer).await;

    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.committed, 2);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);
    assert_eq!(titles(&store), vec![title("alpha", 1, 1), title("alpha", 1, 3)]);

    // No retries by default
    let failed = detail_url("alpha", 1, 2);
    assert_eq!(renderer.visits().iter().filter(|url| **url == failed).count(), 1);
}

#[tokio::test]
async fn test_retry_policy_bounds_attempts() {
    let renderer = Arc::new(
        stock(StaticRenderer::new(), "alpha", &[2]).with_failure(detail_url("alpha", 1, 1), 502),
    );
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let mut retrying = plan("alpha", "Alpha.test", 100);
    retrying.max_fetch_retries = 2;
    let stats = crawl(retrying, &renderer, &store, &observer).await;

    let failed = detail_url("alpha", 1, 1);
    assert_eq!(renderer.visits().iter().filter(|url| **url == failed).count(), 3);
    assert_eq!(stats.fetch_failures, 1);
    assert_eq!(stats.committed, 1);
}

#[tokio::test]
async fn test_unreachable_listing_ends_run() {
    let renderer = Arc::new(StaticRenderer::new().with_failure(listing_url("alpha", 1), 500));
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &observer).await;

    assert_eq!(stats.stop_reason, StopReason::ListingUnavailable);
    assert_eq!(stats.pages_fetched, 0);
    assert_eq!(stats.items_seen, 0);
    assert_eq!(renderer.visits().len(), 1);
    assert!(observer
        .events()
        .iter()
        .any(|event| matches!(event, CrawlEvent::ListPageFailed { page: 1, .. })));
}

#[tokio::test]
async fn test_single_page_listing() {
    let listing = "https://alpha.test/all".to_string();
    let urls = vec![detail_url("alpha", 1, 1), detail_url("alpha", 1, 2)];
    let renderer = Arc::new(
        StaticRenderer::new()
            .with_page(listing.clone(), listing_html(&urls))
            .with_page(urls[0].clone(), detail_html("First", "Author alpha", "One"))
            .with_page(urls[1].clone(), detail_html("Second", "Author alpha", "Two")),
    );
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let mut single = plan("alpha", "Alpha.test", 100);
    single.listing_template = listing.clone();
    let stats = crawl(single, &renderer, &store, &observer).await;

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.committed, 2);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);
    assert_eq!(renderer.visits().len(), 3);
}

#[tokio::test]
async fn test_second_run_converges() {
    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[3]));
    let store = SqliteStore::open_in_memory().unwrap();

    let first = Arc::new(RecordingObserver::new());
    crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &first).await;
    assert!(committed_reports(&first)
        .iter()
        .all(|report| matches!(report.book, UpsertOutcome::Inserted(_))));

    let second = Arc::new(RecordingObserver::new());
    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &second).await;
    assert_eq!(stats.committed, 3);

    let reports = committed_reports(&second);
    assert_eq!(reports.len(), 3);
    for report in reports {
        assert!(matches!(report.book, UpsertOutcome::Unchanged(_)));
        assert!(matches!(report.price, UpsertOutcome::Unchanged(_)));
        assert!(matches!(report.compare_price, UpsertOutcome::Unchanged(_)));
    }

    assert_eq!(store.count(EntityKind::Book).unwrap(), 3);
    assert_eq!(store.count(EntityKind::Price).unwrap(), 3);
    assert_eq!(store.count(EntityKind::ComparePrice).unwrap(), 3);
}

#[tokio::test]
async fn test_changed_description_updates_in_place() {
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let before = Arc::new(stock(StaticRenderer::new(), "alpha", &[2]));
    crawl(plan("alpha", "Alpha.test", 100), &before, &store, &observer).await;
    let original = store
        .load_all::<Book>()
        .unwrap()
        .into_iter()
        .find(|stored| stored.record.title == title("alpha", 1, 1))
        .unwrap();

    let after = Arc::new(stock(StaticRenderer::new(), "alpha", &[2]).with_page(
        detail_url("alpha", 1, 1),
        detail_html(&title("alpha", 1, 1), "Author alpha", "Second edition"),
    ));
    let rerun = Arc::new(RecordingObserver::new());
    crawl(plan("alpha", "Alpha.test", 100), &after, &store, &rerun).await;

    let books = store.load_all::<Book>().unwrap();
    assert_eq!(books.len(), 2);
    let updated = books
        .iter()
        .find(|stored| stored.record.title == title("alpha", 1, 1))
        .unwrap();
    assert_eq!(updated.id, original.id);
    assert_eq!(updated.record.description, "Second edition");

    let reports = committed_reports(&rerun);
    assert_eq!(reports[0].book, UpsertOutcome::Updated(original.id));
    assert!(matches!(reports[0].price, UpsertOutcome::Unchanged(_)));
}

#[tokio::test]
async fn test_duplicate_books_are_reported_not_multiplied() {
    let store = SqliteStore::open_in_memory().unwrap();
    let duplicate = Book {
        title: title("alpha", 1, 1),
        author: "Author alpha".to_string(),
        description: "First edition".to_string(),
        publication_date: NaiveDate::from_ymd_opt(2019, 5, 14).unwrap(),
    };
    store
        .unit_of_work(|session| {
            session.insert(&duplicate)?;
            session.insert(&duplicate)?;
            Ok::<_, StorageError>(())
        })
        .unwrap();

    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[3]));
    let observer = Arc::new(RecordingObserver::new());
    let stats = crawl(plan("alpha", "Alpha.test", 100), &renderer, &store, &observer).await;

    assert_eq!(stats.integrity_violations, 1);
    assert_eq!(stats.committed, 2);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);

    let copies = titles(&store)
        .into_iter()
        .filter(|t| *t == title("alpha", 1, 1))
        .count();
    assert_eq!(copies, 2);
    assert_eq!(store.count(EntityKind::Price).unwrap(), 2);
    assert!(observer
        .events()
        .iter()
        .any(|event| matches!(event, CrawlEvent::CommitFailed { integrity: true, .. })));
}

#[tokio::test]
async fn test_coupled_mode_commits_whole_triples() {
    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[2, 1]));
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let stats = crawl_with_mode(
        plan("alpha", "Alpha.test", 100),
        &renderer,
        &store,
        &observer,
        CommitMode::Coupled,
    )
    .await;

    assert_eq!(stats.committed, 3);
    let snapshots = store.load_all::<ComparePrice>().unwrap();
    assert_eq!(snapshots.len(), 3);
    assert!(snapshots
        .iter()
        .all(|stored| stored.record.retailer_name == "Alpha.test"));
    assert!(snapshots
        .iter()
        .all(|stored| stored.record.image_url.starts_with("https://alpha.test/covers/")));
}
