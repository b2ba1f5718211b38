//! Orchestrator tests: concurrent sources, run bookkeeping and a real adapter
//! replayed from captured pages

use crate::common::{plan, stock, FixtureAdapter};
use bookmatch::config::{parse_config, PipelineConfig, SourceConfig};
use bookmatch::crawler::{
    CrawlEvent, CrawlPlan, CrawlRunner, Orchestrator, RecordingObserver, StopReason,
};
use bookmatch::model::EntityKind;
use bookmatch::renderer::StaticRenderer;
use bookmatch::sources::build_adapter;
use bookmatch::storage::RunStatus;
use bookmatch::{BookmatchError, CommitMode, ComparePrice, SqliteStore, UpsertCoordinator};
use rust_decimal::Decimal;
use std::sync::Arc;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_sources_share_one_store() {
    let renderer = Arc::new(stock(
        stock(StaticRenderer::new(), "alpha", &[3]),
        "beta",
        &[2, 1],
    ));
    let store = SqliteStore::open_in_memory().unwrap();
    let observer = Arc::new(RecordingObserver::new());

    let mut orchestrator = Orchestrator::new(
        store.clone(),
        renderer.clone(),
        observer.clone(),
        CommitMode::Independent,
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::new("alpha", "Alpha.test")),
        plan("alpha", "Alpha.test", 100),
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::new("beta", "Beta.test")),
        plan("beta", "Beta.test", 100),
    );

    let summary = orchestrator.run("cafebabe").await.unwrap();

    assert!(summary.failed.is_empty());
    assert_eq!(summary.sources.len(), 2);
    assert_eq!(summary.total_committed(), 6);
    assert_eq!(summary.source("beta").map(|s| s.pages_fetched), Some(3));

    assert_eq!(store.count(EntityKind::Book).unwrap(), 6);
    assert_eq!(store.count(EntityKind::Price).unwrap(), 6);
    assert_eq!(
        store.retailer_breakdown().unwrap(),
        vec![("Alpha.test".to_string(), 3), ("Beta.test".to_string(), 3)]
    );

    let run = store.get_run(summary.run_id).unwrap();
    assert_eq!(run.status, RunStatus::Completed);
    assert_eq!(run.config_hash, "cafebabe");
    assert!(run.finished_at.is_some());

    let recorded = store.source_runs(summary.run_id).unwrap();
    assert_eq!(recorded.len(), 2);
    assert!(recorded
        .iter()
        .all(|r| r.stats.stop_reason == StopReason::Exhausted));

    assert!(renderer.is_closed());
    for source in ["alpha", "beta"] {
        let events = observer.events_for(source);
        assert!(matches!(events.first(), Some(CrawlEvent::SourceStarted { .. })));
        assert!(matches!(events.last(), Some(CrawlEvent::SourceFinished { .. })));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_panicking_worker_fails_run_but_not_others() {
    let renderer = Arc::new(stock(
        stock(StaticRenderer::new(), "alpha", &[2]),
        "broken",
        &[1],
    ));
    let store = SqliteStore::open_in_memory().unwrap();

    let mut orchestrator = Orchestrator::new(
        store.clone(),
        renderer.clone(),
        Arc::new(RecordingObserver::new()),
        CommitMode::Independent,
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::panicking("broken")),
        plan("broken", "Broken.test", 100),
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::new("alpha", "Alpha.test")),
        plan("alpha", "Alpha.test", 100),
    );

    let summary = orchestrator.run("hash").await.unwrap();

    assert_eq!(summary.failed, vec!["broken".to_string()]);
    assert_eq!(summary.sources.len(), 1);
    assert_eq!(summary.total_committed(), 2);

    assert_eq!(store.get_run(summary.run_id).unwrap().status, RunStatus::Failed);
    assert_eq!(store.source_runs(summary.run_id).unwrap().len(), 1);
    assert!(renderer.is_closed());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_bookkeeping_failure_still_joins_and_finishes_run() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("bookmatch.db");
    let store = SqliteStore::open(&db_path).unwrap();

    let other = rusqlite::Connection::open(&db_path).unwrap();
    other.execute_batch("DROP TABLE source_runs;").unwrap();
    drop(other);

    let renderer = Arc::new(stock(
        stock(StaticRenderer::new(), "alpha", &[2]),
        "beta",
        &[1],
    ));
    let mut orchestrator = Orchestrator::new(
        store.clone(),
        renderer.clone(),
        Arc::new(RecordingObserver::new()),
        CommitMode::Independent,
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::new("alpha", "Alpha.test")),
        plan("alpha", "Alpha.test", 100),
    );
    orchestrator.add_source(
        Arc::new(FixtureAdapter::new("beta", "Beta.test")),
        plan("beta", "Beta.test", 100),
    );

    let result = orchestrator.run("hash").await;
    assert!(matches!(result, Err(BookmatchError::Storage(_))));

    // Both workers ran to completion
    assert_eq!(store.count(EntityKind::Book).unwrap(), 3);

    let run = store.latest_run().unwrap().unwrap();
    assert_eq!(run.status, RunStatus::Failed);
    assert!(run.finished_at.is_some());
    assert!(renderer.is_closed());
}

#[tokio::test]
async fn test_runs_are_numbered() {
    let renderer = Arc::new(stock(StaticRenderer::new(), "alpha", &[1]));
    let store = SqliteStore::open_in_memory().unwrap();

    let mut ids = Vec::new();
    for _ in 0..2 {
        let mut orchestrator = Orchestrator::new(
            store.clone(),
            renderer.clone(),
            Arc::new(RecordingObserver::new()),
            CommitMode::Coupled,
        );
        orchestrator.add_source(
            Arc::new(FixtureAdapter::new("alpha", "Alpha.test")),
            plan("alpha", "Alpha.test", 100),
        );
        ids.push(orchestrator.run("hash").await.unwrap().run_id);
    }

    assert!(ids[1] > ids[0]);
    assert_eq!(store.latest_run().unwrap().map(|r| r.id), Some(ids[1]));
    assert_eq!(store.count(EntityKind::Book).unwrap(), 1);
}

#[test]
fn test_from_config_plans_enabled_sources() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("data").join("bookmatch.db");
    let config = parse_config(&format!(
        r#"
[output]
database-path = "{}"

[[source]]
name = "dubray"
max-items = 25

[[source]]
name = "qbd"
enabled = false
"#,
        db_path.display()
    ))
    .unwrap();

    let orchestrator = Orchestrator::from_config(&config, &[]).unwrap();
    let plans: Vec<&CrawlPlan> = orchestrator.plans().collect();

    assert_eq!(plans.len(), 1);
    assert_eq!(plans[0].source, "dubray");
    assert_eq!(plans[0].max_items, 25);
    assert!(db_path.exists());
}

#[tokio::test]
async fn test_dubray_replay() {
    let adapter = build_adapter("dubray").unwrap();
    let overrides = SourceConfig {
        name: "dubray".to_string(),
        enabled: true,
        max_items: None,
        listing_settle_ms: Some(0),
        detail_settle_ms: Some(0),
        listing_url: None,
    };
    let plan = CrawlPlan::from_profile(adapter.profile(), Some(&overrides), &PipelineConfig::default());

    let renderer = Arc::new(
        StaticRenderer::new()
            .with_page(
                plan.listing_url(1).unwrap(),
                include_str!("../fixtures/dubray_listing.html"),
            )
            .with_page(plan.listing_url(2).unwrap(), "<html><body><main></main></body></html>")
            .with_page(
                "https://www.dubraybooks.ie/product/bridgerton-the-duke-and-i-9780349429212",
                include_str!("../fixtures/dubray_detail.html"),
            ),
    );
    let store = SqliteStore::open_in_memory().unwrap();

    let runner = CrawlRunner::new(
        adapter,
        plan,
        renderer.clone(),
        UpsertCoordinator::new(store.clone(), CommitMode::Independent),
        Arc::new(RecordingObserver::new()),
    );
    let stats = runner.run().await;

    // The other two detail pages were not captured
    assert_eq!(stats.items_seen, 3);
    assert_eq!(stats.committed, 1);
    assert_eq!(stats.fetch_failures, 2);
    assert_eq!(stats.pages_fetched, 2);
    assert_eq!(stats.stop_reason, StopReason::Exhausted);

    let snapshots = store.load_all::<ComparePrice>().unwrap();
    assert_eq!(snapshots.len(), 1);
    let snapshot = &snapshots[0].record;
    assert_eq!(snapshot.retailer_name, "DubrayBooks.ie");
    assert_eq!(snapshot.price, Decimal::new(1099, 2));
    assert_eq!(
        snapshot.source_url,
        "https://www.dubraybooks.ie/product/bridgerton-the-duke-and-i-9780349429212"
    );
}
