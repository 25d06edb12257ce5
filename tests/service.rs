//! End-to-end service tests
//!
//! Runs the real pipeline against a local fixture upstream: fetch over HTTP,
//! normalize, publish, and query, plus the scheduler's failure and shutdown
//! behavior.

mod common;

use std::sync::Arc;
use std::time::Duration;

use propfeed::config::Config;
use propfeed::normalize::Normalizer;
use propfeed::query::{ProjectionFilter, QueryEngine};
use propfeed::scheduler::RefreshScheduler;
use propfeed::snapshot::SnapshotStore;
use propfeed::upstream::UpstreamClient;

/// Polls `check` every 50ms until it passes or ~5s elapse
async fn wait_for<F>(what: &str, mut check: F)
where
    F: FnMut() -> bool,
{
    for _ in 0..100 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!("Timed out waiting for {what}");
}

#[tokio::test]
async fn test_fetch_normalize_publish_query_pipeline() {
    let (base_url, upstream) = common::spawn_fixture_upstream().await;

    let client = UpstreamClient::new(base_url, Duration::from_secs(5));
    let payload = client.fetch().await.expect("Fixture fetch should succeed");

    let snapshot = Normalizer::new()
        .build(&payload)
        .expect("Fixture payload should build");
    assert_eq!(snapshot.skipped.total(), 0);

    let store = Arc::new(SnapshotStore::new());
    store.publish(snapshot);
    let engine = QueryEngine::new(Arc::clone(&store));

    assert_eq!(engine.list_sports().len(), 3);

    let lebron = engine.get_player("lebron james").expect("Player found");
    assert_eq!(lebron.team, Some("LAL".to_string()));
    assert_eq!(lebron.sport_id, 7);

    let points = engine.list_projections(&ProjectionFilter {
        stat_type: Some("Points".to_string()),
        ..Default::default()
    });
    assert_eq!(points.len(), 1);
    assert_eq!(points[0].line_score, 27.5);

    // No NFL data in the fixture.
    let nfl = engine.list_projections(&ProjectionFilter {
        sport_id: Some(2),
        ..Default::default()
    });
    assert!(nfl.is_empty());

    upstream.abort();
}

#[tokio::test]
async fn test_scheduler_populates_cache_at_startup() {
    let (base_url, upstream) = common::spawn_fixture_upstream().await;

    let store = Arc::new(SnapshotStore::new());
    let config = Config {
        base_url: base_url.clone(),
        fetch_timeout: Duration::from_secs(5),
        refresh_interval: Duration::from_secs(3600),
        ..Config::default()
    };
    let client = UpstreamClient::new(base_url, config.fetch_timeout);
    let scheduler = RefreshScheduler::spawn(client, Arc::clone(&store), &config);

    // The first cycle runs immediately, not after the first interval.
    let probe = Arc::clone(&store);
    wait_for("first snapshot", move || probe.current().version >= 1).await;

    let status = scheduler.handle().status();
    assert!(status.last_success_at.is_some());
    assert_eq!(status.consecutive_failures, 0);
    assert!(status.last_error.is_none());

    let engine = QueryEngine::new(Arc::clone(&store));
    assert!(engine.get_player("LeBron James").is_some());

    scheduler.shutdown().await;
    upstream.abort();
}

#[tokio::test]
async fn test_force_refresh_picks_up_new_data() {
    let (base_url, upstream) = common::spawn_fixture_upstream().await;

    let store = Arc::new(SnapshotStore::new());
    let config = Config {
        base_url: base_url.clone(),
        fetch_timeout: Duration::from_secs(5),
        refresh_interval: Duration::from_secs(3600),
        ..Config::default()
    };
    let client = UpstreamClient::new(base_url, config.fetch_timeout);
    let scheduler = RefreshScheduler::spawn(client, Arc::clone(&store), &config);

    let probe = Arc::clone(&store);
    wait_for("startup snapshot", move || probe.current().version >= 1).await;
    let before = store.current().version;

    scheduler.handle().force_refresh();

    let probe = Arc::clone(&store);
    wait_for("forced snapshot", move || probe.current().version > before).await;

    scheduler.shutdown().await;
    upstream.abort();
}

#[tokio::test]
async fn test_failures_keep_serving_previous_snapshot() {
    // Seed a good snapshot, then run the scheduler against a dead upstream.
    let store = Arc::new(SnapshotStore::new());
    let seeded = Normalizer::new()
        .build(&common::scenario_payload())
        .expect("Scenario payload should build");
    store.publish(seeded);

    let config = Config {
        base_url: "http://127.0.0.1:1".to_string(),
        fetch_timeout: Duration::from_secs(1),
        refresh_interval: Duration::from_millis(100),
        base_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        ..Config::default()
    };
    let client = UpstreamClient::new(config.base_url.clone(), config.fetch_timeout);
    let scheduler = RefreshScheduler::spawn(client, Arc::clone(&store), &config);
    let handle = scheduler.handle();

    let probe = handle.clone();
    wait_for("three consecutive failures", move || {
        probe.status().consecutive_failures >= 3
    })
    .await;

    let status = handle.status();
    assert!(status.last_error.is_some());
    assert!(status.last_success_at.is_none());

    // The seeded snapshot is untouched by the failing cycles.
    assert_eq!(store.current().version, 1);
    let engine = QueryEngine::new(Arc::clone(&store));
    assert_eq!(engine.list_sports().len(), 3);
    assert!(engine.get_player("lebron james").is_some());

    scheduler.shutdown().await;
}

#[tokio::test]
async fn test_shutdown_completes_promptly_during_backoff() {
    let config = Config {
        base_url: "http://127.0.0.1:1".to_string(),
        fetch_timeout: Duration::from_secs(1),
        refresh_interval: Duration::from_secs(3600),
        base_backoff: Duration::from_secs(3600),
        max_backoff: Duration::from_secs(3600),
        ..Config::default()
    };
    let store = Arc::new(SnapshotStore::new());
    let client = UpstreamClient::new(config.base_url.clone(), config.fetch_timeout);
    let scheduler = RefreshScheduler::spawn(client, Arc::clone(&store), &config);

    // Give the startup cycle time to fail and enter its hour-long backoff.
    tokio::time::sleep(Duration::from_millis(300)).await;

    tokio::time::timeout(Duration::from_secs(5), scheduler.shutdown())
        .await
        .expect("Shutdown should not wait out the backoff");
}
