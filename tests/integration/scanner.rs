//! Integration tests for unified scan epochs

#[path = "test_utils.rs"]
mod test_utils;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use equitrix::error::FetchError;
use equitrix::models::StrategyCategory;
use equitrix::strategies::StrategyRegistry;
use tokio::time::Instant;

use test_utils::{
    build_rig, epoch, watchlist, CountingStrategy, Plan, RigOptions, ScriptedBroker,
};

#[tokio::test]
async fn scan_fetches_each_symbol_once_across_categories() {
    let broker = ScriptedBroker::new();
    let observed = Arc::new(Mutex::new(Vec::new()));

    // Two strategies per category, all recording the snapshot they see.
    let mut registry = StrategyRegistry::new();
    for (name, category) in [
        ("day_a", StrategyCategory::DayTrading),
        ("day_b", StrategyCategory::DayTrading),
        ("short_a", StrategyCategory::ShortSelling),
        ("short_b", StrategyCategory::ShortSelling),
    ] {
        registry.register(Arc::new(CountingStrategy {
            strategy_name: name,
            strategy_category: category,
            observed: observed.clone(),
        }));
    }

    let rig = build_rig(
        broker.clone(),
        RigOptions {
            registry: Arc::new(registry),
            watchlists: watchlist(&[
                (StrategyCategory::DayTrading, &["RELIANCE", "TCS"]),
                (StrategyCategory::ShortSelling, &["RELIANCE", "TCS"]),
            ]),
            ..RigOptions::default()
        },
    );

    let summary = rig
        .scanner
        .run(&epoch(
            1,
            vec![StrategyCategory::DayTrading, StrategyCategory::ShortSelling],
            Duration::from_secs(300),
        ))
        .await;

    // Both categories share the M5 interval, so each instrument is fetched
    // exactly once.
    assert_eq!(summary.symbols, 2);
    assert_eq!(summary.fetched, 2);
    assert_eq!(broker.total_calls(), 2);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.timed_out, 0);

    // 2 symbols x 4 strategies, and every strategy of a symbol saw the same
    // indicator frame.
    let observed = observed.lock().unwrap();
    assert_eq!(observed.len(), 8);
    for instrument in ["RELIANCE", "TCS"] {
        let frames: Vec<usize> = observed
            .iter()
            .filter(|(name, _)| name == instrument)
            .map(|(_, ptr)| *ptr)
            .collect();
        assert_eq!(frames.len(), 4);
        assert!(frames.iter().all(|ptr| *ptr == frames[0]));
    }
}

#[tokio::test(start_paused = true)]
async fn slow_symbol_is_cut_off_at_epoch_deadline() {
    let broker = ScriptedBroker::new();
    broker.plan("RELIANCE", Plan::ok_after(Duration::from_secs(400), 60));
    broker.plan("TCS", Plan::ok_after(Duration::from_secs(1), 60));

    let rig = build_rig(
        broker.clone(),
        RigOptions {
            symbol_timeout: Duration::from_secs(300),
            fetch_timeout: Duration::from_secs(300),
            watchlists: watchlist(&[(StrategyCategory::DayTrading, &["RELIANCE", "TCS"])]),
            ..RigOptions::default()
        },
    );

    let started = Instant::now();
    let summary = rig
        .scanner
        .run(&epoch(
            1,
            vec![StrategyCategory::DayTrading],
            Duration::from_secs(300),
        ))
        .await;
    let elapsed = started.elapsed();

    assert_eq!(summary.fetched, 2);
    assert_eq!(summary.timed_out, 1);
    assert_eq!(summary.failed, 0);
    // The fast symbol finished; the epoch ended at the deadline, not at the
    // slow broker's convenience.
    assert!(elapsed >= Duration::from_secs(300));
    assert!(elapsed < Duration::from_secs(301));
}

#[tokio::test(start_paused = true)]
async fn rate_limited_fetch_recovers_within_the_scan() {
    let broker = ScriptedBroker::new();
    broker.plan("RELIANCE", Plan::err(FetchError::RateLimited { retry_after: None }));
    broker.plan("RELIANCE", Plan::err(FetchError::RateLimited { retry_after: None }));
    broker.plan("RELIANCE", Plan::ok_after(Duration::from_millis(10), 60));

    let rig = build_rig(
        broker.clone(),
        RigOptions {
            watchlists: watchlist(&[(StrategyCategory::DayTrading, &["RELIANCE"])]),
            ..RigOptions::default()
        },
    );

    let summary = rig
        .scanner
        .run(&epoch(
            1,
            vec![StrategyCategory::DayTrading],
            Duration::from_secs(300),
        ))
        .await;

    assert_eq!(broker.calls_for("RELIANCE"), 3);
    assert_eq!(summary.fetched, 1);
    assert_eq!(summary.failed, 0);
    assert_eq!(summary.timed_out, 0);
    // The recovered series is cached for the next scan.
    assert_eq!(rig.cache.len(), 1);
}

#[tokio::test(start_paused = true)]
async fn parallelism_bounds_concurrent_symbol_tasks() {
    let broker = ScriptedBroker::with_default_delay(Duration::from_secs(1));
    let rig = build_rig(
        broker.clone(),
        RigOptions {
            parallelism: 2,
            watchlists: watchlist(&[(
                StrategyCategory::DayTrading,
                &["S1", "S2", "S3", "S4", "S5", "S6", "S7", "S8"],
            )]),
            ..RigOptions::default()
        },
    );

    let summary = rig
        .scanner
        .run(&epoch(
            1,
            vec![StrategyCategory::DayTrading],
            Duration::from_secs(300),
        ))
        .await;

    assert_eq!(summary.fetched, 8);
    assert_eq!(broker.total_calls(), 8);
    assert!(
        broker.max_concurrency() <= 2,
        "observed {} concurrent fetches",
        broker.max_concurrency()
    );
}

#[tokio::test(start_paused = true)]
async fn shutdown_cancels_in_flight_symbol_tasks() {
    let broker = ScriptedBroker::with_default_delay(Duration::from_secs(1_000));
    let rig = build_rig(
        broker.clone(),
        RigOptions {
            parallelism: 2,
            symbol_timeout: Duration::from_secs(600),
            fetch_timeout: Duration::from_secs(600),
            watchlists: watchlist(&[(
                StrategyCategory::DayTrading,
                &["S1", "S2", "S3", "S4", "S5", "S6"],
            )]),
            ..RigOptions::default()
        },
    );

    let scanner = rig.scanner.clone();
    let scan = tokio::spawn(async move {
        scanner
            .run(&epoch(
                1,
                vec![StrategyCategory::DayTrading],
                Duration::from_secs(600),
            ))
            .await
    });

    let started = Instant::now();
    tokio::time::sleep(Duration::from_secs(1)).await;
    rig.shutdown.send(true).unwrap();
    let summary = scan.await.unwrap();

    assert_eq!(summary.cancelled, 6);
    assert_eq!(summary.candidates, 0);
    // Cancellation is prompt: nowhere near the 600 s budgets.
    assert!(started.elapsed() < Duration::from_secs(5));
}
