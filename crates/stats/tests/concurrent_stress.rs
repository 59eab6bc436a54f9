//! Concurrent accounting stress tests.
//!
//! Many tasks and threads construct, account and drop stopwatches against one
//! aggregator at once, optionally while windows are being rotated. No update
//! may be lost. A small rotation run is part of the default suite; the heavy
//! one is ignored by default:
//!
//! ```bash
//! cargo test -p dbclient-stats --test concurrent_stress -- --include-ignored
//! ```

#![allow(clippy::expect_used, clippy::panic)]

use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    thread,
};

use dbclient_stats::{
    Aggregator, AggregatorConfig, DriverErrorKind, ErrorType, OperationStopwatch,
    PoolConnectStatistics, PoolQueueStopwatch, PoolRequestStopwatch, ReadOpType,
    ReadOperationStatistics, TraceScope, WriteOpType, WriteOperationStatistics,
};
use tokio::task::JoinSet;

/// Number of concurrent tasks or threads.
const CONCURRENCY: usize = 16;

/// Number of stopwatches each task accounts.
const OPS_PER_TASK: usize = 1_000;

// ---------------------------------------------------------------------------
// Test: concurrent successes are all counted
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_successes_are_all_counted() {
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::new());

    let mut set = JoinSet::new();
    for _ in 0..CONCURRENCY {
        let agg = Arc::clone(&agg);
        set.spawn(async move {
            let scope = TraceScope::current();
            for _ in 0..OPS_PER_TASK {
                let mut stopwatch = OperationStopwatch::start(&scope, &agg, ReadOpType::Find);
                tokio::task::yield_now().await;
                stopwatch.account_success();
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    let find = &agg.snapshot()[ReadOpType::Find];
    let expected = (CONCURRENCY * OPS_PER_TASK) as u64;
    assert_eq!(find.count(ErrorType::Success), expected);
    assert_eq!(find.total(), expected);
    assert_eq!(find.timings.count(), expected);
}

// ---------------------------------------------------------------------------
// Test: mixed outcomes from OS threads
// ---------------------------------------------------------------------------

#[test]
fn mixed_outcomes_from_threads() {
    let agg: Arc<Aggregator<WriteOperationStatistics>> = Arc::new(Aggregator::new());

    let handles: Vec<_> = (0..CONCURRENCY)
        .map(|_| {
            let agg = Arc::clone(&agg);
            thread::spawn(move || {
                let scope = TraceScope::current();
                for i in 0..OPS_PER_TASK {
                    let mut stopwatch =
                        OperationStopwatch::start(&scope, &agg, WriteOpType::InsertOne);
                    match i % 4 {
                        0 => stopwatch.account_success(),
                        1 => stopwatch.account_error(DriverErrorKind::DuplicateKey),
                        2 => stopwatch.discard(),
                        _ => {},
                    }
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("thread should not panic");
    }

    let per_outcome = (CONCURRENCY * OPS_PER_TASK / 4) as u64;
    let insert = &agg.snapshot()[WriteOpType::InsertOne];
    assert_eq!(insert.count(ErrorType::Success), per_outcome);
    assert_eq!(insert.count(ErrorType::DuplicateKey), per_outcome);
    assert_eq!(insert.count(ErrorType::Other), per_outcome);
    assert_eq!(insert.total(), 3 * per_outcome);
}

// ---------------------------------------------------------------------------
// Test: pool stopwatches under contention
// ---------------------------------------------------------------------------

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pool_stopwatches_under_contention() {
    let agg: Arc<Aggregator<PoolConnectStatistics>> = Arc::new(Aggregator::new());

    let mut set = JoinSet::new();
    for _ in 0..CONCURRENCY {
        let agg = Arc::clone(&agg);
        set.spawn(async move {
            let scope = TraceScope::current();
            for _ in 0..OPS_PER_TASK {
                let _request = PoolRequestStopwatch::new(&scope, &agg);
                let mut queue = PoolQueueStopwatch::new(&scope, &agg);
                tokio::task::yield_now().await;
                queue.stop();
            }
        });
    }
    while let Some(result) = set.join_next().await {
        result.expect("task should not panic");
    }

    let expected = (CONCURRENCY * OPS_PER_TASK) as u64;
    let snapshot = agg.snapshot();
    assert_eq!(snapshot.requested, expected);
    assert_eq!(snapshot.request_timings.count(), expected);
    assert_eq!(snapshot.queue_wait_timings.count(), expected);
}

// ---------------------------------------------------------------------------
// Test: rotation while accounting loses nothing
// ---------------------------------------------------------------------------

/// Rotates continuously on one thread while `workers` threads each account
/// `ops_per_worker` stopwatches. Every sample must end up in exactly one
/// window: the one that was current when it was accounted. With no history
/// retained the rotating thread collects every retired window, so the total
/// over all of them plus the final current window must be exact.
fn rotate_while_accounting(workers: usize, ops_per_worker: usize) {
    let config = AggregatorConfig::builder().retained_windows(0).build().expect("valid config");
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::with_config(&config));
    let done = Arc::new(AtomicBool::new(false));

    let rotator = {
        let agg = Arc::clone(&agg);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            let mut retired = Vec::new();
            while !done.load(Ordering::Relaxed) {
                retired.push(agg.rotate());
                thread::yield_now();
            }
            retired
        })
    };

    let handles: Vec<_> = (0..workers)
        .map(|_| {
            let agg = Arc::clone(&agg);
            thread::spawn(move || {
                let scope = TraceScope::current();
                for _ in 0..ops_per_worker {
                    let mut stopwatch =
                        OperationStopwatch::start(&scope, &agg, ReadOpType::GetMore);
                    thread::yield_now();
                    stopwatch.account_success();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker should not panic");
    }
    done.store(true, Ordering::Relaxed);
    let retired = rotator.join().expect("rotator should not panic");

    let in_retired: u64 =
        retired.iter().map(|window| window[ReadOpType::GetMore].count(ErrorType::Success)).sum();
    let in_current = agg.snapshot()[ReadOpType::GetMore].count(ErrorType::Success);
    assert_eq!(in_retired + in_current, (workers * ops_per_worker) as u64);
    assert_eq!(agg.generation(), retired.len() as u64);
}

#[test]
fn rotation_while_accounting_loses_nothing() {
    rotate_while_accounting(4, 250);
}

#[test]
#[ignore]
fn rotation_under_load_loses_nothing() {
    rotate_while_accounting(CONCURRENCY, OPS_PER_TASK * 10);
}

/// With history retained, the merged snapshot sees every sample as long as no
/// window has been evicted yet.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn merged_snapshot_covers_retained_windows() {
    let config = AggregatorConfig::builder().retained_windows(8).build().expect("valid config");
    let agg: Arc<Aggregator<ReadOperationStatistics>> = Arc::new(Aggregator::with_config(&config));

    for _ in 0..4 {
        let mut set = JoinSet::new();
        for _ in 0..CONCURRENCY {
            let agg = Arc::clone(&agg);
            set.spawn(async move {
                let scope = TraceScope::current();
                for _ in 0..100 {
                    let mut stopwatch = OperationStopwatch::start(&scope, &agg, ReadOpType::Count);
                    stopwatch.account_error(DriverErrorKind::Server);
                }
            });
        }
        while let Some(result) = set.join_next().await {
            result.expect("task should not panic");
        }
        agg.rotate();
    }

    let merged = agg.merged_snapshot();
    assert_eq!(merged[ReadOpType::Count].count(ErrorType::Server), (4 * CONCURRENCY * 100) as u64);
    assert_eq!(agg.windows().len(), 4);
    assert_eq!(agg.snapshot()[ReadOpType::Count].total(), 0);
}
