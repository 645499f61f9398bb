//! Coalesced open benchmark suite.
//!
//! Measures how long N concurrent first callers take to get through one
//! shared open, and how cheap the fast path is once the channel is open.
//! - Caller counts: 1, 10, 100, 1000
//!
//! Run with: cargo bench --bench coalesced_open
//! Results saved to: target/criterion/

use std::sync::Arc;
use std::time::Duration;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use futures_util::future::join_all;
use implicit_open::{CallOnceCoordinator, Error, FnStrategy};
use tokio::runtime::Runtime;

// ============================================================================
// Benchmark Parameters
// ============================================================================

const CALLER_COUNTS: &[usize] = &[1, 10, 100, 1000];

const CALLER_TIMEOUT: Duration = Duration::from_secs(5);

// ============================================================================
// Helpers
// ============================================================================

fn coordinator() -> Arc<CallOnceCoordinator> {
    Arc::new(CallOnceCoordinator::new(FnStrategy::new(|_timeout| async {
        tokio::task::yield_now().await;
        Ok::<(), Error>(())
    })))
}

async fn open_concurrently(callers: usize) {
    let coordinator = coordinator();

    let tasks = (0..callers).map(|_| {
        let coordinator = Arc::clone(&coordinator);
        tokio::spawn(async move { coordinator.ensure_opened(CALLER_TIMEOUT).await })
    });

    for result in join_all(tasks).await {
        result.expect("task panicked").expect("open failed");
    }
}

async fn abort_waiters(callers: usize) {
    let coordinator = Arc::new(CallOnceCoordinator::new(FnStrategy::new(|_timeout| async {
        std::future::pending::<()>().await;
        Ok::<(), Error>(())
    })));

    let tasks: Vec<_> = (0..callers)
        .map(|_| {
            let coordinator = Arc::clone(&coordinator);
            tokio::spawn(async move { coordinator.ensure_opened(CALLER_TIMEOUT).await })
        })
        .collect();

    while coordinator.waiter_count() < callers {
        tokio::task::yield_now().await;
    }
    coordinator.abort();

    for result in join_all(tasks).await {
        assert!(result.expect("task panicked").is_err());
    }
}

// ============================================================================
// Benchmark: Shared Open
// ============================================================================

fn bench_shared_open(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("shared_open");

    for &count in CALLER_COUNTS {
        group.bench_with_input(BenchmarkId::new("callers", count), &count, |b, &callers| {
            b.to_async(&rt).iter(|| open_concurrently(callers));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Abort Release
// ============================================================================

fn bench_abort_release(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    let mut group = c.benchmark_group("abort_release");
    group.sample_size(20);

    for &count in CALLER_COUNTS {
        group.bench_with_input(BenchmarkId::new("waiters", count), &count, |b, &callers| {
            b.to_async(&rt).iter(|| abort_waiters(callers));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark: Opened Fast Path
// ============================================================================

fn bench_opened_fast_path(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let coordinator = coordinator();
    rt.block_on(coordinator.ensure_opened(CALLER_TIMEOUT))
        .expect("open failed");

    c.bench_function("opened_fast_path", |b| {
        b.to_async(&rt)
            .iter(|| async { coordinator.ensure_opened(CALLER_TIMEOUT).await });
    });
}

criterion_group!(
    benches,
    bench_shared_open,
    bench_abort_release,
    bench_opened_fast_path
);
criterion_main!(benches);
