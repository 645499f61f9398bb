//! Property tests for call-once coalescing.

use std::sync::Arc;
use std::time::Duration;

use implicit_open::{CallOnceCoordinator, Error, FnStrategy, OpenState};
use proptest::prelude::*;
use tokio::runtime::{Builder, Runtime};

const CALLER_TIMEOUT: Duration = Duration::from_secs(10);

fn runtime() -> Runtime {
    Builder::new_multi_thread()
        .worker_threads(4)
        .enable_all()
        .build()
        .expect("runtime")
}

fn delayed_open(delay: Duration) -> CallOnceCoordinator {
    CallOnceCoordinator::new(FnStrategy::new(move |_timeout| async move {
        tokio::time::sleep(delay).await;
        Ok::<(), Error>(())
    }))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn concurrent_callers_share_exactly_one_open(callers in 1usize..64, delay_ms in 0u64..20) {
        let rt = runtime();
        let coordinator = Arc::new(delayed_open(Duration::from_millis(delay_ms)));

        let results = rt.block_on(async {
            let tasks: Vec<_> = (0..callers)
                .map(|_| {
                    let coordinator = Arc::clone(&coordinator);
                    tokio::spawn(async move { coordinator.ensure_opened(CALLER_TIMEOUT).await })
                })
                .collect();

            let mut results = Vec::with_capacity(callers);
            for task in tasks {
                results.push(task.await.expect("task panicked"));
            }
            results
        });

        prop_assert!(results.iter().all(Result::is_ok));
        prop_assert_eq!(coordinator.open_attempts(), 1);
        prop_assert_eq!(coordinator.state(), OpenState::Opened);
        prop_assert_eq!(coordinator.waiter_count(), 0);
    }

    #[test]
    fn abort_releases_every_waiter(callers in 1usize..64) {
        let rt = runtime();
        let coordinator = Arc::new(CallOnceCoordinator::new(FnStrategy::new(|_timeout| async {
            std::future::pending::<()>().await;
            Ok::<(), Error>(())
        })));

        let results = rt.block_on(async {
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

            let mut results = Vec::with_capacity(callers);
            for task in tasks {
                results.push(task.await.expect("task panicked"));
            }
            results
        });

        prop_assert!(results.iter().all(|r| matches!(r, Err(Error::Aborted))));
        prop_assert!(coordinator.open_attempts() <= 1);
        prop_assert_eq!(coordinator.waiter_count(), 0);
    }
}
