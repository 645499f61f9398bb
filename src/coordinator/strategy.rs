//! Physical open strategies.
//!
//! The coordinator never knows how a channel is opened. It calls an
//! [`OpenStrategy`], which for real channels forwards to
//! [`Transport::open`](crate::transport::Transport::open) and in tests can
//! stall, fail, or count invocations.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use implicit_open::coordinator::FnStrategy;
//!
//! let strategy = FnStrategy::new(|_timeout: Duration| async {
//!     tokio::time::sleep(Duration::from_millis(10)).await;
//!     Ok::<(), implicit_open::Error>(())
//! });
//! # let _ = strategy;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

// ============================================================================
// OpenStrategy
// ============================================================================

/// Performs the physical open of a channel.
///
/// Invoked at most once per coordinator. The future may be dropped before it
/// completes if the channel is aborted while opening.
#[async_trait]
pub trait OpenStrategy: Send + Sync + 'static {
    /// Opens the channel within `timeout`.
    async fn open(&self, timeout: Duration) -> Result<()>;
}

// ============================================================================
// FnStrategy
// ============================================================================

/// Adapts an async closure into an [`OpenStrategy`].
pub struct FnStrategy<F> {
    /// The wrapped closure.
    open_fn: F,
}

impl<F> FnStrategy<F> {
    /// Wraps a closure taking the open timeout.
    #[inline]
    #[must_use]
    pub const fn new(open_fn: F) -> Self {
        Self { open_fn }
    }
}

impl<F> fmt::Debug for FnStrategy<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnStrategy").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> OpenStrategy for FnStrategy<F>
where
    F: Fn(Duration) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<()>> + Send + 'static,
{
    async fn open(&self, timeout: Duration) -> Result<()> {
        (self.open_fn)(timeout).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use crate::error::Error;

    #[tokio::test]
    async fn test_fn_strategy_forwards_timeout() {
        let seen = Arc::new(AtomicU64::new(0));
        let seen_clone = Arc::clone(&seen);
        let strategy = FnStrategy::new(move |timeout: Duration| {
            let seen = Arc::clone(&seen_clone);
            async move {
                seen.store(timeout.as_millis() as u64, Ordering::SeqCst);
                Ok::<(), Error>(())
            }
        });

        strategy
            .open(Duration::from_millis(1234))
            .await
            .expect("open succeeds");
        assert_eq!(seen.load(Ordering::SeqCst), 1234);
    }

    #[tokio::test]
    async fn test_fn_strategy_propagates_error() {
        let strategy = FnStrategy::new(|_timeout: Duration| async {
            Err::<(), _>(Error::connection("refused"))
        });

        let err = strategy.open(Duration::from_secs(1)).await.unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }
}
