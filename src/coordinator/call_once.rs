//! Call-once coordinator and waiter queue.
//!
//! See the [module docs](super) for the state machine.
//!
//! # Locking
//!
//! State, recorded error and waiter map sit behind one `parking_lot` mutex.
//! It is held only to inspect or transition the state and to register or
//! drain waiters. The physical open runs on its own tokio task, outside the
//! lock, so dropping the caller that triggered it cannot strand the other
//! waiters. A panic inside the strategy is caught and faults the channel.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures_util::FutureExt;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::oneshot;
use tokio::task::AbortHandle;
use tokio::time::{Instant, timeout, timeout_at};
use tracing::{debug, error, info, trace, warn};

use crate::error::{Error, Result};
use crate::identifiers::{ChannelId, WaiterId};

use super::state::OpenState;
use super::strategy::OpenStrategy;

// ============================================================================
// Types
// ============================================================================

/// Map of waiter IDs to their completion handles.
type WaiterMap = FxHashMap<WaiterId, oneshot::Sender<Result<()>>>;

/// Waiters drained from the map, ready to be released.
type Released = Vec<(WaiterId, oneshot::Sender<Result<()>>)>;

// ============================================================================
// Inner
// ============================================================================

/// Mutable state guarded by the coordinator lock.
struct Inner {
    /// Current lifecycle state.
    state: OpenState,
    /// Error recorded on entering a terminal state.
    terminal_error: Option<Error>,
    /// Callers suspended until the open resolves.
    waiters: WaiterMap,
    /// Counter for waiter ids.
    next_waiter: u64,
    /// Handle of the in-flight open task.
    open_task: Option<AbortHandle>,
}

impl Inner {
    fn new() -> Self {
        Self {
            state: OpenState::Idle,
            terminal_error: None,
            waiters: WaiterMap::default(),
            next_waiter: 0,
            open_task: None,
        }
    }

    /// Registers a new waiter.
    fn register(&mut self) -> (WaiterId, oneshot::Receiver<Result<()>>) {
        let waiter_id = WaiterId::new(self.next_waiter);
        self.next_waiter += 1;

        let (tx, rx) = oneshot::channel();
        self.waiters.insert(waiter_id, tx);

        (waiter_id, rx)
    }

    /// Removes every waiter from the map.
    fn drain_waiters(&mut self) -> Released {
        self.waiters.drain().collect()
    }

    /// Error handed to callers once the state is terminal.
    fn terminal_error(&self) -> Error {
        self.terminal_error.clone().unwrap_or(Error::ChannelClosed)
    }
}

// ============================================================================
// Shared
// ============================================================================

/// State shared between coordinator handles and the open task.
struct Shared {
    /// Channel this coordinator belongs to.
    channel_id: ChannelId,
    /// Performs the physical open.
    strategy: Arc<dyn OpenStrategy>,
    /// Timeout for the physical open. `None` uses the triggering caller's timeout.
    open_timeout: Option<Duration>,
    /// Guarded state.
    inner: Mutex<Inner>,
    /// Number of physical opens started.
    open_attempts: AtomicUsize,
}

impl Shared {
    /// Spawns the physical open. Called with the lock held, state already `Opening`.
    fn spawn_open(shared: &Arc<Self>, open_timeout: Duration) -> AbortHandle {
        let attempt = shared.open_attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let timeout_ms = open_timeout.as_millis() as u64;

        debug!(
            channel = %shared.channel_id,
            attempt,
            timeout_ms,
            "Starting physical open"
        );

        let task_shared = Arc::clone(shared);
        let task = tokio::spawn(async move {
            let started = Instant::now();

            let open = AssertUnwindSafe(async {
                timeout(open_timeout, task_shared.strategy.open(open_timeout)).await
            });

            // Panics in the strategy fault the channel
            let outcome = match open.catch_unwind().await {
                Ok(Ok(Ok(()))) => Ok(()),
                Ok(Ok(Err(e))) => Err(Error::open_failed(e)),
                Ok(Err(_)) => Err(Error::open_failed(Error::connection_timeout(timeout_ms))),
                Err(_) => {
                    error!(channel = %task_shared.channel_id, attempt, "Open strategy panicked");
                    Err(Error::open_failed(Error::faulted("open strategy panicked")))
                }
            };

            task_shared.complete_open(outcome, started.elapsed());
        });

        task.abort_handle()
    }

    /// Records the open outcome and releases every waiter with it.
    fn complete_open(&self, outcome: Result<()>, elapsed: Duration) {
        let waiters = {
            let mut inner = self.inner.lock();
            inner.open_task = None;

            if inner.state != OpenState::Opening {
                debug!(
                    channel = %self.channel_id,
                    state = %inner.state,
                    "Open finished after channel left opening, outcome discarded"
                );
                return;
            }

            match &outcome {
                Ok(()) => inner.state = OpenState::Opened,
                Err(e) => {
                    inner.state = OpenState::Faulted;
                    inner.terminal_error = Some(e.clone());
                }
            }

            inner.drain_waiters()
        };

        let elapsed_ms = elapsed.as_millis() as u64;
        match &outcome {
            Ok(()) => info!(
                channel = %self.channel_id,
                waiters = waiters.len(),
                elapsed_ms,
                "Channel opened"
            ),
            Err(e) => warn!(
                channel = %self.channel_id,
                waiters = waiters.len(),
                elapsed_ms,
                error = %e,
                "Channel open failed"
            ),
        }

        release(waiters, &outcome);
    }

    /// Moves into a terminal state and fails every waiter with `error`.
    ///
    /// Returns `false` if the state was already terminal.
    fn terminate(&self, state: OpenState, error: Error) -> bool {
        let (previous, waiters, open_task) = {
            let mut inner = self.inner.lock();
            if inner.state.is_terminal() {
                trace!(channel = %self.channel_id, state = %inner.state, "Already terminal");
                return false;
            }

            let previous = inner.state;
            inner.state = state;
            inner.terminal_error = Some(error.clone());

            (previous, inner.drain_waiters(), inner.open_task.take())
        };

        if let Some(task) = open_task {
            task.abort();
            debug!(channel = %self.channel_id, "Cancelled in-flight open");
        }

        info!(
            channel = %self.channel_id,
            from = %previous,
            to = %state,
            waiters = waiters.len(),
            error = %error,
            "Channel terminated"
        );

        release(waiters, &Err(error));
        true
    }
}

/// Sends the same outcome to every drained waiter.
fn release(waiters: Released, outcome: &Result<()>) {
    for (waiter_id, tx) in waiters {
        if tx.send(outcome.clone()).is_err() {
            trace!(%waiter_id, "Waiter already gone");
        }
    }
}

// ============================================================================
// Registration
// ============================================================================

/// Deregisters a waiter when its caller stops waiting.
struct Registration<'a> {
    shared: &'a Shared,
    waiter_id: WaiterId,
}

impl Drop for Registration<'_> {
    fn drop(&mut self) {
        self.shared.inner.lock().waiters.remove(&self.waiter_id);
    }
}

// ============================================================================
// CallOnceCoordinator
// ============================================================================

/// Serializes the first open of a channel among concurrent callers.
///
/// Cloning is cheap; clones share the same state.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use implicit_open::coordinator::{CallOnceCoordinator, FnStrategy, OpenState};
///
/// # #[tokio::main]
/// # async fn main() -> implicit_open::Result<()> {
/// let coordinator = CallOnceCoordinator::new(FnStrategy::new(|_timeout: Duration| async {
///     Ok::<(), implicit_open::Error>(())
/// }));
///
/// coordinator.ensure_opened(Duration::from_secs(5)).await?;
/// assert_eq!(coordinator.state(), OpenState::Opened);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CallOnceCoordinator {
    shared: Arc<Shared>,
}

// ============================================================================
// CallOnceCoordinator - Constructors
// ============================================================================

impl CallOnceCoordinator {
    /// Creates a coordinator for a fresh channel.
    ///
    /// The physical open uses the timeout of the caller that triggers it.
    #[must_use]
    pub fn new(strategy: impl OpenStrategy) -> Self {
        Self::from_parts(ChannelId::next(), Arc::new(strategy), None)
    }

    /// Creates a coordinator with an explicit channel id and open timeout.
    ///
    /// # Arguments
    ///
    /// * `channel_id` - Channel the coordinator belongs to
    /// * `strategy` - Physical open
    /// * `open_timeout` - Timeout for the physical open, independent of waiter timeouts
    #[must_use]
    pub fn from_parts(
        channel_id: ChannelId,
        strategy: Arc<dyn OpenStrategy>,
        open_timeout: Option<Duration>,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                channel_id,
                strategy,
                open_timeout,
                inner: Mutex::new(Inner::new()),
                open_attempts: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns a handle that does not keep the coordinator alive.
    #[inline]
    #[must_use]
    pub fn downgrade(&self) -> WeakCoordinator {
        WeakCoordinator {
            shared: Arc::downgrade(&self.shared),
        }
    }
}

// ============================================================================
// CallOnceCoordinator - Open
// ============================================================================

impl CallOnceCoordinator {
    /// Waits until the channel is open, opening it if nobody has yet.
    ///
    /// # Errors
    ///
    /// - [`Error::OpenTimeout`] if `timeout` elapses first (zero fails at once)
    /// - [`Error::OpenFailed`] if the physical open failed
    /// - [`Error::Aborted`], [`Error::ChannelClosed`] or [`Error::Faulted`]
    ///   if the channel was terminated
    pub async fn ensure_opened(&self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now().checked_add(timeout);
        self.wait_opened(deadline, timeout).await
    }

    /// Same as [`ensure_opened`](Self::ensure_opened) with an absolute deadline.
    ///
    /// # Errors
    ///
    /// See [`ensure_opened`](Self::ensure_opened).
    pub async fn ensure_opened_until(&self, deadline: Instant) -> Result<()> {
        let timeout = deadline.saturating_duration_since(Instant::now());
        self.wait_opened(Some(deadline), timeout).await
    }

    async fn wait_opened(&self, deadline: Option<Instant>, timeout: Duration) -> Result<()> {
        let timeout_ms = timeout.as_millis() as u64;

        let (waiter_id, mut rx) = {
            let mut inner = self.shared.inner.lock();

            match inner.state {
                OpenState::Opened => return Ok(()),
                OpenState::Faulted | OpenState::Closed => return Err(inner.terminal_error()),
                OpenState::Idle | OpenState::Opening => {}
            }

            if timeout.is_zero() {
                return Err(Error::open_timeout(timeout_ms));
            }

            let waiter = inner.register();

            if inner.state == OpenState::Idle {
                inner.state = OpenState::Opening;
                let open_timeout = self.shared.open_timeout.unwrap_or(timeout);
                inner.open_task = Some(Shared::spawn_open(&self.shared, open_timeout));
            }

            waiter
        };

        trace!(channel = %self.shared.channel_id, %waiter_id, timeout_ms, "Waiting for open");

        let registration = Registration {
            shared: &self.shared,
            waiter_id,
        };

        let received = match deadline {
            Some(deadline) => timeout_at(deadline, &mut rx).await,
            None => Ok((&mut rx).await),
        };

        match received {
            Ok(Ok(outcome)) => outcome,
            Ok(Err(_)) => Err(Error::ChannelClosed),
            Err(_) => {
                drop(registration);

                // Released right at the deadline
                if let Ok(outcome) = rx.try_recv() {
                    return outcome;
                }

                debug!(
                    channel = %self.shared.channel_id,
                    %waiter_id,
                    timeout_ms,
                    "Waiter timed out before open completed"
                );
                Err(Error::open_timeout(timeout_ms))
            }
        }
    }
}

// ============================================================================
// CallOnceCoordinator - Termination
// ============================================================================

impl CallOnceCoordinator {
    /// Aborts the channel.
    ///
    /// Every waiter and every later caller receives [`Error::Aborted`].
    /// Returns `false` if the channel was already terminated.
    pub fn abort(&self) -> bool {
        self.shared.terminate(OpenState::Closed, Error::Aborted)
    }

    /// Closes the channel.
    ///
    /// Every waiter and every later caller receives [`Error::ChannelClosed`].
    /// Returns `false` if the channel was already terminated.
    pub fn close(&self) -> bool {
        self.shared.terminate(OpenState::Closed, Error::ChannelClosed)
    }

    /// Faults the channel with `error`.
    ///
    /// Returns `false` if the channel was already terminated.
    pub fn fault(&self, error: Error) -> bool {
        self.shared.terminate(OpenState::Faulted, error)
    }
}

// ============================================================================
// CallOnceCoordinator - Accessors
// ============================================================================

impl CallOnceCoordinator {
    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn channel_id(&self) -> ChannelId {
        self.shared.channel_id
    }

    /// Returns the current state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> OpenState {
        self.shared.inner.lock().state
    }

    /// Returns the recorded error once terminal.
    #[inline]
    #[must_use]
    pub fn terminal_error(&self) -> Option<Error> {
        self.shared.inner.lock().terminal_error.clone()
    }

    /// Returns the number of suspended callers.
    #[inline]
    #[must_use]
    pub fn waiter_count(&self) -> usize {
        self.shared.inner.lock().waiters.len()
    }

    /// Returns how many physical opens were started. Never exceeds 1.
    #[inline]
    #[must_use]
    pub fn open_attempts(&self) -> usize {
        self.shared.open_attempts.load(Ordering::SeqCst)
    }
}

impl fmt::Debug for CallOnceCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("CallOnceCoordinator")
            .field("channel_id", &self.shared.channel_id)
            .field("state", &inner.state)
            .field("waiters", &inner.waiters.len())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WeakCoordinator
// ============================================================================

/// Non-owning handle to a [`CallOnceCoordinator`].
///
/// Handed to transports for close notifications without creating a cycle.
#[derive(Clone)]
pub struct WeakCoordinator {
    shared: Weak<Shared>,
}

impl WeakCoordinator {
    /// Upgrades to a coordinator if it is still alive.
    #[inline]
    #[must_use]
    pub fn upgrade(&self) -> Option<CallOnceCoordinator> {
        self.shared
            .upgrade()
            .map(|shared| CallOnceCoordinator { shared })
    }
}

impl fmt::Debug for WeakCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WeakCoordinator").finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
