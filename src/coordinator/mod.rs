//! Call-once open coordination.
//!
//! A channel that is used without an explicit open must be opened exactly
//! once, no matter how many operations are issued concurrently while the open
//! is in flight. The coordinator performs that single physical open and fans
//! its outcome out to every caller that queued up behind it.
//!
//! # State Machine
//!
//! ```text
//!          ensure_opened            open ok
//!   Idle ───────────────► Opening ───────────► Opened
//!                            │                    │
//!                open failed │ fault()            │ abort() / close() / fault()
//!                            ▼                    ▼
//!                         Faulted / Closed  (terminal)
//! ```
//!
//! # Waiters
//!
//! Every caller that arrives while the state is `Idle` or `Opening` is
//! registered as a waiter with its own deadline. Waiters are released:
//!
//! - all together, with the open outcome, when the open completes
//! - all together, with the recorded error, on `abort`/`fault`/`close`
//! - one at a time, with [`Error::OpenTimeout`](crate::Error::OpenTimeout),
//!   when a waiter's own deadline elapses
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `call_once` | [`CallOnceCoordinator`] and its waiter queue |
//! | `state` | [`OpenState`] |
//! | `strategy` | [`OpenStrategy`] injection seam |

// ============================================================================
// Submodules
// ============================================================================

/// Coordinator and waiter queue.
pub mod call_once;

/// Open state of a channel.
pub mod state;

/// Physical open strategies.
pub mod strategy;

// ============================================================================
// Re-exports
// ============================================================================

pub use call_once::{CallOnceCoordinator, WeakCoordinator};
pub use state::OpenState;
pub use strategy::{FnStrategy, OpenStrategy};
