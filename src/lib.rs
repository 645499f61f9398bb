//! Implicit open - call-once channel opening for RPC clients.
//!
//! A client channel that is used without being opened first opens itself
//! on the first operation. When many operations are issued concurrently
//! against such a channel, exactly one physical open runs; every other
//! caller waits for its outcome. If the channel is aborted, closed or
//! faulted while they wait, all of them are released at once instead of
//! each sitting out its full timeout.
//!
//! # Architecture
//!
//! ```text
//!  call() ──┐
//!  call() ──┼──► CallOnceCoordinator ──(one open)──► Transport ──► ServiceHost
//!  call() ──┘         │   ▲
//!                     │   └── abort() / close() / fault()
//!                     ▼
//!          every waiter released with the same outcome
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use implicit_open::{ChannelFactory, Result, ServiceHost};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let host = ServiceHost::builder().address("echo").start().await?;
//!
//!     let factory = ChannelFactory::builder()
//!         .endpoint(host.endpoint())
//!         .send_timeout(Duration::from_secs(20))
//!         .build()?;
//!
//!     // No explicit open: the first call opens the channel.
//!     let channel = factory.create_channel();
//!     let reply = channel.echo("hello").await?;
//!     println!("{reply}");
//!
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`certificates`] | Certificate stores and installation |
//! | [`channel`] | Channel factory and service channel |
//! | [`coordinator`] | Call-once open coordinator |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`host`] | In-process echo service |
//! | [`http`] | HTTP handshake settings |
//! | [`identifiers`] | Type-safe ID wrappers |
//! | [`protocol`] | Request/response wire types |
//! | [`transport`] | WebSocket transport layer |

// ============================================================================
// Modules
// ============================================================================

/// Certificate stores and installation.
pub mod certificates;

/// Channel factory and service channel.
///
/// Use [`ChannelFactory::builder()`] to configure channels.
pub mod channel;

/// Call-once open coordination.
pub mod coordinator;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// In-process echo service host.
pub mod host;

/// HTTP handshake settings.
pub mod http;

/// Type-safe identifiers.
pub mod identifiers;

/// Request/response wire types.
pub mod protocol;

/// WebSocket transport layer.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Channel types
pub use channel::{ChannelFactory, ChannelOptions, ServiceChannel};

// Coordinator types
pub use coordinator::{CallOnceCoordinator, FnStrategy, OpenState, OpenStrategy};

// Error types
pub use error::{Error, Result};

// Host types
pub use host::{Binding, SecurityMode, ServiceHost};

// Identifier types
pub use identifiers::{ChannelId, RequestId, WaiterId};

// Transport types
pub use transport::{Transport, WsTransport};
