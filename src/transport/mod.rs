//! Transport layer.
//!
//! A [`Transport`] is what a channel opens, sends requests over, and
//! aborts. The call-once coordinator only ever sees
//! [`Transport::open`], through an
//! [`OpenStrategy`](crate::coordinator::OpenStrategy).
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐                              ┌─────────────────┐
//! │ ServiceChannel   │                              │  ServiceHost    │
//! │                  │         WebSocket            │                 │
//! │  WsTransport     │◄────────────────────────────►│  echo service   │
//! │  → Connection    │     ws://127.0.0.1:PORT/addr │                 │
//! └──────────────────┘                              └─────────────────┘
//! ```
//!
//! # Connection Lifecycle
//!
//! 1. `WsTransport::open` - HTTP upgrade with the handler's headers
//! 2. `Connection` - Send requests, correlate responses
//! 3. `WsTransport::abort` / `close` - Shut the connection down
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `connection` | WebSocket connection and event loop |
//! | `ws` | WebSocket client transport |

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;
use crate::protocol::{Request, Response};

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket connection and event loop.
pub mod connection;

/// WebSocket client transport.
pub mod ws;

// ============================================================================
// Re-exports
// ============================================================================

pub use connection::{Connection, MAX_PENDING_REQUESTS};
pub use ws::WsTransport;

// ============================================================================
// Types
// ============================================================================

/// Callback run when the remote side drops an open transport.
pub type CloseHandler = Arc<dyn Fn() + Send + Sync>;

// ============================================================================
// Transport
// ============================================================================

/// A channel's physical transport.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Establishes the transport within `timeout`.
    async fn open(&self, timeout: Duration) -> Result<()>;

    /// Sends a request and waits up to `timeout` for its response.
    async fn request(&self, request: Request, timeout: Duration) -> Result<Response>;

    /// Tears the transport down immediately. Later opens fail.
    fn abort(&self);

    /// Closes the transport.
    async fn close(&self) -> Result<()>;

    /// Registers the callback for remote-initiated closes.
    fn set_close_handler(&self, handler: CloseHandler);
}
