//! Client channel with implicit open.
//!
//! Every operation first goes through the channel's
//! [`CallOnceCoordinator`], so concurrent first calls share one physical
//! open and an abort releases all of them at once.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::coordinator::{CallOnceCoordinator, OpenState, OpenStrategy};
use crate::error::{Error, Result};
use crate::identifiers::ChannelId;
use crate::protocol::{Operation, Request};
use crate::transport::{Transport, WsTransport};

use super::options::ChannelOptions;

// ============================================================================
// TransportOpen
// ============================================================================

/// Opens a channel by opening its transport.
struct TransportOpen<T> {
    transport: Arc<T>,
}

#[async_trait]
impl<T: Transport> OpenStrategy for TransportOpen<T> {
    async fn open(&self, timeout: Duration) -> Result<()> {
        self.transport.open(timeout).await
    }
}

// ============================================================================
// ServiceChannel
// ============================================================================

/// One logical client channel.
///
/// Cheap to share across tasks through [`Arc`]; every method takes `&self`.
pub struct ServiceChannel<T: Transport = WsTransport> {
    transport: Arc<T>,
    coordinator: CallOnceCoordinator,
    options: ChannelOptions,
}

impl<T: Transport> ServiceChannel<T> {
    /// Creates a channel over an unopened transport.
    #[must_use]
    pub fn with_transport(transport: T, options: ChannelOptions) -> Self {
        let transport = Arc::new(transport);
        let strategy = Arc::new(TransportOpen {
            transport: Arc::clone(&transport),
        });
        let coordinator =
            CallOnceCoordinator::from_parts(ChannelId::next(), strategy, options.open_timeout());

        let weak = coordinator.downgrade();
        transport.set_close_handler(Arc::new(move || {
            if let Some(coordinator) = weak.upgrade() {
                coordinator.fault(Error::ConnectionClosed);
            }
        }));

        Self {
            transport,
            coordinator,
            options,
        }
    }

    /// Returns the channel id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> ChannelId {
        self.coordinator.channel_id()
    }

    /// Returns the open state.
    #[inline]
    #[must_use]
    pub fn state(&self) -> OpenState {
        self.coordinator.state()
    }

    /// Returns the channel's coordinator.
    #[inline]
    #[must_use]
    pub fn coordinator(&self) -> &CallOnceCoordinator {
        &self.coordinator
    }

    /// Returns the transport.
    #[inline]
    #[must_use]
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Returns the channel options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }
}

// ============================================================================
// ServiceChannel - Lifecycle
// ============================================================================

impl<T: Transport> ServiceChannel<T> {
    /// Opens the channel explicitly.
    ///
    /// # Errors
    ///
    /// Same as [`CallOnceCoordinator::ensure_opened`].
    pub async fn open(&self) -> Result<()> {
        self.coordinator
            .ensure_opened(self.options.explicit_open_timeout())
            .await
    }

    /// Aborts the channel.
    ///
    /// Callers waiting for the open, and requests in flight, fail with
    /// [`Error::Aborted`].
    pub fn abort(&self) {
        if self.coordinator.abort() {
            info!(channel = %self.id(), "Channel aborted");
        }
        self.transport.abort();
    }

    /// Closes the channel.
    ///
    /// # Errors
    ///
    /// Returns the transport's close error, if any.
    pub async fn close(&self) -> Result<()> {
        if self.coordinator.close() {
            debug!(channel = %self.id(), "Channel closed");
        }
        self.transport.close().await
    }
}

// ============================================================================
// ServiceChannel - Operations
// ============================================================================

impl<T: Transport> ServiceChannel<T> {
    /// Invokes a service operation, opening the channel if needed.
    ///
    /// The send timeout covers the implicit open and the request.
    ///
    /// # Errors
    ///
    /// - [`Error::OpenTimeout`] if the channel did not open within budget
    /// - [`Error::Aborted`] if the channel was aborted
    /// - [`Error::RequestTimeout`] if the response did not arrive within budget
    /// - [`Error::ServiceFault`] or [`Error::ActionNotSupported`] from the service
    pub async fn call(&self, operation: &Operation) -> Result<Value> {
        self.invoke(Request::new(operation)).await
    }

    /// Invokes an action by name with raw JSON parameters.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn call_raw(&self, action: impl Into<String>, params: Value) -> Result<Value> {
        self.invoke(Request::raw(action, params)).await
    }

    /// Calls the `echo` operation.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn echo(&self, message: impl Into<String>) -> Result<String> {
        let operation = Operation::Echo {
            message: message.into(),
        };
        expect_string(self.call(&operation).await?)
    }

    /// Calls the `echoWithTimeout` operation; the service waits `delay` first.
    ///
    /// # Errors
    ///
    /// See [`call`](Self::call).
    pub async fn echo_with_timeout(
        &self,
        message: impl Into<String>,
        delay: Duration,
    ) -> Result<String> {
        let operation = Operation::EchoWithTimeout {
            message: message.into(),
            delay_ms: delay.as_millis() as u64,
        };
        expect_string(self.call(&operation).await?)
    }

    async fn invoke(&self, request: Request) -> Result<Value> {
        let budget = self.options.send_timeout();
        let started = Instant::now();

        self.coordinator.ensure_opened(budget).await?;

        let remaining = budget.saturating_sub(started.elapsed());
        if remaining.is_zero() {
            return Err(Error::request_timeout(request.id, budget.as_millis() as u64));
        }

        debug!(
            channel = %self.id(),
            request_id = %request.id,
            action = %request.action,
            "Sending request"
        );

        match self.transport.request(request, remaining).await {
            Ok(response) => response.into_result(),
            Err(e) => Err(self.surface_error(e)),
        }
    }

    /// Reports the channel's terminal error in place of the connection
    /// failure it caused.
    fn surface_error(&self, error: Error) -> Error {
        if error.is_connection_error()
            && let Some(terminal) = self.coordinator.terminal_error()
        {
            return terminal;
        }
        error
    }
}

fn expect_string(value: Value) -> Result<String> {
    match value {
        Value::String(text) => Ok(text),
        other => Err(Error::protocol(format!("Expected string result, got {other}"))),
    }
}

impl<T: Transport> fmt::Debug for ServiceChannel<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServiceChannel")
            .field("id", &self.id())
            .field("state", &self.state())
            .field("send_timeout", &self.options.send_timeout())
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================
