//! Per-channel configuration.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use implicit_open::channel::ChannelOptions;
//!
//! let options = ChannelOptions::new()
//!     .with_send_timeout(Duration::from_secs(20))
//!     .with_open_timeout(Duration::from_secs(5));
//!
//! assert_eq!(options.send_timeout(), Duration::from_secs(20));
//! assert_eq!(options.open_timeout(), Some(Duration::from_secs(5)));
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::http::MessageHandler;

// ============================================================================
// Constants
// ============================================================================

/// Default budget for one operation, implicit open included.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Default timeout for an explicit [`open`](super::ServiceChannel::open).
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// ChannelOptions
// ============================================================================

/// Timeouts and HTTP settings shared by channels of one factory.
#[derive(Debug, Clone)]
pub struct ChannelOptions {
    /// Budget for one operation.
    send_timeout: Duration,
    /// Physical open timeout. `None` uses the triggering caller's budget.
    open_timeout: Option<Duration>,
    /// Handshake HTTP settings.
    http: MessageHandler,
}

impl Default for ChannelOptions {
    fn default() -> Self {
        Self {
            send_timeout: DEFAULT_SEND_TIMEOUT,
            open_timeout: None,
            http: MessageHandler::default(),
        }
    }
}

impl ChannelOptions {
    /// Creates options with default values.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

// ============================================================================
// ChannelOptions - Builder Methods
// ============================================================================

impl ChannelOptions {
    /// Sets the per-operation budget. Zero makes every unopened call fail at once.
    #[inline]
    #[must_use]
    pub fn with_send_timeout(mut self, timeout: Duration) -> Self {
        self.send_timeout = timeout;
        self
    }

    /// Sets a physical open timeout independent of caller budgets.
    #[inline]
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = Some(timeout);
        self
    }

    /// Sets the handshake HTTP settings.
    #[inline]
    #[must_use]
    pub fn with_http_handler(mut self, handler: MessageHandler) -> Self {
        self.http = handler;
        self
    }
}

// ============================================================================
// ChannelOptions - Accessors
// ============================================================================

impl ChannelOptions {
    /// Returns the per-operation budget.
    #[inline]
    #[must_use]
    pub const fn send_timeout(&self) -> Duration {
        self.send_timeout
    }

    /// Returns the physical open timeout, if set.
    #[inline]
    #[must_use]
    pub const fn open_timeout(&self) -> Option<Duration> {
        self.open_timeout
    }

    /// Returns the timeout used by an explicit open.
    #[inline]
    #[must_use]
    pub fn explicit_open_timeout(&self) -> Duration {
        self.open_timeout.unwrap_or(DEFAULT_OPEN_TIMEOUT)
    }

    /// Returns the handshake HTTP settings.
    #[inline]
    #[must_use]
    pub const fn http_handler(&self) -> &MessageHandler {
        &self.http
    }

    /// Validates the options.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the open timeout is zero.
    pub fn validate(&self) -> Result<()> {
        if self.open_timeout.is_some_and(|timeout| timeout.is_zero()) {
            return Err(Error::config("Open timeout must be greater than zero"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
