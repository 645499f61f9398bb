//! Error types for implicit-open.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use implicit_open::{Error, Result};
//!
//! async fn example(channel: &ServiceChannel) -> Result<()> {
//!     let reply = channel.echo("hello").await?;
//!     assert_eq!(reply, "hello");
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Configuration | [`Error::Config`] |
//! | Open lifecycle | [`Error::OpenTimeout`], [`Error::OpenFailed`], [`Error::Aborted`], [`Error::ChannelClosed`], [`Error::Faulted`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | Protocol | [`Error::Protocol`], [`Error::ActionNotSupported`], [`Error::ServiceFault`], [`Error::RequestTimeout`] |
//! | Certificates | [`Error::CertificateNotFound`], [`Error::CertificateStore`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`], [`Error::Url`] |
//!
//! # Broadcasting
//!
//! [`Error`] is `Clone`. A single terminal error recorded by a
//! [`CallOnceCoordinator`](crate::coordinator::CallOnceCoordinator) is handed
//! to every waiter and every later caller, so foreign error types are held
//! behind an [`Arc`].

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;
use std::sync::Arc;

use thiserror::Error;
use tokio_tungstenite::tungstenite::Error as WsError;

use crate::identifiers::RequestId;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug, Clone)]
pub enum Error {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    ///
    /// Returned when a builder is given invalid settings.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    // ========================================================================
    // Open Lifecycle Errors
    // ========================================================================
    /// The caller's own deadline elapsed before the channel was opened.
    ///
    /// Local to one waiter; the open attempt and other waiters continue.
    #[error("Open timed out after {timeout_ms}ms")]
    OpenTimeout {
        /// Milliseconds the caller was willing to wait.
        timeout_ms: u64,
    },

    /// The physical open attempt failed.
    ///
    /// Broadcast verbatim to every waiter and every later caller.
    #[error("Open failed: {source}")]
    OpenFailed {
        /// The transport error that failed the open.
        source: Arc<Error>,
    },

    /// The channel was aborted.
    #[error("Channel aborted")]
    Aborted,

    /// The channel was closed gracefully.
    #[error("Channel closed")]
    ChannelClosed,

    /// The channel was faulted by its owner.
    #[error("Channel faulted: {message}")]
    Faulted {
        /// Reason supplied by the owner.
        message: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// WebSocket connection failed.
    ///
    /// Returned when the transport connection cannot be established.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection establishment timed out.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// WebSocket connection closed unexpectedly.
    ///
    /// Returned when connection is lost during operation.
    #[error("Connection closed")]
    ConnectionClosed,

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Protocol violation or unexpected response.
    #[error("Protocol error: {message}")]
    Protocol {
        /// Description of the protocol violation.
        message: String,
    },

    /// The service does not implement the requested action.
    #[error("Action not supported: {action}")]
    ActionNotSupported {
        /// The rejected action name.
        action: String,
    },

    /// The service replied with a fault.
    #[error("Service fault {code}: {reason}")]
    ServiceFault {
        /// Fault code.
        code: String,
        /// Human-readable fault reason.
        reason: String,
        /// Optional fault detail payload.
        detail: Option<String>,
    },

    /// Request timeout.
    ///
    /// Returned when no response arrives within the remaining send budget.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// The request ID that timed out.
        request_id: RequestId,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    // ========================================================================
    // Certificate Errors
    // ========================================================================
    /// No certificate matched the lookup.
    #[error("Certificate not found: {query}")]
    CertificateNotFound {
        /// Description of the lookup.
        query: String,
    },

    /// Certificate store could not be opened or written.
    #[error("Certificate store error: {message}")]
    CertificateStore {
        /// Description of the store failure.
        message: String,
    },

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(Arc<IoError>),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(Arc<serde_json::Error>),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(Arc<WsError>),

    /// Endpoint URL parse error.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// ============================================================================
// Conversions
// ============================================================================

impl From<IoError> for Error {
    fn from(err: IoError) -> Self {
        Self::Io(Arc::new(err))
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

impl From<WsError> for Error {
    fn from(err: WsError) -> Self {
        Self::WebSocket(Arc::new(err))
    }
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates an open timeout error.
    #[inline]
    pub fn open_timeout(timeout_ms: u64) -> Self {
        Self::OpenTimeout { timeout_ms }
    }

    /// Wraps a transport error as an open failure.
    ///
    /// Already-wrapped errors are returned unchanged.
    #[inline]
    pub fn open_failed(source: Error) -> Self {
        match source {
            err @ Self::OpenFailed { .. } => err,
            other => Self::OpenFailed {
                source: Arc::new(other),
            },
        }
    }

    /// Creates a faulted error.
    #[inline]
    pub fn faulted(message: impl Into<String>) -> Self {
        Self::Faulted {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a protocol error.
    #[inline]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Creates an action not supported error.
    #[inline]
    pub fn action_not_supported(action: impl Into<String>) -> Self {
        Self::ActionNotSupported {
            action: action.into(),
        }
    }

    /// Creates a service fault error.
    #[inline]
    pub fn service_fault(
        code: impl Into<String>,
        reason: impl Into<String>,
        detail: Option<String>,
    ) -> Self {
        Self::ServiceFault {
            code: code.into(),
            reason: reason.into(),
            detail,
        }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: RequestId, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }

    /// Creates a certificate not found error.
    #[inline]
    pub fn certificate_not_found(query: impl Into<String>) -> Self {
        Self::CertificateNotFound {
            query: query.into(),
        }
    }

    /// Creates a certificate store error.
    #[inline]
    pub fn certificate_store(message: impl Into<String>) -> Self {
        Self::CertificateStore {
            message: message.into(),
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::OpenTimeout { .. } | Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if the channel was aborted.
    #[inline]
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    /// Returns `true` if this is a connection error.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error leaves the channel unusable.
    ///
    /// A waiter's own [`Error::OpenTimeout`] is not terminal.
    #[inline]
    #[must_use]
    pub fn is_terminal_channel_error(&self) -> bool {
        matches!(
            self,
            Self::OpenFailed { .. } | Self::Aborted | Self::ChannelClosed | Self::Faulted { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
