//! Request and Response message types.
//!
//! Defines the message format for service calls between a
//! [`ServiceChannel`](crate::channel::ServiceChannel) and a
//! [`ServiceHost`](crate::host::ServiceHost).

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::identifiers::RequestId;

use super::Operation;

// ============================================================================
// Constants
// ============================================================================

/// Fault code for actions the service does not implement.
pub const ACTION_NOT_SUPPORTED: &str = "ActionNotSupported";

/// Fault code for undeclared errors raised inside the service.
pub const INTERNAL_SERVICE_FAULT: &str = "InternalServiceFault";

// ============================================================================
// Request
// ============================================================================

/// A service call.
///
/// # Format
///
/// ```json
/// {
///   "id": "uuid",
///   "action": "echo",
///   "params": { "message": "hello" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique identifier for request/response correlation.
    pub id: RequestId,

    /// Action name.
    pub action: String,

    /// Action parameters.
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Creates a request for a known operation with auto-generated ID.
    #[inline]
    #[must_use]
    pub fn new(operation: &Operation) -> Self {
        Self::raw(operation.action(), operation.params())
    }

    /// Creates a request for an arbitrary action.
    #[inline]
    #[must_use]
    pub fn raw(action: impl Into<String>, params: Value) -> Self {
        Self {
            id: RequestId::generate(),
            action: action.into(),
            params,
        }
    }

    /// Parses the action into a known [`Operation`].
    #[inline]
    #[must_use]
    pub fn operation(&self) -> Option<Operation> {
        Operation::parse(&self.action, &self.params)
    }
}

// ============================================================================
// Fault
// ============================================================================

/// Fault carried by an unsuccessful response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    /// Fault code.
    pub code: String,

    /// Human-readable reason.
    pub reason: String,

    /// Optional detail payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Fault {
    /// Creates a fault.
    #[inline]
    #[must_use]
    pub fn new(code: impl Into<String>, reason: impl Into<String>, detail: Option<String>) -> Self {
        Self {
            code: code.into(),
            reason: reason.into(),
            detail,
        }
    }
}

// ============================================================================
// Response
// ============================================================================

/// A reply to a [`Request`].
///
/// # Format
///
/// Success:
/// ```json
/// { "id": "uuid", "type": "success", "result": "hello" }
/// ```
///
/// Fault:
/// ```json
/// {
///   "id": "uuid",
///   "type": "fault",
///   "fault": { "code": "ActionNotSupported", "reason": "...", "detail": "nope" }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
    /// Matches the request `id`.
    pub id: RequestId,

    /// Response type.
    #[serde(rename = "type")]
    pub response_type: ResponseType,

    /// Result data (if success).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Fault (if fault).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fault: Option<Fault>,
}

impl Response {
    /// Creates a success response.
    #[inline]
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            id,
            response_type: ResponseType::Success,
            result: Some(result),
            fault: None,
        }
    }

    /// Creates a fault response.
    #[inline]
    #[must_use]
    pub fn fault(id: RequestId, fault: Fault) -> Self {
        Self {
            id,
            response_type: ResponseType::Fault,
            result: None,
            fault: Some(fault),
        }
    }

    /// Returns `true` if this is a success response.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.response_type == ResponseType::Success
    }

    /// Extracts the result value.
    ///
    /// # Errors
    ///
    /// - [`Error::ActionNotSupported`] for an `ActionNotSupported` fault
    /// - [`Error::ServiceFault`] for any other fault
    pub fn into_result(self) -> Result<Value> {
        match self.response_type {
            ResponseType::Success => Ok(self.result.unwrap_or(Value::Null)),
            ResponseType::Fault => {
                let fault = self
                    .fault
                    .unwrap_or_else(|| Fault::new(INTERNAL_SERVICE_FAULT, "fault without body", None));

                if fault.code == ACTION_NOT_SUPPORTED {
                    return Err(Error::action_not_supported(
                        fault.detail.unwrap_or(fault.reason),
                    ));
                }

                Err(Error::service_fault(fault.code, fault.reason, fault.detail))
            }
        }
    }
}

// ============================================================================
// ResponseType
// ============================================================================

/// Response type discriminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseType {
    /// Successful response.
    Success,
    /// Fault response.
    Fault,
}

// ============================================================================
// Tests
// ============================================================================
