//! Echo service operations.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tracing::trace;

use crate::protocol::{ACTION_NOT_SUPPORTED, Fault, INTERNAL_SERVICE_FAULT, Operation, Request, Response};

// ============================================================================
// Constants
// ============================================================================

/// Reason sent with faults raised by unhandled service errors.
const INTERNAL_FAULT_REASON: &str =
    "The server was unable to process the request due to an internal error.";

// ============================================================================
// Dispatch
// ============================================================================

/// Runs one request against the echo service and builds its response.
pub(crate) async fn dispatch(request: Request) -> Response {
    let id = request.id;

    let Some(operation) = request.operation() else {
        trace!(request_id = %id, action = %request.action, "Unknown action");
        return Response::fault(
            id,
            Fault::new(
                ACTION_NOT_SUPPORTED,
                format!(
                    "The message with action '{}' cannot be processed at the receiver",
                    request.action
                ),
                Some(request.action),
            ),
        );
    };

    match operation {
        Operation::Echo { message } => Response::success(id, Value::String(message)),
        Operation::EchoWithTimeout { message, delay_ms } => {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
            Response::success(id, Value::String(message))
        }
        Operation::ThrowFault {
            code,
            reason,
            detail,
        } => Response::fault(id, Fault::new(code, reason, detail)),
        Operation::ThrowUnexpected { message } => Response::fault(
            id,
            Fault::new(INTERNAL_SERVICE_FAULT, INTERNAL_FAULT_REASON, Some(message)),
        ),
    }
}

// ============================================================================
// Tests
// ============================================================================
