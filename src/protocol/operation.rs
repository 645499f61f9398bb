//! Service operations.
//!
//! Operations use the `action` + `params` format on the wire:
//!
//! ```json
//! { "action": "echoWithTimeout", "params": { "message": "hi", "delayMs": 100 } }
//! ```
//!
//! | Action | Reply |
//! |--------|-------|
//! | `echo` | the message |
//! | `echoWithTimeout` | the message, after `delayMs` |
//! | `throwFault` | a fault with the given code, reason and detail |
//! | `throwUnexpected` | an `InternalServiceFault` carrying the message |
//!
//! Any other action is answered with an `ActionNotSupported` fault.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

// ============================================================================
// Operation
// ============================================================================

/// Operations understood by the echo service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "params")]
pub enum Operation {
    /// Echo the message back.
    #[serde(rename = "echo")]
    Echo {
        /// Message to echo.
        message: String,
    },

    /// Echo the message back after a server-side delay.
    #[serde(rename = "echoWithTimeout")]
    EchoWithTimeout {
        /// Message to echo.
        message: String,
        /// Server-side delay in milliseconds.
        #[serde(rename = "delayMs")]
        delay_ms: u64,
    },

    /// Reply with a declared fault.
    #[serde(rename = "throwFault")]
    ThrowFault {
        /// Fault code.
        code: String,
        /// Fault reason.
        reason: String,
        /// Optional detail payload.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        detail: Option<String>,
    },

    /// Fail inside the service with an undeclared error.
    #[serde(rename = "throwUnexpected")]
    ThrowUnexpected {
        /// Error message raised by the service.
        message: String,
    },
}

impl Operation {
    /// Returns the wire action name.
    #[inline]
    #[must_use]
    pub fn action(&self) -> &'static str {
        match self {
            Self::Echo { .. } => "echo",
            Self::EchoWithTimeout { .. } => "echoWithTimeout",
            Self::ThrowFault { .. } => "throwFault",
            Self::ThrowUnexpected { .. } => "throwUnexpected",
        }
    }

    /// Returns the wire params object.
    #[must_use]
    pub fn params(&self) -> Value {
        match self {
            Self::Echo { message } => json!({ "message": message }),
            Self::EchoWithTimeout { message, delay_ms } => {
                json!({ "message": message, "delayMs": delay_ms })
            }
            Self::ThrowFault {
                code,
                reason,
                detail,
            } => match detail {
                Some(detail) => json!({ "code": code, "reason": reason, "detail": detail }),
                None => json!({ "code": code, "reason": reason }),
            },
            Self::ThrowUnexpected { message } => json!({ "message": message }),
        }
    }

    /// Parses an action and its params.
    ///
    /// Returns `None` for unknown actions or mismatched params.
    #[must_use]
    pub fn parse(action: &str, params: &Value) -> Option<Self> {
        serde_json::from_value(json!({ "action": action, "params": params })).ok()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_names_match_serde_tags() {
        let operations = [
            Operation::Echo {
                message: "a".into(),
            },
            Operation::EchoWithTimeout {
                message: "a".into(),
                delay_ms: 5,
            },
            Operation::ThrowFault {
                code: "c".into(),
                reason: "r".into(),
                detail: None,
            },
            Operation::ThrowUnexpected {
                message: "m".into(),
            },
        ];

        for operation in operations {
            let value = serde_json::to_value(&operation).expect("serialize");
            assert_eq!(value["action"], operation.action());
            assert_eq!(value["params"], operation.params());
        }
    }

    #[test]
    fn test_parse_echo_with_timeout() {
        let params = json!({ "message": "hi", "delayMs": 100 });
        let operation = Operation::parse("echoWithTimeout", &params).expect("known action");
        assert_eq!(
            operation,
            Operation::EchoWithTimeout {
                message: "hi".into(),
                delay_ms: 100,
            }
        );
    }

    #[test]
    fn test_parse_unknown_action() {
        assert!(Operation::parse("nonExistentAction", &json!({})).is_none());
    }

    #[test]
    fn test_parse_bad_params() {
        assert!(Operation::parse("echo", &json!({ "text": "wrong field" })).is_none());
    }
}
