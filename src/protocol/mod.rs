//! Wire protocol message types.
//!
//! Messages are JSON text frames over a WebSocket.
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `Request` | Client → Service | Service call |
//! | `Response` | Service → Client | Result or fault |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `operation` | Known service operations |
//! | `request` | Request, Response and Fault types |

// ============================================================================
// Submodules
// ============================================================================

/// Known service operations.
pub mod operation;

/// Request and Response message types.
pub mod request;

// ============================================================================
// Re-exports
// ============================================================================

pub use operation::Operation;
pub use request::{
    ACTION_NOT_SUPPORTED, Fault, INTERNAL_SERVICE_FAULT, Request, Response, ResponseType,
};
