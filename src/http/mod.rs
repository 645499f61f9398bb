//! HTTP client configuration surface.
//!
//! The WebSocket transport opens with an HTTP upgrade request. The knobs in
//! this module are applied to that request as-is; nothing here implements
//! HTTP itself.
//!
//! | Knob | Effect on the handshake |
//! |------|-------------------------|
//! | automatic decompression | `Accept-Encoding` header |
//! | pre-authenticate | `Authorization` header sent up front |
//! | cookie store | `Cookie` header, `Set-Cookie` captured |

// ============================================================================
// Submodules
// ============================================================================

/// Shared cookie store.
pub mod cookies;

/// Delegating handler.
pub mod handler;

/// Decompression and credentials.
pub mod settings;

// ============================================================================
// Re-exports
// ============================================================================

pub use cookies::CookieStore;
pub use handler::{ClientHandler, HttpClientHandler, MessageHandler};
pub use settings::{Credentials, DecompressionMethods};
