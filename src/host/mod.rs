//! In-process echo service for exercising channels.
//!
//! The host speaks the JSON request/response protocol over WebSocket and
//! implements the echo service operations, including a server-side delay.
//! Transport security is configuration only: the service certificate is
//! resolved and exposed, but the listener serves plain `ws://`.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `binding` | Security mode, client credential type, service credentials |
//! | `builder` | `HostBuilder` and certificate resolution |
//! | `dispatch` | Echo service operations |
//! | `service` | Listener, accept loop, per-connection tasks |

// ============================================================================
// Submodules
// ============================================================================

/// Binding and credentials.
pub mod binding;

/// Host builder.
pub mod builder;

/// Service operations.
mod dispatch;

/// Running host.
pub mod service;

// ============================================================================
// Re-exports
// ============================================================================

pub use binding::{Binding, ClientCredentialType, SecurityMode, ServiceCredentials};
pub use builder::HostBuilder;
pub use service::ServiceHost;
