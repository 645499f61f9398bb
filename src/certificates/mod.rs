//! Certificate stores for test hosting.
//!
//! A file-backed stand-in for platform certificate stores: enough to
//! install root and client certificates idempotently and to resolve a
//! service certificate by friendly name or thumbprint.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `certificate` | Certificate record, store names and locations |
//! | `manager` | Root/client installation with location fallback |
//! | `store` | `CertificateStore` trait and JSON file backend |

// ============================================================================
// Submodules
// ============================================================================

/// Certificate records.
pub mod certificate;

/// Certificate installation.
pub mod manager;

/// Store backends.
pub mod store;

// ============================================================================
// Re-exports
// ============================================================================

pub use certificate::{Certificate, StoreId, StoreLocation, StoreName, normalize_thumbprint};
pub use manager::CertificateManager;
pub use store::{CertificateStore, FileCertificateStore};
