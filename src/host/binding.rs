//! Service binding and credentials.

// ============================================================================
// Imports
// ============================================================================

use crate::certificates::Certificate;

// ============================================================================
// SecurityMode / ClientCredentialType
// ============================================================================

/// Binding security mode.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SecurityMode {
    /// No security.
    #[default]
    None,
    /// Transport security; the host needs a service certificate.
    Transport,
}

/// Credential a client presents under transport security.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ClientCredentialType {
    /// Anonymous clients.
    #[default]
    None,
    /// HTTP basic credentials.
    Basic,
    /// Client certificate.
    Certificate,
}

// ============================================================================
// Binding
// ============================================================================

/// How a host is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Binding {
    pub security_mode: SecurityMode,
    pub client_credential: ClientCredentialType,
    pub port_sharing: bool,
}

impl Binding {
    /// Creates an unsecured binding.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the security mode.
    #[inline]
    #[must_use]
    pub fn with_security_mode(mut self, mode: SecurityMode) -> Self {
        self.security_mode = mode;
        self
    }

    /// Sets the client credential type.
    #[inline]
    #[must_use]
    pub fn with_client_credential(mut self, credential: ClientCredentialType) -> Self {
        self.client_credential = credential;
        self
    }

    /// Enables or disables port sharing.
    #[inline]
    #[must_use]
    pub fn with_port_sharing(mut self, enabled: bool) -> Self {
        self.port_sharing = enabled;
        self
    }

    /// Returns `true` if the host must present a certificate.
    #[inline]
    #[must_use]
    pub fn requires_certificate(&self) -> bool {
        self.security_mode == SecurityMode::Transport
    }
}

// ============================================================================
// ServiceCredentials
// ============================================================================

/// Credentials the host presents.
#[derive(Debug, Clone, Default)]
pub struct ServiceCredentials {
    /// Certificate resolved at build time.
    pub service_certificate: Option<Certificate>,
}

// ============================================================================
// Tests
// ============================================================================
