//! Host configuration.
//!
//! # Example
//!
//! ```no_run
//! use implicit_open::host::ServiceHost;
//!
//! # async fn example() -> implicit_open::Result<()> {
//! let host = ServiceHost::builder().address("echo").start().await?;
//! println!("listening on {}", host.endpoint());
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::certificates::{Certificate, CertificateStore, StoreId};
use crate::error::{Error, Result};

use super::binding::{Binding, ServiceCredentials};
use super::service::ServiceHost;

// ============================================================================
// Constants
// ============================================================================

/// Address path used when none is set.
const DEFAULT_ADDRESS: &str = "echo";

// ============================================================================
// HostBuilder
// ============================================================================

/// Builder for a [`ServiceHost`].
///
/// Use [`ServiceHost::builder()`] to create one.
#[derive(Default)]
pub struct HostBuilder {
    /// Address path relative to the host root.
    address: Option<String>,
    /// Binding.
    binding: Binding,
    /// Store the service certificate is resolved from.
    certificate_store: Option<(Arc<dyn CertificateStore>, StoreId)>,
    /// Service certificate friendly name.
    certificate_name: Option<String>,
    /// Service certificate thumbprint.
    certificate_thumbprint: Option<String>,
}

impl HostBuilder {
    /// Sets the address path, e.g. `"tcp-server-alt-name-cert"`.
    #[inline]
    #[must_use]
    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// Sets the binding.
    #[inline]
    #[must_use]
    pub fn binding(mut self, binding: Binding) -> Self {
        self.binding = binding;
        self
    }

    /// Sets the store the service certificate is resolved from.
    #[inline]
    #[must_use]
    pub fn certificate_store(mut self, store: Arc<dyn CertificateStore>, id: StoreId) -> Self {
        self.certificate_store = Some((store, id));
        self
    }

    /// Selects the service certificate by friendly name.
    #[inline]
    #[must_use]
    pub fn certificate_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.certificate_name = Some(name.into());
        self
    }

    /// Selects the service certificate by thumbprint.
    #[inline]
    #[must_use]
    pub fn certificate_thumbprint(mut self, thumbprint: impl Into<String>) -> Self {
        self.certificate_thumbprint = Some(thumbprint.into());
        self
    }

    /// Resolves configuration and starts the host.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the address is empty, or transport security is
    ///   requested without a certificate
    /// - [`Error::CertificateNotFound`] if the selected certificate is missing
    /// - [`Error::Io`] if binding fails
    pub async fn start(self) -> Result<ServiceHost> {
        let address = self.address.as_deref().unwrap_or(DEFAULT_ADDRESS);
        let address = address.trim_matches('/');
        if address.is_empty() {
            return Err(Error::config("Host address must not be empty"));
        }
        let path = format!("/{address}");

        let credentials = ServiceCredentials {
            service_certificate: self.resolve_certificate()?,
        };

        ServiceHost::start(path, self.binding, credentials).await
    }

    /// Looks the certificate up by friendly name first, then fetches it by
    /// thumbprint.
    fn resolve_certificate(&self) -> Result<Option<Certificate>> {
        if self.certificate_name.is_none() && self.certificate_thumbprint.is_none() {
            if self.binding.requires_certificate() {
                return Err(Error::config(
                    "Transport security requires a service certificate",
                ));
            }
            return Ok(None);
        }

        let Some((store, id)) = &self.certificate_store else {
            return Err(Error::config(
                "A certificate was selected but no certificate store was set",
            ));
        };

        let thumbprint = match &self.certificate_name {
            Some(name) => {
                store
                    .find_by_friendly_name(*id, name)?
                    .ok_or_else(|| Error::certificate_not_found(name.as_str()))?
                    .thumbprint
            }
            None => self.certificate_thumbprint.clone().unwrap_or_default(),
        };

        let certificate = store
            .find_by_thumbprint(*id, &thumbprint)?
            .ok_or_else(|| Error::certificate_not_found(thumbprint.as_str()))?;

        debug!(store = %id, thumbprint = %certificate.thumbprint, "Service certificate resolved");
        Ok(Some(certificate))
    }
}

impl fmt::Debug for HostBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBuilder")
            .field("address", &self.address)
            .field("binding", &self.binding)
            .field("certificate_name", &self.certificate_name)
            .field("certificate_thumbprint", &self.certificate_thumbprint)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    use crate::certificates::{FileCertificateStore, StoreLocation, StoreName};
    use crate::host::SecurityMode;

    const MACHINE_MY: StoreId = StoreId::new(StoreName::My, StoreLocation::LocalMachine);

    fn transport_binding() -> Binding {
        Binding::new().with_security_mode(SecurityMode::Transport)
    }

    fn store_with_service_cert(dir: &TempDir) -> Arc<dyn CertificateStore> {
        let store = FileCertificateStore::new(dir.path());
        store
            .add_if_absent(
                MACHINE_MY,
                Certificate::new("C0FFEE", "CN=localhost", "CN=Test Root CA", vec![1])
                    .with_friendly_name("Test Service Certificate"),
            )
            .unwrap();
        Arc::new(store)
    }

    #[tokio::test]
    async fn test_transport_security_without_certificate_fails() {
        let result = ServiceHost::builder()
            .binding(transport_binding())
            .start()
            .await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[tokio::test]
    async fn test_certificate_resolved_by_friendly_name() {
        let dir = TempDir::new().unwrap();
        let host = ServiceHost::builder()
            .address("tcp-server-alt-name-cert")
            .binding(transport_binding())
            .certificate_store(store_with_service_cert(&dir), MACHINE_MY)
            .certificate_friendly_name("Test Service Certificate")
            .start()
            .await
            .unwrap();

        let certificate = host.credentials().service_certificate.as_ref().unwrap();
        assert_eq!(certificate.thumbprint, "C0FFEE");
        assert!(host.endpoint().ends_with("/tcp-server-alt-name-cert"));
    }

    #[tokio::test]
    async fn test_certificate_resolved_by_thumbprint() {
        let dir = TempDir::new().unwrap();
        let host = ServiceHost::builder()
            .binding(transport_binding())
            .certificate_store(store_with_service_cert(&dir), MACHINE_MY)
            .certificate_thumbprint("c0 ff ee")
            .start()
            .await
            .unwrap();

        assert!(host.credentials().service_certificate.is_some());
    }

    #[tokio::test]
    async fn test_unknown_friendly_name_is_not_found() {
        let dir = TempDir::new().unwrap();
        let result = ServiceHost::builder()
            .certificate_store(store_with_service_cert(&dir), MACHINE_MY)
            .certificate_friendly_name("missing")
            .start()
            .await;
        assert!(matches!(result, Err(Error::CertificateNotFound { .. })));
    }

    #[tokio::test]
    async fn test_empty_address_is_rejected() {
        let result = ServiceHost::builder().address("/").start().await;
        assert!(matches!(result, Err(Error::Config { .. })));
    }
}
