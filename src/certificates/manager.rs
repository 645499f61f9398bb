//! Root and client certificate installation.
//!
//! Root certificates go to the machine root store when it is writable and
//! to the current user's root store otherwise. The probe runs once per
//! manager. Client certificates always go to the current user's personal
//! store.

// ============================================================================
// Imports
// ============================================================================

use std::sync::OnceLock;

use tracing::{debug, info};

use crate::error::Result;

use super::certificate::{Certificate, StoreId, StoreLocation, StoreName};
use super::store::{CertificateStore, FileCertificateStore};

// ============================================================================
// Constants
// ============================================================================

/// Store for client certificates.
const CLIENT_STORE: StoreId = StoreId::new(StoreName::My, StoreLocation::CurrentUser);

// ============================================================================
// CertificateManager
// ============================================================================

/// Installs and looks up test certificates.
#[derive(Debug)]
pub struct CertificateManager<S = FileCertificateStore> {
    store: S,
    root_location: OnceLock<StoreLocation>,
}

impl<S: CertificateStore> CertificateManager<S> {
    /// Creates a manager over `store`.
    #[must_use]
    pub fn new(store: S) -> Self {
        Self {
            store,
            root_location: OnceLock::new(),
        }
    }

    /// Returns the underlying store.
    #[inline]
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the location root certificates are installed to.
    pub fn root_location(&self) -> StoreLocation {
        *self.root_location.get_or_init(|| {
            let machine_root = StoreId::new(StoreName::Root, StoreLocation::LocalMachine);
            match self.store.check_writable(machine_root) {
                Ok(()) => StoreLocation::LocalMachine,
                Err(e) => {
                    debug!(error = %e, "Machine root store not writable, using current user");
                    StoreLocation::CurrentUser
                }
            }
        })
    }

    fn root_store(&self) -> StoreId {
        StoreId::new(StoreName::Root, self.root_location())
    }
}

// ============================================================================
// CertificateManager - Installation
// ============================================================================

impl<S: CertificateStore> CertificateManager<S> {
    /// Installs a root certificate unless already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the root store cannot be read or written.
    pub fn install_root_certificate(&self, certificate: Certificate) -> Result<Certificate> {
        let store = self.root_store();
        let installed = self.store.add_if_absent(store, certificate)?;
        info!(%store, thumbprint = %installed.thumbprint, "Root certificate ready");
        Ok(installed)
    }

    /// Installs a client certificate unless already present.
    ///
    /// # Errors
    ///
    /// Returns an error if the personal store cannot be read or written.
    pub fn install_client_certificate(&self, certificate: Certificate) -> Result<Certificate> {
        let installed = self.store.add_if_absent(CLIENT_STORE, certificate)?;
        info!(store = %CLIENT_STORE, thumbprint = %installed.thumbprint, "Client certificate ready");
        Ok(installed)
    }
}

// ============================================================================
// CertificateManager - Lookup
// ============================================================================

impl<S: CertificateStore> CertificateManager<S> {
    /// Finds a root certificate by thumbprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the root store cannot be read.
    pub fn root_certificate_from_thumbprint(&self, thumbprint: &str) -> Result<Option<Certificate>> {
        self.store.find_by_thumbprint(self.root_store(), thumbprint)
    }

    /// Finds a root certificate by issuer and optional subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the root store cannot be read.
    pub fn root_certificate_from_name(
        &self,
        issuer: &str,
        subject: Option<&str>,
    ) -> Result<Option<Certificate>> {
        self.store
            .find_by_issuer_and_subject(self.root_store(), issuer, subject)
    }

    /// Finds a client certificate by thumbprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the personal store cannot be read.
    pub fn client_certificate_from_thumbprint(
        &self,
        thumbprint: &str,
    ) -> Result<Option<Certificate>> {
        self.store.find_by_thumbprint(CLIENT_STORE, thumbprint)
    }

    /// Finds a client certificate by issuer and optional subject.
    ///
    /// # Errors
    ///
    /// Returns an error if the personal store cannot be read.
    pub fn client_certificate_from_name(
        &self,
        issuer: &str,
        subject: Option<&str>,
    ) -> Result<Option<Certificate>> {
        self.store
            .find_by_issuer_and_subject(CLIENT_STORE, issuer, subject)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use tempfile::TempDir;

    fn root_ca() -> Certificate {
        Certificate::new("0A1B", "CN=Test Root CA", "CN=Test Root CA", vec![1])
    }

    #[test]
    fn test_root_goes_to_machine_store_when_writable() {
        let dir = TempDir::new().unwrap();
        let manager = CertificateManager::new(FileCertificateStore::new(dir.path()));

        manager.install_root_certificate(root_ca()).unwrap();

        assert_eq!(manager.root_location(), StoreLocation::LocalMachine);
        let machine = StoreId::new(StoreName::Root, StoreLocation::LocalMachine);
        assert!(manager.store().store_path(machine).exists());
    }

    #[test]
    fn test_root_falls_back_to_current_user() {
        let dir = TempDir::new().unwrap();
        let store =
            FileCertificateStore::new(dir.path()).with_read_only(StoreLocation::LocalMachine);
        let manager = CertificateManager::new(store);

        manager.install_root_certificate(root_ca()).unwrap();

        assert_eq!(manager.root_location(), StoreLocation::CurrentUser);
        assert!(manager.root_certificate_from_thumbprint("0a1b").unwrap().is_some());
        assert!(
            manager
                .root_certificate_from_name("test root", None)
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_client_certificates_use_personal_store() {
        let dir = TempDir::new().unwrap();
        let manager = CertificateManager::new(FileCertificateStore::new(dir.path()));
        let client = Certificate::new("FF", "CN=client", "CN=Test Root CA", vec![2]);

        manager.install_client_certificate(client).unwrap();

        assert!(manager.client_certificate_from_thumbprint("ff").unwrap().is_some());
        assert!(
            manager
                .client_certificate_from_name("Test Root", Some("client"))
                .unwrap()
                .is_some()
        );
        assert!(manager.root_certificate_from_thumbprint("ff").unwrap().is_none());
    }
}
