//! Certificate store backends.
//!
//! [`FileCertificateStore`] keeps one JSON file per store under a root
//! directory:
//!
//! ```text
//! <root>/
//! ├── current-user/
//! │   ├── my.json
//! │   └── root.json
//! └── local-machine/
//!     ├── my.json
//!     └── root.json
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rustc_hash::FxHashSet;
use tracing::{debug, info};

use crate::error::{Error, Result};

use super::certificate::{Certificate, StoreId, StoreLocation, normalize_thumbprint};

// ============================================================================
// CertificateStore
// ============================================================================

/// Lookup and installation of certificates.
///
/// Lookups only return currently valid certificates.
pub trait CertificateStore: Send + Sync {
    /// Finds a certificate by thumbprint.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_thumbprint(&self, store: StoreId, thumbprint: &str) -> Result<Option<Certificate>>;

    /// Finds a certificate whose issuer, and subject if given, contain the
    /// given names (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_issuer_and_subject(
        &self,
        store: StoreId,
        issuer: &str,
        subject: Option<&str>,
    ) -> Result<Option<Certificate>>;

    /// Finds a certificate by friendly name.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn find_by_friendly_name(&self, store: StoreId, name: &str) -> Result<Option<Certificate>>;

    /// Adds `certificate` unless one with the same thumbprint is present.
    ///
    /// Returns the stored certificate either way.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CertificateStore`] if the store cannot be written.
    fn add_if_absent(&self, store: StoreId, certificate: Certificate) -> Result<Certificate>;

    /// Checks whether `store` can be opened for writing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CertificateStore`] if it cannot.
    fn check_writable(&self, store: StoreId) -> Result<()>;
}

// ============================================================================
// FileCertificateStore
// ============================================================================

/// JSON-file certificate store.
#[derive(Debug)]
pub struct FileCertificateStore {
    /// Root directory.
    root: PathBuf,
    /// Locations refused for writing.
    read_only: FxHashSet<StoreLocation>,
    /// Serializes read-modify-write cycles.
    write_lock: Mutex<()>,
}

impl FileCertificateStore {
    /// Creates a store rooted at `root`. Nothing is created until the first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            read_only: FxHashSet::default(),
            write_lock: Mutex::new(()),
        }
    }

    /// Creates a store under the user's local data directory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the platform has no such directory.
    pub fn user_default() -> Result<Self> {
        let base = dirs::data_local_dir()
            .ok_or_else(|| Error::config("No local data directory on this platform"))?;
        Ok(Self::new(base.join("implicit-open").join("certificates")))
    }

    /// Refuses writes to `location`, as an unprivileged user would see.
    #[inline]
    #[must_use]
    pub fn with_read_only(mut self, location: StoreLocation) -> Self {
        self.read_only.insert(location);
        self
    }

    /// Returns the root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the file backing `store`.
    #[must_use]
    pub fn store_path(&self, store: StoreId) -> PathBuf {
        self.root
            .join(store.location.as_str())
            .join(format!("{}.json", store.name.as_str()))
    }

    /// Loads every certificate in `store`. A missing file is an empty store.
    fn load(&self, store: StoreId) -> Result<Vec<Certificate>> {
        let path = self.store_path(store);
        match fs::read_to_string(&path) {
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, store: StoreId, certificates: &[Certificate]) -> Result<()> {
        let path = self.store_path(store);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| write_error(store, &e))?;
        }

        let content = serde_json::to_string_pretty(certificates)?;
        fs::write(&path, content).map_err(|e| write_error(store, &e))
    }

    fn find(
        &self,
        store: StoreId,
        predicate: impl Fn(&Certificate) -> bool,
    ) -> Result<Option<Certificate>> {
        Ok(self
            .load(store)?
            .into_iter()
            .find(|certificate| certificate.is_valid() && predicate(certificate)))
    }
}

fn write_error(store: StoreId, source: &std::io::Error) -> Error {
    if source.kind() == ErrorKind::PermissionDenied {
        Error::certificate_store(format!(
            "Cannot open '{store}' for writing: {source}. \
             Try again with elevated permissions."
        ))
    } else {
        Error::certificate_store(format!("Cannot write '{store}': {source}"))
    }
}

fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

// ============================================================================
// FileCertificateStore - CertificateStore
// ============================================================================

impl CertificateStore for FileCertificateStore {
    fn find_by_thumbprint(&self, store: StoreId, thumbprint: &str) -> Result<Option<Certificate>> {
        let thumbprint = normalize_thumbprint(thumbprint);
        self.find(store, |certificate| certificate.thumbprint == thumbprint)
    }

    fn find_by_issuer_and_subject(
        &self,
        store: StoreId,
        issuer: &str,
        subject: Option<&str>,
    ) -> Result<Option<Certificate>> {
        self.find(store, |certificate| {
            contains_ignore_case(&certificate.issuer, issuer)
                && subject.is_none_or(|subject| contains_ignore_case(&certificate.subject, subject))
        })
    }

    fn find_by_friendly_name(&self, store: StoreId, name: &str) -> Result<Option<Certificate>> {
        self.find(store, |certificate| {
            certificate
                .friendly_name
                .as_deref()
                .is_some_and(|friendly| friendly.eq_ignore_ascii_case(name))
        })
    }

    fn add_if_absent(&self, store: StoreId, certificate: Certificate) -> Result<Certificate> {
        let _guard = self.write_lock.lock();

        let mut certificates = self.load(store)?;
        if let Some(existing) = certificates
            .iter()
            .find(|existing| existing.is_valid() && existing.thumbprint == certificate.thumbprint)
        {
            debug!(%store, thumbprint = %certificate.thumbprint, "Certificate already installed");
            return Ok(existing.clone());
        }

        self.check_writable(store)?;

        certificates.push(certificate.clone());
        self.save(store, &certificates)?;

        info!(%store, thumbprint = %certificate.thumbprint, "Certificate installed");
        Ok(certificate)
    }

    fn check_writable(&self, store: StoreId) -> Result<()> {
        if self.read_only.contains(&store.location) {
            return Err(Error::certificate_store(format!(
                "Cannot open '{store}' for writing. \
                 Try again with elevated permissions."
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
