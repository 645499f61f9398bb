//! Certificate records and store identifiers.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

// ============================================================================
// StoreName / StoreLocation
// ============================================================================

/// Logical certificate store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreName {
    /// Trusted root authorities.
    Root,
    /// Personal certificates.
    My,
}

impl StoreName {
    /// Returns the name used on disk.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::My => "my",
        }
    }
}

/// Scope a store belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreLocation {
    /// Per-user stores.
    CurrentUser,
    /// Machine-wide stores; writes usually need elevated rights.
    LocalMachine,
}

impl StoreLocation {
    /// Returns the name used on disk.
    #[inline]
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::CurrentUser => "current-user",
            Self::LocalMachine => "local-machine",
        }
    }
}

/// A (location, name) pair addressing one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreId {
    pub name: StoreName,
    pub location: StoreLocation,
}

impl StoreId {
    /// Creates a store id.
    #[inline]
    #[must_use]
    pub const fn new(name: StoreName, location: StoreLocation) -> Self {
        Self { name, location }
    }
}

impl fmt::Display for StoreId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.location.as_str(), self.name.as_str())
    }
}

// ============================================================================
// Certificate
// ============================================================================

/// A stored certificate.
///
/// Validity bounds are Unix timestamps in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    /// Uppercase hex thumbprint.
    pub thumbprint: String,
    /// Subject distinguished name.
    pub subject: String,
    /// Issuer distinguished name.
    pub issuer: String,
    /// Display name, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// Start of validity.
    pub not_before: u64,
    /// End of validity.
    pub not_after: u64,
    /// Encoded certificate, base64 on disk.
    #[serde(serialize_with = "serialize_der", deserialize_with = "deserialize_der")]
    pub der: Vec<u8>,
}

impl Certificate {
    /// Creates a certificate valid from now on with no upper bound.
    ///
    /// The thumbprint is normalized to uppercase hex without separators.
    #[must_use]
    pub fn new(
        thumbprint: &str,
        subject: impl Into<String>,
        issuer: impl Into<String>,
        der: Vec<u8>,
    ) -> Self {
        Self {
            thumbprint: normalize_thumbprint(thumbprint),
            subject: subject.into(),
            issuer: issuer.into(),
            friendly_name: None,
            not_before: 0,
            not_after: u64::MAX,
            der,
        }
    }

    /// Sets the friendly name.
    #[inline]
    #[must_use]
    pub fn with_friendly_name(mut self, name: impl Into<String>) -> Self {
        self.friendly_name = Some(name.into());
        self
    }

    /// Sets the validity window.
    #[inline]
    #[must_use]
    pub fn with_validity(mut self, not_before: u64, not_after: u64) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    /// Returns `true` if `now` falls within the validity window.
    #[inline]
    #[must_use]
    pub const fn is_valid_at(&self, now: u64) -> bool {
        self.not_before <= now && now <= self.not_after
    }

    /// Returns `true` if the certificate is currently valid.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(unix_now())
    }

    /// Returns `true` if the thumbprint matches, ignoring case and spaces.
    #[must_use]
    pub fn matches_thumbprint(&self, thumbprint: &str) -> bool {
        self.thumbprint == normalize_thumbprint(thumbprint)
    }
}

/// Uppercases and strips separators from a thumbprint.
#[must_use]
pub fn normalize_thumbprint(thumbprint: &str) -> String {
    thumbprint
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ':')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

pub(crate) fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .unwrap_or_default()
}

fn serialize_der<S: Serializer>(der: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&Base64Standard.encode(der))
}

fn deserialize_der<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let encoded = String::deserialize(deserializer)?;
    Base64Standard
        .decode(encoded.as_bytes())
        .map_err(serde::de::Error::custom)
}

// ============================================================================
// Tests
// ============================================================================
