//! HTTP client knobs: decompression and credentials.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as Base64Standard;
use serde::{Deserialize, Serialize};

// ============================================================================
// DecompressionMethods
// ============================================================================

/// Content encodings the client accepts and decompresses.
///
/// # Example
///
/// ```
/// use implicit_open::http::DecompressionMethods;
///
/// let methods = DecompressionMethods::GZIP.union(DecompressionMethods::BROTLI);
/// assert_eq!(methods.accept_encoding().as_deref(), Some("gzip, br"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DecompressionMethods {
    /// Accept `gzip`.
    pub gzip: bool,
    /// Accept `deflate`.
    pub deflate: bool,
    /// Accept `br`.
    pub brotli: bool,
}

impl DecompressionMethods {
    /// No decompression.
    pub const NONE: Self = Self {
        gzip: false,
        deflate: false,
        brotli: false,
    };

    /// `gzip` only.
    pub const GZIP: Self = Self {
        gzip: true,
        deflate: false,
        brotli: false,
    };

    /// `deflate` only.
    pub const DEFLATE: Self = Self {
        gzip: false,
        deflate: true,
        brotli: false,
    };

    /// `br` only.
    pub const BROTLI: Self = Self {
        gzip: false,
        deflate: false,
        brotli: true,
    };

    /// Every supported encoding.
    pub const ALL: Self = Self {
        gzip: true,
        deflate: true,
        brotli: true,
    };

    /// Returns the union of both sets.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self {
            gzip: self.gzip || other.gzip,
            deflate: self.deflate || other.deflate,
            brotli: self.brotli || other.brotli,
        }
    }

    /// Returns `true` if no encoding is accepted.
    #[inline]
    #[must_use]
    pub const fn is_none(&self) -> bool {
        !self.gzip && !self.deflate && !self.brotli
    }

    /// Returns the `Accept-Encoding` header value, if any.
    #[must_use]
    pub fn accept_encoding(&self) -> Option<String> {
        let encodings: Vec<&str> = [
            (self.gzip, "gzip"),
            (self.deflate, "deflate"),
            (self.brotli, "br"),
        ]
        .into_iter()
        .filter_map(|(enabled, name)| enabled.then_some(name))
        .collect();

        (!encodings.is_empty()).then(|| encodings.join(", "))
    }
}

// ============================================================================
// Credentials
// ============================================================================

/// Username and password for basic authentication.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Username.
    pub username: String,
    /// Password.
    pub password: String,
}

impl Credentials {
    /// Creates credentials.
    #[inline]
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// Returns the `Authorization` header value for basic authentication.
    #[must_use]
    pub fn basic_authorization(&self) -> String {
        let token = Base64Standard.encode(format!("{}:{}", self.username, self.password));
        format!("Basic {token}")
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
