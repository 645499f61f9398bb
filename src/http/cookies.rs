//! Shared cookie store.
//!
//! A small domain-keyed jar. Clones share the same cookies, so one store
//! can be handed to several handlers.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::RwLock;
use rustc_hash::FxHashMap;
use tracing::trace;

// ============================================================================
// Types
// ============================================================================

/// Cookies of one domain, by name.
type DomainCookies = FxHashMap<String, String>;

// ============================================================================
// CookieStore
// ============================================================================

/// Domain-keyed cookie jar.
#[derive(Debug, Clone, Default)]
pub struct CookieStore {
    cookies: Arc<RwLock<FxHashMap<String, DomainCookies>>>,
}

impl CookieStore {
    /// Creates an empty store.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a cookie for `domain`.
    pub fn add(&self, domain: &str, name: impl Into<String>, value: impl Into<String>) {
        let domain = normalize_domain(domain);
        let name = name.into();
        trace!(%domain, %name, "Cookie stored");

        self.cookies
            .write()
            .entry(domain)
            .or_default()
            .insert(name, value.into());
    }

    /// Returns the value of a cookie.
    #[must_use]
    pub fn get(&self, domain: &str, name: &str) -> Option<String> {
        self.cookies
            .read()
            .get(&normalize_domain(domain))
            .and_then(|cookies| cookies.get(name))
            .cloned()
    }

    /// Stores the cookie from a `Set-Cookie` header received from `host`.
    ///
    /// Only `name=value` and the `Domain` attribute are honored.
    pub fn store_set_cookie(&self, host: &str, header: &str) {
        let mut parts = header.split(';').map(str::trim);

        let Some((name, value)) = parts.next().and_then(|pair| pair.split_once('=')) else {
            return;
        };

        let domain = parts
            .filter_map(|attr| attr.split_once('='))
            .find(|(key, _)| key.eq_ignore_ascii_case("domain"))
            .map_or(host, |(_, domain)| domain);

        self.add(domain, name.trim(), value.trim());
    }

    /// Returns the `Cookie` header value for requests to `host`.
    ///
    /// Includes cookies of `host` itself and of every parent domain.
    #[must_use]
    pub fn cookie_header(&self, host: &str) -> Option<String> {
        let host = normalize_domain(host);
        let cookies = self.cookies.read();

        let mut pairs: Vec<String> = cookies
            .iter()
            .filter(|(domain, _)| domain_matches(&host, domain))
            .flat_map(|(_, cookies)| cookies.iter().map(|(name, value)| format!("{name}={value}")))
            .collect();

        if pairs.is_empty() {
            return None;
        }

        pairs.sort();
        Some(pairs.join("; "))
    }

    /// Returns the total number of cookies.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cookies.read().values().map(FxHashMap::len).sum()
    }

    /// Returns `true` if the store holds no cookies.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` if both handles share the same jar.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.cookies, &other.cookies)
    }
}

fn normalize_domain(domain: &str) -> String {
    domain.trim().trim_start_matches('.').to_ascii_lowercase()
}

fn domain_matches(host: &str, domain: &str) -> bool {
    host == domain
        || host
            .strip_suffix(domain)
            .is_some_and(|prefix| prefix.ends_with('.'))
}

// ============================================================================
// Tests
// ============================================================================
