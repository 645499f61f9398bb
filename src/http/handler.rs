//! Delegating HTTP message handler.
//!
//! [`MessageHandler`] is what channels are configured with. It owns an inner
//! [`HttpClientHandler`] and forwards every knob to it untouched.
//!
//! # Example
//!
//! ```
//! use implicit_open::http::{ClientHandler, DecompressionMethods, HttpClientHandler, MessageHandler};
//!
//! let mut handler = MessageHandler::new(ClientHandler::default());
//! handler.set_automatic_decompression(DecompressionMethods::GZIP);
//! handler.set_pre_authenticate(true);
//!
//! assert_eq!(handler.inner().automatic_decompression(), DecompressionMethods::GZIP);
//! assert!(handler.inner().pre_authenticate());
//! ```

// ============================================================================
// Imports
// ============================================================================

use super::cookies::CookieStore;
use super::settings::{Credentials, DecompressionMethods};

// ============================================================================
// HttpClientHandler
// ============================================================================

/// Configuration surface of the HTTP client used for the WebSocket handshake.
pub trait HttpClientHandler: Send + Sync {
    /// Encodings the client accepts.
    fn automatic_decompression(&self) -> DecompressionMethods;

    /// Sets the encodings the client accepts.
    fn set_automatic_decompression(&mut self, methods: DecompressionMethods);

    /// Whether credentials are sent with the first request.
    fn pre_authenticate(&self) -> bool;

    /// Sets whether credentials are sent with the first request.
    fn set_pre_authenticate(&mut self, enabled: bool);

    /// Cookie store used for requests.
    fn cookie_store(&self) -> &CookieStore;

    /// Replaces the cookie store.
    fn set_cookie_store(&mut self, store: CookieStore);

    /// Credentials, if any.
    fn credentials(&self) -> Option<&Credentials>;

    /// Sets or clears the credentials.
    fn set_credentials(&mut self, credentials: Option<Credentials>);
}

// ============================================================================
// ClientHandler
// ============================================================================

/// Plain settings holder; the default inner handler.
#[derive(Debug, Clone, Default)]
pub struct ClientHandler {
    automatic_decompression: DecompressionMethods,
    pre_authenticate: bool,
    cookie_store: CookieStore,
    credentials: Option<Credentials>,
}

impl HttpClientHandler for ClientHandler {
    fn automatic_decompression(&self) -> DecompressionMethods {
        self.automatic_decompression
    }

    fn set_automatic_decompression(&mut self, methods: DecompressionMethods) {
        self.automatic_decompression = methods;
    }

    fn pre_authenticate(&self) -> bool {
        self.pre_authenticate
    }

    fn set_pre_authenticate(&mut self, enabled: bool) {
        self.pre_authenticate = enabled;
    }

    fn cookie_store(&self) -> &CookieStore {
        &self.cookie_store
    }

    fn set_cookie_store(&mut self, store: CookieStore) {
        self.cookie_store = store;
    }

    fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.credentials = credentials;
    }
}

// ============================================================================
// MessageHandler
// ============================================================================

/// Delegating handler.
#[derive(Debug, Clone, Default)]
pub struct MessageHandler<H = ClientHandler> {
    inner: H,
}

impl<H: HttpClientHandler> MessageHandler<H> {
    /// Wraps an inner handler.
    #[inline]
    #[must_use]
    pub const fn new(inner: H) -> Self {
        Self { inner }
    }

    /// Returns the inner handler.
    #[inline]
    #[must_use]
    pub const fn inner(&self) -> &H {
        &self.inner
    }

    /// Consumes the wrapper and returns the inner handler.
    #[inline]
    #[must_use]
    pub fn into_inner(self) -> H {
        self.inner
    }
}

impl<H: HttpClientHandler> HttpClientHandler for MessageHandler<H> {
    fn automatic_decompression(&self) -> DecompressionMethods {
        self.inner.automatic_decompression()
    }

    fn set_automatic_decompression(&mut self, methods: DecompressionMethods) {
        self.inner.set_automatic_decompression(methods);
    }

    fn pre_authenticate(&self) -> bool {
        self.inner.pre_authenticate()
    }

    fn set_pre_authenticate(&mut self, enabled: bool) {
        self.inner.set_pre_authenticate(enabled);
    }

    fn cookie_store(&self) -> &CookieStore {
        self.inner.cookie_store()
    }

    fn set_cookie_store(&mut self, store: CookieStore) {
        self.inner.set_cookie_store(store);
    }

    fn credentials(&self) -> Option<&Credentials> {
        self.inner.credentials()
    }

    fn set_credentials(&mut self, credentials: Option<Credentials>) {
        self.inner.set_credentials(credentials);
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let handler = MessageHandler::<ClientHandler>::default();
        assert!(handler.automatic_decompression().is_none());
        assert!(!handler.pre_authenticate());
        assert!(handler.cookie_store().is_empty());
        assert!(handler.credentials().is_none());
    }

    #[test]
    fn test_setters_reach_inner_handler() {
        let mut handler = MessageHandler::new(ClientHandler::default());
        let store = CookieStore::new();

        handler.set_automatic_decompression(DecompressionMethods::ALL);
        handler.set_pre_authenticate(true);
        handler.set_cookie_store(store.clone());
        handler.set_credentials(Some(Credentials::new("u", "p")));

        let inner = handler.into_inner();
        assert_eq!(inner.automatic_decompression(), DecompressionMethods::ALL);
        assert!(inner.pre_authenticate());
        assert!(inner.cookie_store().ptr_eq(&store));
        assert_eq!(inner.credentials().map(|c| c.username.as_str()), Some("u"));
    }

    #[test]
    fn test_getters_read_inner_handler() {
        let mut inner = ClientHandler::default();
        inner.set_pre_authenticate(true);
        inner.cookie_store().add("example.com", "a", "1");

        let handler = MessageHandler::new(inner);
        assert!(handler.pre_authenticate());
        assert_eq!(handler.cookie_store().len(), 1);
    }
}
