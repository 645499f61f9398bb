//! Channel factory.
//!
//! A [`ChannelFactory`] holds an endpoint and [`ChannelOptions`]; every
//! [`create_channel`](ChannelFactory::create_channel) yields a new logical
//! channel with its own coordinator.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//!
//! use implicit_open::channel::ChannelFactory;
//!
//! # fn example() -> implicit_open::Result<()> {
//! let factory = ChannelFactory::builder()
//!     .endpoint("ws://127.0.0.1:8080/echo")
//!     .send_timeout(Duration::from_secs(20))
//!     .build()?;
//!
//! let channel = factory.create_channel();
//! # drop(channel);
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use url::Url;

use crate::error::{Error, Result};
use crate::http::MessageHandler;
use crate::transport::WsTransport;

use super::options::ChannelOptions;
use super::service::ServiceChannel;

// ============================================================================
// ChannelFactory
// ============================================================================

/// Creates channels to one service endpoint.
#[derive(Debug, Clone)]
pub struct ChannelFactory {
    endpoint: Url,
    options: ChannelOptions,
}

impl ChannelFactory {
    /// Returns a builder.
    #[inline]
    #[must_use]
    pub fn builder() -> ChannelFactoryBuilder {
        ChannelFactoryBuilder::default()
    }

    /// Returns the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns the options applied to new channels.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &ChannelOptions {
        &self.options
    }

    /// Creates a new, unopened channel.
    ///
    /// Channels of one factory share its cookie store.
    #[must_use]
    pub fn create_channel(&self) -> ServiceChannel<WsTransport> {
        let transport = WsTransport::new(self.endpoint.clone(), self.options.http_handler().clone());
        ServiceChannel::with_transport(transport, self.options.clone())
    }
}

// ============================================================================
// ChannelFactoryBuilder
// ============================================================================

/// Builder for a [`ChannelFactory`].
#[derive(Debug, Default, Clone)]
pub struct ChannelFactoryBuilder {
    /// Endpoint address, parsed at build.
    endpoint: Option<String>,
    /// Accumulated options.
    options: ChannelOptions,
}

impl ChannelFactoryBuilder {
    /// Sets the service endpoint (`ws://` or `wss://`).
    #[inline]
    #[must_use]
    pub fn endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Sets the per-operation budget.
    #[inline]
    #[must_use]
    pub fn send_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_send_timeout(timeout);
        self
    }

    /// Sets the physical open timeout.
    #[inline]
    #[must_use]
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.options = self.options.with_open_timeout(timeout);
        self
    }

    /// Sets the handshake HTTP settings.
    #[inline]
    #[must_use]
    pub fn http_handler(mut self, handler: MessageHandler) -> Self {
        self.options = self.options.with_http_handler(handler);
        self
    }

    /// Builds the factory.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if no endpoint was set, its scheme is not
    ///   `ws`/`wss`, or the options are invalid
    /// - [`Error::Url`] if the endpoint does not parse
    pub fn build(self) -> Result<ChannelFactory> {
        let raw = self
            .endpoint
            .ok_or_else(|| Error::config("Endpoint is required"))?;
        let endpoint = Url::parse(&raw)?;

        if !matches!(endpoint.scheme(), "ws" | "wss") {
            return Err(Error::config(format!(
                "Unsupported endpoint scheme '{}', expected ws or wss",
                endpoint.scheme()
            )));
        }

        self.options.validate()?;

        Ok(ChannelFactory {
            endpoint,
            options: self.options,
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use crate::coordinator::OpenState;
    use crate::http::{CookieStore, HttpClientHandler};

    #[test]
    fn test_build_requires_endpoint() {
        let result = ChannelFactory::builder().build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_rejects_http_scheme() {
        let result = ChannelFactory::builder()
            .endpoint("http://localhost:8080/echo")
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_build_rejects_malformed_url() {
        let result = ChannelFactory::builder().endpoint("not a url").build();
        assert!(matches!(result, Err(Error::Url(_))));
    }

    #[test]
    fn test_build_rejects_zero_open_timeout() {
        let result = ChannelFactory::builder()
            .endpoint("ws://localhost:8080/echo")
            .open_timeout(Duration::ZERO)
            .build();
        assert!(matches!(result, Err(Error::Config { .. })));
    }

    #[test]
    fn test_channels_are_independent() {
        let factory = ChannelFactory::builder()
            .endpoint("ws://localhost:8080/echo")
            .send_timeout(Duration::from_secs(20))
            .build()
            .expect("factory");

        let first = factory.create_channel();
        let second = factory.create_channel();

        assert_ne!(first.id(), second.id());
        first.abort();
        assert_eq!(first.state(), OpenState::Closed);
        assert_eq!(second.state(), OpenState::Idle);
        assert_eq!(second.options().send_timeout(), Duration::from_secs(20));
    }

    #[test]
    fn test_channels_share_cookie_store() {
        let store = CookieStore::new();
        let mut handler = MessageHandler::default();
        handler.set_cookie_store(store.clone());

        let factory = ChannelFactory::builder()
            .endpoint("ws://localhost:8080/echo")
            .http_handler(handler)
            .build()
            .expect("factory");

        let channel = factory.create_channel();
        assert!(channel.options().http_handler().cookie_store().ptr_eq(&store));
    }
}
