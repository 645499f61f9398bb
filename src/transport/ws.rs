//! WebSocket client transport.
//!
//! Opens a WebSocket to the service endpoint, applying the channel's HTTP
//! handler knobs to the upgrade request, then hands the socket to a
//! [`Connection`] event loop.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request as HandshakeRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::{
    ACCEPT_ENCODING, AUTHORIZATION, COOKIE, SET_COOKIE,
};
use tracing::{debug, info};
use url::Url;

use crate::error::{Error, Result};
use crate::http::{HttpClientHandler, MessageHandler};
use crate::protocol::{Request, Response};

use super::connection::Connection;
use super::{CloseHandler, Transport};

// ============================================================================
// WsTransport
// ============================================================================

/// WebSocket client transport for one logical channel.
pub struct WsTransport {
    /// Service endpoint (`ws://` or `wss://`).
    endpoint: Url,
    /// HTTP knobs applied to the upgrade request.
    handler: MessageHandler,
    /// Live connection once opened.
    connection: Mutex<Option<Connection>>,
    /// Notified when the service drops the connection.
    close_handler: Mutex<Option<CloseHandler>>,
    /// Set by `abort`; later opens are refused.
    aborted: AtomicBool,
    /// Set by `close`; later opens are refused.
    closed: AtomicBool,
}

impl WsTransport {
    /// Creates an unopened transport.
    #[must_use]
    pub fn new(endpoint: Url, handler: MessageHandler) -> Self {
        Self {
            endpoint,
            handler,
            connection: Mutex::new(None),
            close_handler: Mutex::new(None),
            aborted: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        }
    }

    /// Returns the endpoint.
    #[inline]
    #[must_use]
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Returns `true` while a connection is held.
    #[inline]
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connection
            .lock()
            .as_ref()
            .is_some_and(|connection| !connection.is_closed())
    }

    /// Fails once the transport was aborted or closed.
    fn check_usable(&self) -> Result<()> {
        if self.aborted.load(Ordering::SeqCst) {
            return Err(Error::Aborted);
        }
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::ChannelClosed);
        }
        Ok(())
    }

    /// Builds the upgrade request with the handler's headers.
    fn handshake_request(&self) -> Result<HandshakeRequest> {
        let mut request = self.endpoint.as_str().into_client_request()?;
        let host = self.endpoint.host_str().unwrap_or_default();
        let headers = request.headers_mut();

        if let Some(encodings) = self.handler.automatic_decompression().accept_encoding() {
            headers.insert(ACCEPT_ENCODING, header_value(&encodings)?);
        }

        if let Some(cookies) = self.handler.cookie_store().cookie_header(host) {
            headers.insert(COOKIE, header_value(&cookies)?);
        }

        if self.handler.pre_authenticate()
            && let Some(credentials) = self.handler.credentials()
        {
            headers.insert(AUTHORIZATION, header_value(&credentials.basic_authorization())?);
        }

        Ok(request)
    }
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| Error::config(format!("Invalid header value {value:?}: {e}")))
}

impl fmt::Debug for WsTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WsTransport")
            .field("endpoint", &self.endpoint.as_str())
            .field("aborted", &self.aborted.load(Ordering::SeqCst))
            .field("closed", &self.closed.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// WsTransport - Transport
// ============================================================================

#[async_trait]
impl Transport for WsTransport {
    async fn open(&self, open_timeout: Duration) -> Result<()> {
        self.check_usable()?;

        let request = self.handshake_request()?;
        let timeout_ms = open_timeout.as_millis() as u64;

        debug!(endpoint = %self.endpoint, timeout_ms, "Connecting");

        let (ws_stream, response) = timeout(open_timeout, connect_async(request))
            .await
            .map_err(|_| Error::connection_timeout(timeout_ms))??;

        let host = self.endpoint.host_str().unwrap_or_default();
        for value in response.headers().get_all(SET_COOKIE) {
            if let Ok(value) = value.to_str() {
                self.handler.cookie_store().store_set_cookie(host, value);
            }
        }

        let on_close = self.close_handler.lock().clone();
        let connection = Connection::new(ws_stream, on_close);

        let mut slot = self.connection.lock();
        if let Err(e) = self.check_usable() {
            connection.shutdown();
            return Err(e);
        }
        if let Some(previous) = slot.replace(connection) {
            previous.shutdown();
        }

        info!(endpoint = %self.endpoint, "Transport opened");
        Ok(())
    }

    async fn request(&self, request: Request, request_timeout: Duration) -> Result<Response> {
        let connection = self
            .connection
            .lock()
            .clone()
            .ok_or(Error::ConnectionClosed)?;

        connection.send_with_timeout(request, request_timeout).await
    }

    fn abort(&self) {
        self.aborted.store(true, Ordering::SeqCst);

        if let Some(connection) = self.connection.lock().take() {
            connection.shutdown();
            debug!(endpoint = %self.endpoint, "Transport aborted");
        }
    }

    async fn close(&self) -> Result<()> {
        self.closed.store(true, Ordering::SeqCst);

        if let Some(connection) = self.connection.lock().take() {
            connection.shutdown();
            debug!(endpoint = %self.endpoint, "Transport closed");
        }
        Ok(())
    }

    fn set_close_handler(&self, handler: CloseHandler) {
        *self.close_handler.lock() = Some(handler);
    }
}

// ============================================================================
// Tests
// ============================================================================
