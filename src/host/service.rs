//! WebSocket echo service host.
//!
//! Binds `127.0.0.1:0`, accepts WebSocket upgrades on one address path and
//! runs every request on its own task so slow operations do not block the
//! connection.

// ============================================================================
// Imports
// ============================================================================

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde_json::{from_str, to_string};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{
    ErrorResponse, Request as HandshakeRequest, Response as HandshakeResponse,
};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::protocol::{Request, Response};

use super::binding::{Binding, ServiceCredentials};
use super::builder::HostBuilder;
use super::dispatch::dispatch;

// ============================================================================
// Constants
// ============================================================================

const DEFAULT_BIND_IP: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Accept poll interval; bounds how long shutdown takes to stop accepting.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

// ============================================================================
// ServiceHost
// ============================================================================

/// A running echo service.
///
/// Dropping the host shuts it down.
#[derive(Debug)]
pub struct ServiceHost {
    local_addr: SocketAddr,
    binding: Binding,
    credentials: ServiceCredentials,
    shared: Arc<HostShared>,
}

#[derive(Debug)]
struct HostShared {
    /// Address path, with leading slash.
    path: String,
    /// Stops the accept loop.
    shutdown: AtomicBool,
    /// Stops live connections.
    shutdown_tx: watch::Sender<bool>,
    connections_accepted: AtomicUsize,
    requests_handled: AtomicUsize,
}

// ============================================================================
// ServiceHost - Lifecycle
// ============================================================================

impl ServiceHost {
    /// Returns a host builder.
    #[inline]
    #[must_use]
    pub fn builder() -> HostBuilder {
        HostBuilder::default()
    }

    /// Binds the listener and starts the accept loop.
    pub(crate) async fn start(
        path: String,
        binding: Binding,
        credentials: ServiceCredentials,
    ) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::new(DEFAULT_BIND_IP, 0)).await?;
        let local_addr = listener.local_addr()?;

        let (shutdown_tx, _) = watch::channel(false);
        let shared = Arc::new(HostShared {
            path,
            shutdown: AtomicBool::new(false),
            shutdown_tx,
            connections_accepted: AtomicUsize::new(0),
            requests_handled: AtomicUsize::new(0),
        });

        let accept_shared = Arc::clone(&shared);
        tokio::spawn(async move {
            accept_shared.accept_loop(listener).await;
        });

        info!(addr = %local_addr, path = %shared.path, "Service host started");

        Ok(Self {
            local_addr,
            binding,
            credentials,
            shared,
        })
    }

    /// Stops accepting and closes live connections.
    ///
    /// Requests already running finish, but their responses are dropped.
    pub fn shutdown(&self) {
        if self.shared.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        self.shared.shutdown_tx.send_replace(true);
        info!(addr = %self.local_addr, "Service host shut down");
    }
}

impl Drop for ServiceHost {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// ============================================================================
// ServiceHost - Accessors
// ============================================================================

impl ServiceHost {
    /// Returns the bound socket address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the WebSocket endpoint clients connect to.
    #[must_use]
    pub fn endpoint(&self) -> String {
        format!("ws://{}{}", self.local_addr, self.shared.path)
    }

    /// Returns the binding.
    #[inline]
    #[must_use]
    pub fn binding(&self) -> &Binding {
        &self.binding
    }

    /// Returns the service credentials.
    #[inline]
    #[must_use]
    pub fn credentials(&self) -> &ServiceCredentials {
        &self.credentials
    }

    /// Returns the number of accepted WebSocket connections.
    #[inline]
    #[must_use]
    pub fn connections_accepted(&self) -> usize {
        self.shared.connections_accepted.load(Ordering::SeqCst)
    }

    /// Returns the number of requests answered.
    #[inline]
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.shared.requests_handled.load(Ordering::SeqCst)
    }
}

// ============================================================================
// HostShared - Accept Loop
// ============================================================================

impl HostShared {
    async fn accept_loop(self: Arc<Self>, listener: TcpListener) {
        debug!("Accept loop started");

        loop {
            if self.shutdown.load(Ordering::SeqCst) {
                debug!("Accept loop shutting down");
                break;
            }

            match timeout(ACCEPT_POLL_INTERVAL, listener.accept()).await {
                Ok(Ok((stream, addr))) => {
                    let shared = Arc::clone(&self);
                    tokio::spawn(async move {
                        if let Err(e) = shared.handle_connection(stream, addr).await {
                            warn!(error = %e, %addr, "Connection handling failed");
                        }
                    });
                }
                Ok(Err(e)) => {
                    error!(error = %e, "Accept failed");
                }
                Err(_) => continue,
            }
        }
    }

    async fn handle_connection(self: Arc<Self>, stream: TcpStream, addr: SocketAddr) -> Result<()> {
        let path = self.path.as_str();
        let ws_stream = accept_hdr_async(
            stream,
            |request: &HandshakeRequest, response: HandshakeResponse| {
                if request.uri().path() == path {
                    return Ok(response);
                }
                let mut rejection: ErrorResponse =
                    ErrorResponse::new(Some(format!("No service at {}", request.uri().path())));
                *rejection.status_mut() = StatusCode::NOT_FOUND;
                Err(rejection)
            },
        )
        .await?;

        self.connections_accepted.fetch_add(1, Ordering::SeqCst);
        debug!(%addr, "Client connected");

        let (mut ws_write, mut ws_read) = ws_stream.split();
        let (response_tx, mut response_rx) = mpsc::unbounded_channel::<Response>();
        let mut shutdown_rx = self.shutdown_tx.subscribe();
        if *shutdown_rx.borrow_and_update() {
            let _ = ws_write.send(Message::Close(None)).await;
            return Ok(());
        }

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            self.spawn_request(&text, &response_tx);
                        }
                        Some(Ok(Message::Close(_))) | None => {
                            debug!(%addr, "Client disconnected");
                            break;
                        }
                        Some(Err(e)) => {
                            debug!(%addr, error = %e, "Client connection error");
                            break;
                        }
                        Some(Ok(_)) => {}
                    }
                }

                Some(response) = response_rx.recv() => {
                    let json = to_string(&response)?;
                    ws_write.send(Message::Text(json.into())).await?;
                }

                _ = shutdown_rx.changed() => {
                    let _ = ws_write.send(Message::Close(None)).await;
                    debug!(%addr, "Connection closed by shutdown");
                    break;
                }
            }
        }

        Ok(())
    }

    /// Runs one request on its own task.
    fn spawn_request(self: &Arc<Self>, text: &str, response_tx: &mpsc::UnboundedSender<Response>) {
        let request: Request = match from_str(text) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Malformed request");
                return;
            }
        };

        let shared = Arc::clone(self);
        let response_tx = response_tx.clone();
        tokio::spawn(async move {
            let response = dispatch(request).await;
            shared.requests_handled.fetch_add(1, Ordering::SeqCst);
            let _ = response_tx.send(response);
        });
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio_tungstenite::connect_async;

    use crate::error::Error;

    #[tokio::test]
    async fn test_endpoint_includes_path() {
        let host = ServiceHost::builder().address("echo").start().await.unwrap();
        let endpoint = host.endpoint();

        assert!(endpoint.starts_with("ws://127.0.0.1:"));
        assert!(endpoint.ends_with("/echo"));
    }

    #[tokio::test]
    async fn test_serves_requests() {
        let host = ServiceHost::builder().address("echo").start().await.unwrap();
        let (mut ws, _) = connect_async(host.endpoint()).await.unwrap();

        let request = Request::raw("echo", json!({ "message": "ping" }));
        let id = request.id;
        ws.send(Message::Text(to_string(&request).unwrap().into()))
            .await
            .unwrap();

        let Some(Ok(Message::Text(text))) = ws.next().await else {
            panic!("expected a text frame");
        };
        let response: Response = from_str(&text).unwrap();
        assert_eq!(response.id, id);
        assert_eq!(response.into_result().unwrap(), json!("ping"));
        assert_eq!(host.connections_accepted(), 1);
        assert_eq!(host.request_count(), 1);
    }

    #[tokio::test]
    async fn test_wrong_path_is_rejected() {
        let host = ServiceHost::builder().address("echo").start().await.unwrap();
        let wrong = format!("ws://{}/other", host.local_addr());

        let err = connect_async(wrong).await.unwrap_err();
        assert!(matches!(Error::from(err), Error::WebSocket(_)));
        assert_eq!(host.connections_accepted(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_closes_live_connections() {
        let host = ServiceHost::builder().address("echo").start().await.unwrap();
        let (mut ws, _) = connect_async(host.endpoint()).await.unwrap();

        host.shutdown();

        let closed = timeout(Duration::from_secs(2), async {
            loop {
                match ws.next().await {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => {}
                }
            }
        })
        .await;
        assert!(closed.is_ok());
    }
}
