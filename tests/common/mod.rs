//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::time::Duration;

use async_trait::async_trait;
use implicit_open::http::MessageHandler;
use implicit_open::protocol::{Request, Response};
use implicit_open::transport::CloseHandler;
use implicit_open::{Result, ServiceHost, Transport, WsTransport};
use tokio::sync::watch;
use tracing_subscriber::EnvFilter;
use url::Url;

/// Installs a test subscriber once; honors `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Starts an echo host on `/echo`.
pub async fn start_host() -> anyhow::Result<ServiceHost> {
    init_tracing();
    Ok(ServiceHost::builder().address("echo").start().await?)
}

/// Creates an unopened WebSocket transport to `host`.
pub fn ws_transport(host: &ServiceHost) -> anyhow::Result<WsTransport> {
    Ok(WsTransport::new(
        Url::parse(&host.endpoint())?,
        MessageHandler::default(),
    ))
}

/// Holds the physical open until `release_at` operations have been issued.
///
/// The count is published through `issued`; dropping the sender releases
/// the open as well.
pub struct StallingTransport {
    inner: WsTransport,
    issued: watch::Receiver<usize>,
    release_at: usize,
}

impl StallingTransport {
    pub fn new(inner: WsTransport, issued: watch::Receiver<usize>, release_at: usize) -> Self {
        Self {
            inner,
            issued,
            release_at,
        }
    }
}

#[async_trait]
impl Transport for StallingTransport {
    async fn open(&self, timeout: Duration) -> Result<()> {
        let mut issued = self.issued.clone();
        while *issued.borrow_and_update() < self.release_at {
            if issued.changed().await.is_err() {
                break;
            }
        }
        self.inner.open(timeout).await
    }

    async fn request(&self, request: Request, timeout: Duration) -> Result<Response> {
        self.inner.request(request, timeout).await
    }

    fn abort(&self) {
        self.inner.abort();
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }

    fn set_close_handler(&self, handler: CloseHandler) {
        self.inner.set_close_handler(handler);
    }
}
