//! Implicit open scenarios against a live echo host.

mod common;

use std::sync::Arc;
use std::time::Duration;

use implicit_open::channel::ChannelOptions;
use implicit_open::{ChannelFactory, Error, OpenState, ServiceChannel};
use tokio::sync::watch;
use tokio::time::{Instant, sleep, timeout};

use common::{StallingTransport, start_host, ws_transport};

const OPERATION_COUNT: usize = 5;
const SEND_TIMEOUT: Duration = Duration::from_secs(20);
const SERVER_DELAY: Duration = Duration::from_millis(100);
const TEST_MESSAGE: &str = "testMessage";

#[tokio::test]
async fn abort_during_implicit_open_releases_all_callers() -> anyhow::Result<()> {
    let host = start_host().await?;
    let (issued, issued_rx) = watch::channel(0usize);
    let transport = StallingTransport::new(ws_transport(&host)?, issued_rx, OPERATION_COUNT);
    let channel = Arc::new(ServiceChannel::with_transport(
        transport,
        ChannelOptions::new().with_send_timeout(SEND_TIMEOUT),
    ));

    let started = Instant::now();
    let mut calls = Vec::with_capacity(OPERATION_COUNT);
    for _ in 0..OPERATION_COUNT {
        issued.send_modify(|count| *count += 1);
        let channel = Arc::clone(&channel);
        calls.push(tokio::spawn(async move {
            channel.echo_with_timeout(TEST_MESSAGE, SERVER_DELAY).await
        }));
    }

    // Abort as soon as the first operation is waiting on the open.
    timeout(Duration::from_secs(5), async {
        while channel.coordinator().waiter_count() == 0 {
            tokio::task::yield_now().await;
        }
    })
    .await?;
    channel.abort();

    let mut failures = 0;
    for call in calls {
        match call.await? {
            Ok(reply) => assert_eq!(reply, TEST_MESSAGE),
            Err(e) => {
                assert!(!e.is_timeout(), "operation timed out instead of failing fast: {e}");
                assert!(e.is_aborted(), "expected an abort, got {e:?}");
                failures += 1;
            }
        }
    }

    let elapsed = started.elapsed();
    assert!(failures > 0, "expected at least one aborted operation");
    assert!(
        elapsed < Duration::from_secs(1),
        "{OPERATION_COUNT} operations took {elapsed:?}"
    );
    assert_eq!(channel.state(), OpenState::Closed);
    Ok(())
}

#[tokio::test]
async fn concurrent_first_calls_share_one_connection() -> anyhow::Result<()> {
    let host = start_host().await?;
    let factory = ChannelFactory::builder()
        .endpoint(host.endpoint())
        .send_timeout(SEND_TIMEOUT)
        .build()?;
    let channel = Arc::new(factory.create_channel());

    let calls: Vec<_> = (0..OPERATION_COUNT)
        .map(|i| {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.echo_with_timeout(format!("m{i}"), SERVER_DELAY).await })
        })
        .collect();

    for (i, call) in calls.into_iter().enumerate() {
        assert_eq!(call.await??, format!("m{i}"));
    }

    assert_eq!(channel.state(), OpenState::Opened);
    assert_eq!(channel.coordinator().open_attempts(), 1);
    assert_eq!(host.connections_accepted(), 1);
    assert_eq!(host.request_count(), OPERATION_COUNT);
    Ok(())
}

#[tokio::test]
async fn abort_during_request_reports_aborted() -> anyhow::Result<()> {
    let host = start_host().await?;
    let factory = ChannelFactory::builder()
        .endpoint(host.endpoint())
        .send_timeout(SEND_TIMEOUT)
        .build()?;
    let channel = Arc::new(factory.create_channel());
    channel.open().await?;

    let call = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move { channel.echo_with_timeout("slow", Duration::from_secs(10)).await })
    };
    sleep(Duration::from_millis(50)).await;

    let started = Instant::now();
    channel.abort();

    let err = call.await?.unwrap_err();
    assert!(err.is_aborted(), "got {err:?}");
    assert!(started.elapsed() < Duration::from_secs(1));

    // Later calls fail at once without reopening.
    assert!(channel.echo("again").await.unwrap_err().is_aborted());
    assert_eq!(channel.coordinator().open_attempts(), 1);
    Ok(())
}

#[tokio::test]
async fn host_shutdown_faults_open_channel() -> anyhow::Result<()> {
    let host = start_host().await?;
    let factory = ChannelFactory::builder()
        .endpoint(host.endpoint())
        .send_timeout(SEND_TIMEOUT)
        .build()?;
    let channel = factory.create_channel();
    assert_eq!(channel.echo("hello").await?, "hello");

    host.shutdown();

    timeout(Duration::from_secs(2), async {
        while channel.state() != OpenState::Faulted {
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await?;

    let started = Instant::now();
    let err = channel.echo("after").await.unwrap_err();
    assert!(matches!(err, Error::ConnectionClosed), "got {err:?}");
    assert!(started.elapsed() < Duration::from_millis(100));
    Ok(())
}

#[tokio::test]
async fn unreachable_endpoint_fails_every_waiter_once() -> anyhow::Result<()> {
    common::init_tracing();

    // Bind and drop a listener to get a port nobody serves.
    let port = {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        listener.local_addr()?.port()
    };
    let factory = ChannelFactory::builder()
        .endpoint(format!("ws://127.0.0.1:{port}/echo"))
        .send_timeout(Duration::from_secs(5))
        .build()?;
    let channel = Arc::new(factory.create_channel());

    let calls: Vec<_> = (0..OPERATION_COUNT)
        .map(|_| {
            let channel = Arc::clone(&channel);
            tokio::spawn(async move { channel.echo("x").await })
        })
        .collect();

    for call in calls {
        let err = call.await?.unwrap_err();
        assert!(matches!(err, Error::OpenFailed { .. }), "got {err:?}");
    }
    assert_eq!(channel.state(), OpenState::Faulted);
    assert_eq!(channel.coordinator().open_attempts(), 1);
    Ok(())
}
