//! Error surfacing against a live echo host.

mod common;

use std::time::Duration;

use implicit_open::protocol::{INTERNAL_SERVICE_FAULT, Operation};
use implicit_open::{ChannelFactory, Error, OpenState, ServiceChannel};
use serde_json::json;
use tokio::time::Instant;

use common::start_host;

fn channel_for(endpoint: String, send_timeout: Duration) -> anyhow::Result<ServiceChannel> {
    let factory = ChannelFactory::builder()
        .endpoint(endpoint)
        .send_timeout(send_timeout)
        .build()?;
    Ok(factory.create_channel())
}

#[tokio::test]
async fn zero_send_timeout_fails_before_calling_service() -> anyhow::Result<()> {
    let host = start_host().await?;
    let channel = channel_for(host.endpoint(), Duration::ZERO)?;

    let started = Instant::now();
    let err = channel
        .echo_with_timeout("Hello", Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "got {err:?}");
    assert!(matches!(err, Error::OpenTimeout { timeout_ms: 0 }));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(channel.coordinator().open_attempts(), 0);
    assert_eq!(host.connections_accepted(), 0);
    Ok(())
}

#[tokio::test]
async fn long_running_operation_times_out_within_send_timeout() -> anyhow::Result<()> {
    let host = start_host().await?;
    let send_timeout = Duration::from_millis(500);
    let channel = channel_for(host.endpoint(), send_timeout)?;

    let started = Instant::now();
    let err = channel
        .echo_with_timeout("Hello", Duration::from_secs(2))
        .await
        .unwrap_err();
    let elapsed = started.elapsed();

    assert!(matches!(err, Error::RequestTimeout { .. }), "got {err:?}");
    assert!(
        elapsed >= Duration::from_millis(450) && elapsed < Duration::from_millis(1500),
        "took {elapsed:?}"
    );

    // A request timeout leaves the channel usable.
    assert_eq!(channel.state(), OpenState::Opened);
    Ok(())
}

#[tokio::test]
async fn fault_carries_detail() -> anyhow::Result<()> {
    let host = start_host().await?;
    let channel = channel_for(host.endpoint(), Duration::from_secs(20))?;

    let operation = Operation::ThrowFault {
        code: "FaultDetail".to_string(),
        reason: "Test fault".to_string(),
        detail: Some("Test Fault Exception".to_string()),
    };
    let err = channel.call(&operation).await.unwrap_err();

    match err {
        Error::ServiceFault { code, detail, .. } => {
            assert_eq!(code, "FaultDetail");
            assert_eq!(detail.as_deref(), Some("Test Fault Exception"));
        }
        other => panic!("expected a service fault, got {other:?}"),
    }
    assert_eq!(channel.state(), OpenState::Opened);
    Ok(())
}

#[tokio::test]
async fn nonexistent_action_is_not_supported() -> anyhow::Result<()> {
    let host = start_host().await?;
    let channel = channel_for(host.endpoint(), Duration::from_secs(20))?;

    let err = channel
        .call_raw("notExistOnServer", json!({}))
        .await
        .unwrap_err();

    assert!(
        matches!(err, Error::ActionNotSupported { ref action } if action == "notExistOnServer"),
        "got {err:?}"
    );
    Ok(())
}

#[tokio::test]
async fn unexpected_service_error_becomes_internal_fault() -> anyhow::Result<()> {
    let host = start_host().await?;
    let channel = channel_for(host.endpoint(), Duration::from_secs(20))?;

    let message = "Throwing exception from the service on purpose.";
    let err = channel
        .call(&Operation::ThrowUnexpected {
            message: message.to_string(),
        })
        .await
        .unwrap_err();

    match err {
        Error::ServiceFault { code, detail, .. } => {
            assert_eq!(code, INTERNAL_SERVICE_FAULT);
            assert_eq!(detail.as_deref(), Some(message));
        }
        other => panic!("expected an internal fault, got {other:?}"),
    }
    Ok(())
}
