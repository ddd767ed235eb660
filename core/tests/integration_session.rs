// Integration tests for the peripheral session lifecycle
//
// Exercises lazy start, idempotent stop, configuration rules and failure
// recovery through the public API with the loopback provider.

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use vitalble_core::{
    ChunkedTransport, LoopbackPeripheral, NativeStatus, PeripheralCall, PeripheralSession,
    ProviderKind, Provider, SessionError, SessionState, TransportConfig,
    DEFAULT_CHARACTERISTIC_UUID, DEFAULT_SERVICE_UUID,
};

fn session_over(peripheral: Arc<LoopbackPeripheral>) -> PeripheralSession {
    let transport = ChunkedTransport::new(TransportConfig {
        chunk_size: 200,
        pacing: Duration::ZERO,
    })
    .expect("Valid config");
    PeripheralSession::with_transport(peripheral, transport)
}

#[tokio::test]
async fn test_first_send_starts_with_configured_ids() -> Result<()> {
    vitalble_core::init_logging();

    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    session.configure(Some(" svc "), Some(" char ")).await?;
    assert!(session.send_text(Some("hello")).await);

    assert_eq!(
        peripheral.calls(),
        vec![
            PeripheralCall::Start {
                service_id: "svc".to_string(),
                characteristic_id: "char".to_string(),
            },
            PeripheralCall::Notify(b"hello".to_vec()),
        ]
    );
    Ok(())
}

#[tokio::test]
async fn test_repeated_sends_start_once() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    for _ in 0..3 {
        assert!(session.send(Some(&[b'x'; 450])).await);
    }

    assert_eq!(peripheral.start_calls(), 1);
    assert_eq!(peripheral.delivered_frames().len(), 9);
    Ok(())
}

#[tokio::test]
async fn test_null_payload_has_no_side_effects() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    assert!(!session.send(None).await);
    assert!(!session.send_text(None).await);

    assert!(peripheral.calls().is_empty());
    assert_eq!(session.state().await, SessionState::NotStarted);
    Ok(())
}

#[tokio::test]
async fn test_empty_payload_fails_without_notify() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    assert!(!session.send_text(Some("")).await);

    assert_eq!(peripheral.notify_attempts(), 0);
    Ok(())
}

#[tokio::test]
async fn test_start_failure_keeps_session_usable() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new().with_start_failures(2, -1));
    let session = session_over(peripheral.clone());

    assert!(!session.send(Some(b"a")).await);
    assert!(!session.send(Some(b"b")).await);
    assert_eq!(session.state().await, SessionState::NotStarted);

    assert!(session.send(Some(b"c")).await);
    assert_eq!(session.state().await, SessionState::Started);

    assert_eq!(peripheral.start_calls(), 3);
    assert_eq!(peripheral.received_payload(), b"c");
    Ok(())
}

#[tokio::test]
async fn test_chunk_failure_does_not_poison_session() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new().with_notify_failure_at(2, -1));
    let session = session_over(peripheral.clone());

    assert!(!session.send(Some(&[b'x'; 450])).await);
    assert_eq!(peripheral.notify_attempts(), 2);

    assert!(session.send(Some(b"retry")).await);
    assert_eq!(session.state().await, SessionState::Started);
    Ok(())
}

#[tokio::test]
async fn test_configure_after_start_is_rejected() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral);

    session.configure(Some("svc"), Some("char")).await?;
    assert!(session.send(Some(b"x")).await);

    let err = session
        .configure(Some("other"), None)
        .await
        .expect_err("Configure must be rejected while started");
    assert!(matches!(err, SessionError::InvalidStateTransition(_)));

    let config = session.configuration().await;
    assert_eq!(config.service_id, "svc");
    assert_eq!(config.characteristic_id, "char");
    assert!(config.started);
    Ok(())
}

#[tokio::test]
async fn test_stop_many_times() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    assert!(session.send(Some(b"x")).await);
    for _ in 0..4 {
        session.stop().await;
    }

    assert_eq!(peripheral.stop_calls(), 1);
    assert!(!peripheral.is_serving());
    assert!(!session.configuration().await.started);

    // restart on next send
    assert!(session.send(Some(b"y")).await);
    assert_eq!(peripheral.start_calls(), 2);
    Ok(())
}

#[tokio::test]
async fn test_reset_returns_to_defaults() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let session = session_over(peripheral.clone());

    session.configure(Some("svc"), Some("char")).await?;
    assert!(session.send(Some(b"x")).await);
    session.reset().await;

    let config = session.configuration().await;
    assert_eq!(config.service_id, DEFAULT_SERVICE_UUID);
    assert_eq!(config.characteristic_id, DEFAULT_CHARACTERISTIC_UUID);
    assert!(!config.started);
    assert_eq!(peripheral.stop_calls(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_sends_do_not_interleave() -> Result<()> {
    let peripheral = Arc::new(LoopbackPeripheral::new());
    let transport = ChunkedTransport::new(TransportConfig {
        chunk_size: 10,
        pacing: Duration::from_millis(1),
    })?;
    let session = Arc::new(PeripheralSession::with_transport(peripheral.clone(), transport));

    let a = {
        let session = session.clone();
        async move { session.send(Some(&[b'a'; 50])).await }
    };
    let b = {
        let session = session.clone();
        async move { session.send(Some(&[b'b'; 50])).await }
    };
    let (sent_a, sent_b) = tokio::join!(a, b);
    assert!(sent_a && sent_b);

    let frames = peripheral.delivered_frames();
    assert_eq!(frames.len(), 10);
    let first = frames[0][0];
    assert!(frames[..5].iter().all(|f| f.iter().all(|&byte| byte == first)));
    assert!(frames[5..].iter().all(|f| f.iter().all(|&byte| byte != first)));
    Ok(())
}

#[tokio::test]
async fn test_dry_run_provider_failure_status() -> Result<()> {
    let provider = ProviderKind::DryRun.build(NativeStatus(-1));
    assert!(matches!(provider, Provider::DryRun(_)));

    let session = PeripheralSession::new(provider.peripheral());
    assert!(!session.send_text(Some("data")).await);
    assert_eq!(session.state().await, SessionState::NotStarted);
    Ok(())
}

#[tokio::test]
async fn test_dry_run_provider_success() -> Result<()> {
    let provider = ProviderKind::DryRun.build(NativeStatus::SUCCESS);
    let session = PeripheralSession::new(provider.peripheral());

    assert!(session.send(Some(&[0u8; 450])).await);
    if let Provider::DryRun(peripheral) = &provider {
        assert_eq!(peripheral.frames_sent(), 3);
        assert_eq!(peripheral.bytes_sent(), 450);
    }
    session.shutdown().await;
    Ok(())
}
