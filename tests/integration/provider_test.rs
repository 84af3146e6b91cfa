//! Integration tests for the connection provider lifecycle.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;

use peerprep_auth::{LoginRecord, SessionStore};
use peerprep_core::config::TransportKind;
use peerprep_core::types::Role;
use peerprep_realtime::transport::Credentials;
use peerprep_realtime::transport::mock::{MockBehavior, MockTransport};
use peerprep_realtime::{ConnectionProvider, ConnectionStatus, RealtimeEvent};

#[tokio::test(start_paused = true)]
async fn test_mount_unmount_cycles_open_and_close_once() {
    for _ in 0..3 {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider = ConnectionProvider::mount(
            &helpers::test_config(5),
            Credentials::default(),
            helpers::transports(&[&ws]),
        );
        let mut events = provider.handle().subscribe();
        helpers::wait_for(&mut events, helpers::is_connected).await;

        provider.unmount().await;
        assert_eq!(ws.opens(), 1);
        assert_eq!(ws.closes(), 1);

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(ws.attempts(), 1, "no open may happen after unmount");
    }
}

#[tokio::test(start_paused = true)]
async fn test_unmount_while_retrying_stops_attempts() {
    let ws = Arc::new(MockTransport::failing(TransportKind::Websocket));
    let provider = ConnectionProvider::mount(
        &helpers::test_config(10),
        Credentials::default(),
        helpers::transports(&[&ws]),
    );
    let handle = provider.handle();
    let mut events = handle.subscribe();

    helpers::wait_for(&mut events, |e| {
        matches!(e, RealtimeEvent::Reconnecting { attempt: 2 })
    })
    .await;
    provider.unmount().await;

    let attempts = ws.attempts();
    tokio::time::sleep(Duration::from_secs(120)).await;
    assert_eq!(ws.attempts(), attempts);
    assert_eq!(ws.opens(), 0);
    assert_eq!(ws.closes(), 0);
    assert_eq!(handle.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_exhausted_reconnects_leave_handle_disconnected() {
    let ws = Arc::new(MockTransport::failing(TransportKind::Websocket));
    let polling = Arc::new(MockTransport::failing(TransportKind::Polling));
    let provider = ConnectionProvider::mount(
        &helpers::test_config(2),
        Credentials::default(),
        helpers::transports(&[&ws, &polling]),
    );
    let handle = provider.handle();
    let mut events = handle.subscribe();

    let failed = helpers::wait_for(&mut events, |e| {
        matches!(e, RealtimeEvent::ReconnectFailed { .. })
    })
    .await;
    assert_eq!(failed, RealtimeEvent::ReconnectFailed { attempts: 2 });
    assert_eq!(handle.status(), ConnectionStatus::Disconnected);
    assert_eq!(ws.attempts(), 3);
    assert_eq!(polling.attempts(), 3);

    tokio::time::sleep(Duration::from_secs(600)).await;
    assert_eq!(ws.attempts(), 3);
    assert_eq!(polling.attempts(), 3);
    assert_eq!(handle.status(), ConnectionStatus::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_session_cookie_reaches_transport() {
    let store = SessionStore::in_memory();
    store
        .record_login(
            &LoginRecord::new(Role::Student, "Ada", "ada@example.edu")
                .with_cookie("connect.sid=s%3Aabc"),
        )
        .unwrap();

    let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
    let provider = ConnectionProvider::mount(
        &helpers::test_config(5),
        Credentials {
            cookie: store.session_cookie(),
        },
        helpers::transports(&[&ws]),
    );
    let mut events = provider.handle().subscribe();
    helpers::wait_for(&mut events, helpers::is_connected).await;

    assert_eq!(ws.cookies(), vec![Some("connect.sid=s%3Aabc".to_string())]);
    provider.unmount().await;
}

#[tokio::test(start_paused = true)]
async fn test_consumers_share_one_handle() {
    let ws = Arc::new(
        MockTransport::new(TransportKind::Websocket)
            .with_script([MockBehavior::Fail, MockBehavior::Accept]),
    );
    let provider = ConnectionProvider::mount(
        &helpers::test_config(5),
        Credentials::default(),
        helpers::transports(&[&ws]),
    );

    let first = provider.handle();
    let second = provider.handle();
    assert!(Arc::ptr_eq(&first, &second));

    let mut watcher = second.watch_status();
    let mut events = first.subscribe();
    helpers::wait_for(&mut events, helpers::is_connected).await;

    assert!(watcher.borrow_and_update().status == ConnectionStatus::Connected);
    assert_eq!(first.id(), second.id());

    second.emit("ready", json!({"view": "dashboard"})).unwrap();
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(first.metrics().snapshot().messages_sent, 1);

    provider.unmount().await;
    assert_eq!(ws.opens(), 1);
    assert_eq!(ws.closes(), 1);
}
