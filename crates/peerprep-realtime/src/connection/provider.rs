//! The connection provider: one realtime connection per mount.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use peerprep_core::config::AppConfig;

use crate::endpoint::Endpoint;
use crate::message::types::RealtimeEvent;
use crate::transport::{self, ConnectRequest, Credentials, Transport};

use super::driver::Driver;
use super::handle::{ConnectionHandle, ConnectionStatus};
use super::reconnect::ReconnectPolicy;

/// Owns the single realtime connection for the application's lifetime.
///
/// `mount` creates the handle and spawns the driver task; consumers get the
/// handle through [`ConnectionProvider::handle`]. Unmounting (explicitly or
/// by dropping the provider) cancels the driver, which closes any open
/// transport session exactly once and never opens another.
///
/// The close runs on the driver task. Only [`ConnectionProvider::unmount`]
/// waits for it; after a plain drop the close is lost if the runtime shuts
/// down before the task gets polled again.
#[derive(Debug)]
pub struct ConnectionProvider {
    handle: Arc<ConnectionHandle>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ConnectionProvider {
    /// Mounts the provider with explicit transports, in preference order.
    ///
    /// Must be called from within a tokio runtime. Never fails: an invalid
    /// endpoint or empty transport list leaves the handle in
    /// [`ConnectionStatus::Error`] with no task running.
    pub fn mount(
        config: &AppConfig,
        credentials: Credentials,
        transports: Vec<Arc<dyn Transport>>,
    ) -> Self {
        let realtime = &config.realtime;
        let (handle, outbound) =
            ConnectionHandle::new(realtime.event_buffer_size, realtime.outbound_buffer_size);
        let cancel = CancellationToken::new();

        let endpoint = match Endpoint::from_config(&config.api) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                error!(error = %e, "Realtime endpoint is invalid, not connecting");
                return Self::failed(handle, cancel, e.message);
            }
        };
        if transports.is_empty() {
            error!("No realtime transports configured, not connecting");
            return Self::failed(handle, cancel, "No realtime transports configured".to_string());
        }

        info!(
            origin = %endpoint.origin(),
            namespace = %endpoint.namespace(),
            transports = ?transports.iter().map(|t| t.kind()).collect::<Vec<_>>(),
            cookie = credentials.cookie.is_some(),
            "Mounting realtime connection"
        );

        let driver = Driver {
            handle: Arc::clone(&handle),
            request: ConnectRequest {
                endpoint,
                credentials,
            },
            transports,
            policy: ReconnectPolicy::from_config(realtime),
            connect_timeout: realtime.connect_timeout(),
            outbound,
            cancel: cancel.clone(),
        };
        let task = tokio::spawn(driver.run());

        Self {
            handle,
            cancel,
            task: Some(task),
        }
    }

    /// Mounts the provider with the network transports named in configuration.
    pub fn mount_default(config: &AppConfig, credentials: Credentials) -> Self {
        let transports = transport::from_kinds(&config.realtime.transports);
        Self::mount(config, credentials, transports)
    }

    fn failed(handle: Arc<ConnectionHandle>, cancel: CancellationToken, message: String) -> Self {
        handle.set_status(ConnectionStatus::Error);
        handle.publish(RealtimeEvent::ConnectError { message });
        Self {
            handle,
            cancel,
            task: None,
        }
    }

    /// The shared connection handle.
    pub fn handle(&self) -> Arc<ConnectionHandle> {
        Arc::clone(&self.handle)
    }

    /// Whether the driver task is still running.
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Tears the connection down and waits for the driver to finish.
    pub async fn unmount(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Realtime driver task ended abnormally");
            }
        }
        info!("Realtime connection unmounted");
    }
}

impl Drop for ConnectionProvider {
    /// Cancels the driver without waiting for the transport close.
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use serde_json::json;
    use tokio::sync::broadcast;

    use peerprep_core::config::{RealtimeConfig, TransportKind};

    use crate::message::packet::{EnginePacket, SocketPacket};
    use crate::transport::mock::{MockBehavior, MockTransport};

    use super::*;

    fn config(reconnect_attempts: u32) -> AppConfig {
        AppConfig {
            realtime: RealtimeConfig {
                reconnect_attempts,
                reconnect_delay_ms: 1000,
                connect_timeout_ms: 2000,
                ..RealtimeConfig::default()
            },
            ..AppConfig::default()
        }
    }

    fn as_transports(mocks: &[&Arc<MockTransport>]) -> Vec<Arc<dyn Transport>> {
        mocks
            .iter()
            .map(|m| Arc::clone(m) as Arc<dyn Transport>)
            .collect()
    }

    async fn next_event(events: &mut broadcast::Receiver<RealtimeEvent>) -> RealtimeEvent {
        tokio::time::timeout(Duration::from_secs(120), events.recv())
            .await
            .expect("event within timeout")
            .expect("event channel open")
    }

    async fn wait_for<F>(events: &mut broadcast::Receiver<RealtimeEvent>, mut pred: F) -> RealtimeEvent
    where
        F: FnMut(&RealtimeEvent) -> bool,
    {
        loop {
            let event = next_event(events).await;
            if pred(&event) {
                return event;
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_connects_and_reports_identity() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider = ConnectionProvider::mount(
            &config(3),
            Credentials::with_cookie("connect.sid=abc"),
            as_transports(&[&ws]),
        );
        let handle = provider.handle();
        assert_eq!(handle.status(), ConnectionStatus::Unready);
        let mut events = handle.subscribe();

        let event = wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        assert_eq!(
            event,
            RealtimeEvent::Connected {
                id: "mock-1".to_string(),
                transport: TransportKind::Websocket,
            }
        );
        assert!(handle.is_connected());
        assert_eq!(handle.id().as_deref(), Some("mock-1"));
        assert_eq!(ws.cookies(), vec![Some("connect.sid=abc".to_string())]);

        provider.unmount().await;
        assert_eq!(ws.opens(), 1);
        assert_eq!(ws.closes(), 1);
        assert_eq!(handle.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_falls_back_to_next_transport() {
        let ws = Arc::new(MockTransport::failing(TransportKind::Websocket));
        let polling = Arc::new(MockTransport::new(TransportKind::Polling));
        let provider = ConnectionProvider::mount(
            &config(3),
            Credentials::default(),
            as_transports(&[&ws, &polling]),
        );
        let mut events = provider.handle().subscribe();

        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        assert_eq!(provider.handle().transport(), Some(TransportKind::Polling));
        assert_eq!(ws.attempts(), 1);
        assert_eq!(ws.opens(), 0);

        provider.unmount().await;
        assert_eq!(polling.closes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_stay_disconnected() {
        let ws = Arc::new(MockTransport::failing(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();
        let mut events = handle.subscribe();

        let event = wait_for(&mut events, |e| {
            matches!(e, RealtimeEvent::ReconnectFailed { .. })
        })
        .await;
        assert_eq!(event, RealtimeEvent::ReconnectFailed { attempts: 3 });
        assert_eq!(handle.status(), ConnectionStatus::Disconnected);
        assert_eq!(ws.attempts(), 4);

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(ws.attempts(), 4);
        assert!(!provider.is_running());
        assert!(handle.emit("late", json!(null)).is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_waits_fixed_delay() {
        let ws = Arc::new(
            MockTransport::new(TransportKind::Websocket)
                .with_script([MockBehavior::Fail, MockBehavior::Accept]),
        );
        let start = tokio::time::Instant::now();
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let mut events = provider.handle().subscribe();

        assert!(matches!(
            next_event(&mut events).await,
            RealtimeEvent::ConnectError { .. }
        ));
        assert_eq!(
            next_event(&mut events).await,
            RealtimeEvent::Reconnecting { attempt: 1 }
        );
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        assert!(start.elapsed() >= Duration::from_secs(1));

        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_disabled_reconnect_fails_once() {
        let ws = Arc::new(MockTransport::failing(TransportKind::Websocket));
        let mut cfg = config(5);
        cfg.realtime.reconnect = false;
        let provider = ConnectionProvider::mount(&cfg, Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ws.attempts(), 1);
        assert_eq!(handle.status(), ConnectionStatus::Error);
        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_after_connect_gets_fresh_budget() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(1), Credentials::default(), as_transports(&[&ws]));
        let mut events = provider.handle().subscribe();

        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        assert!(ws.drop_link());
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Disconnected { .. })).await;
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;

        assert!(ws.drop_link());
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        assert_eq!(ws.opens(), 3);
        assert_eq!(ws.closes(), 2);

        provider.unmount().await;
        assert_eq!(ws.closes(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_server_disconnect_is_terminal() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();
        let mut events = handle.subscribe();

        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        let disconnect = SocketPacket::Disconnect {
            namespace: "/".to_string(),
        };
        ws.push(EnginePacket::Message(disconnect.encode()));

        let event = wait_for(&mut events, |e| matches!(e, RealtimeEvent::Disconnected { .. })).await;
        assert_eq!(
            event,
            RealtimeEvent::Disconnected {
                reason: "io server disconnect".to_string()
            }
        );
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ws.opens(), 1);
        assert_eq!(handle.status(), ConnectionStatus::Disconnected);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_join_is_terminal() {
        let ws = Arc::new(
            MockTransport::new(TransportKind::Websocket)
                .with_fallback(MockBehavior::Refuse("Not authorized".to_string())),
        );
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();
        let mut events = handle.subscribe();

        let event = next_event(&mut events).await;
        assert_eq!(
            event,
            RealtimeEvent::ConnectError {
                message: "Not authorized".to_string()
            }
        );
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ws.attempts(), 1);
        assert_eq!(ws.closes(), 1);
        assert_eq!(handle.status(), ConnectionStatus::Error);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_open_times_out() {
        let ws = Arc::new(
            MockTransport::new(TransportKind::Websocket).with_script([MockBehavior::Hang]),
        );
        let provider =
            ConnectionProvider::mount(&config(2), Credentials::default(), as_transports(&[&ws]));
        let mut events = provider.handle().subscribe();

        match next_event(&mut events).await {
            RealtimeEvent::ConnectError { message } => assert!(message.contains("timed out")),
            other => panic!("expected connect error, got {other:?}"),
        }
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_ping_answered_and_events_delivered() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();
        let mut events = handle.subscribe();
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;

        ws.push(EnginePacket::Ping(None));
        ws.push_event("pairing:update", vec![json!({"partner": "Grace"})]);
        let event = wait_for(&mut events, |e| matches!(e, RealtimeEvent::Message { .. })).await;
        assert_eq!(
            event,
            RealtimeEvent::Message {
                event: "pairing:update".to_string(),
                args: vec![json!({"partner": "Grace"})],
            }
        );
        assert!(ws.sent().contains(&EnginePacket::Pong(None)));
        assert_eq!(handle.metrics().snapshot().messages_received, 1);

        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_emit_reaches_server() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let handle = provider.handle();
        let mut events = handle.subscribe();

        handle.emit("join", json!({"room": "r1"})).unwrap();
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        tokio::time::sleep(Duration::from_millis(10)).await;

        let expected = EnginePacket::Message(r#"2["join",{"room":"r1"}]"#.to_string());
        assert!(ws.sent().contains(&expected));
        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_silent_server_times_out() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket).with_heartbeat(1000, 500));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let mut events = provider.handle().subscribe();

        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;
        let event = wait_for(&mut events, |e| matches!(e, RealtimeEvent::Disconnected { .. })).await;
        assert_eq!(
            event,
            RealtimeEvent::Disconnected {
                reason: "ping timeout".to_string()
            }
        );
        provider.unmount().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_closes_once_without_reopening() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        let mut events = provider.handle().subscribe();
        wait_for(&mut events, |e| matches!(e, RealtimeEvent::Connected { .. })).await;

        drop(provider);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ws.opens(), 1);
        assert_eq!(ws.closes(), 1);
    }

    #[tokio::test]
    async fn test_invalid_endpoint_is_terminal_error() {
        let mut cfg = config(3);
        cfg.api.base_url = "not a url".to_string();
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));

        let provider = ConnectionProvider::mount(&cfg, Credentials::default(), as_transports(&[&ws]));
        assert_eq!(provider.handle().status(), ConnectionStatus::Error);
        assert!(!provider.is_running());
        assert_eq!(ws.attempts(), 0);
        provider.unmount().await;
    }

    #[tokio::test]
    async fn test_immediate_unmount_never_opens() {
        let ws = Arc::new(MockTransport::new(TransportKind::Websocket));

        for _ in 0..200 {
            let provider =
                ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
            let handle = provider.handle();
            provider.unmount().await;
            assert_eq!(handle.status(), ConnectionStatus::Disconnected);
        }

        assert_eq!(ws.attempts(), 0);
        assert_eq!(ws.opens(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_unmount_during_open_closes_nothing() {
        let ws = Arc::new(
            MockTransport::new(TransportKind::Websocket).with_fallback(MockBehavior::Hang),
        );
        let provider =
            ConnectionProvider::mount(&config(3), Credentials::default(), as_transports(&[&ws]));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(ws.attempts(), 1);

        provider.unmount().await;
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(ws.attempts(), 1);
        assert_eq!(ws.opens(), 0);
        assert_eq!(ws.closes(), 0);
    }
}
