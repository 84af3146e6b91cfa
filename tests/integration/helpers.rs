//! Shared test helpers for integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use peerprep_core::config::{AppConfig, RealtimeConfig};
use peerprep_realtime::RealtimeEvent;
use peerprep_realtime::transport::Transport;
use peerprep_realtime::transport::mock::MockTransport;

/// Configuration with short, deterministic reconnect timings
pub fn test_config(reconnect_attempts: u32) -> AppConfig {
    AppConfig {
        realtime: RealtimeConfig {
            reconnect_attempts,
            reconnect_delay_ms: 500,
            connect_timeout_ms: 1000,
            ..RealtimeConfig::default()
        },
        ..AppConfig::default()
    }
}

/// Upcast mocks into the provider's transport list, preserving order
pub fn transports(mocks: &[&Arc<MockTransport>]) -> Vec<Arc<dyn Transport>> {
    mocks
        .iter()
        .map(|m| Arc::clone(m) as Arc<dyn Transport>)
        .collect()
}

/// Wait (in virtual time) for the first event matching `pred`
pub async fn wait_for<F>(events: &mut broadcast::Receiver<RealtimeEvent>, mut pred: F) -> RealtimeEvent
where
    F: FnMut(&RealtimeEvent) -> bool,
{
    loop {
        let event = tokio::time::timeout(Duration::from_secs(300), events.recv())
            .await
            .expect("Timed out waiting for realtime event")
            .expect("Realtime event channel closed");
        if pred(&event) {
            return event;
        }
    }
}

/// Whether the event is a successful connect
pub fn is_connected(event: &RealtimeEvent) -> bool {
    matches!(event, RealtimeEvent::Connected { .. })
}
