//! The shared connection handle.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::{broadcast, mpsc, watch};
use tracing::warn;

use peerprep_core::config::TransportKind;
use peerprep_core::error::AppError;

use crate::message::types::{OutboundEmit, RealtimeEvent};
use crate::metrics::ConnectionMetrics;

/// Lifecycle status of the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionStatus {
    /// Mounted, no attempt made yet.
    Unready,
    /// An attempt is in progress.
    Connecting,
    /// The namespace join was acknowledged.
    Connected,
    /// Down, either between retries after a drop or for good.
    Disconnected,
    /// The last attempt failed.
    Error,
}

impl ConnectionStatus {
    /// Lowercase name used in logs and CLI output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unready => "unready",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionState {
    /// Current status.
    pub status: ConnectionStatus,
    /// Identity token from the last acknowledged join, while connected.
    pub id: Option<String>,
    /// Transport carrying the connection, while connected.
    pub transport: Option<TransportKind>,
}

impl ConnectionState {
    fn with_status(status: ConnectionStatus) -> Self {
        Self {
            status,
            id: None,
            transport: None,
        }
    }
}

/// A handle to the single realtime connection.
///
/// Created once per mount by the connection provider and shared by `Arc`.
/// Consumers read state and queue emits; only the provider's driver task
/// mutates it.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Latest state, observable through [`ConnectionHandle::watch_status`]
    state: watch::Sender<ConnectionState>,
    /// Lifecycle and application events
    events: broadcast::Sender<RealtimeEvent>,
    /// Emits waiting for the driver
    outbound: mpsc::Sender<OutboundEmit>,
    /// Counters
    metrics: Arc<ConnectionMetrics>,
}

impl ConnectionHandle {
    /// Creates an unready handle and the receiving end of its emit queue.
    pub(crate) fn new(
        event_buffer: usize,
        outbound_buffer: usize,
    ) -> (Arc<Self>, mpsc::Receiver<OutboundEmit>) {
        let (state, _) = watch::channel(ConnectionState::with_status(ConnectionStatus::Unready));
        let (events, _) = broadcast::channel(event_buffer.max(1));
        let (outbound, rx) = mpsc::channel(outbound_buffer.max(1));

        let handle = Arc::new(Self {
            state,
            events,
            outbound,
            metrics: Arc::new(ConnectionMetrics::new()),
        });
        (handle, rx)
    }

    /// Current status.
    pub fn status(&self) -> ConnectionStatus {
        self.state.borrow().status
    }

    /// Identity token assigned by the server, while connected.
    pub fn id(&self) -> Option<String> {
        self.state.borrow().id.clone()
    }

    /// Transport in use, while connected.
    pub fn transport(&self) -> Option<TransportKind> {
        self.state.borrow().transport
    }

    /// Snapshot of the whole state.
    pub fn state(&self) -> ConnectionState {
        self.state.borrow().clone()
    }

    /// Whether the connection is currently up.
    pub fn is_connected(&self) -> bool {
        self.status() == ConnectionStatus::Connected
    }

    /// Subscribes to lifecycle and application events.
    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.events.subscribe()
    }

    /// Observes state changes.
    pub fn watch_status(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Connection counters.
    pub fn metrics(&self) -> &ConnectionMetrics {
        &self.metrics
    }

    /// Queues an application event for the server.
    ///
    /// Emits made while a connect is in progress are delivered once the
    /// connection comes up. Fails once the connection is down for good or
    /// the queue is full.
    pub fn emit(&self, event: impl Into<String>, data: Value) -> Result<(), AppError> {
        let emit = OutboundEmit {
            event: event.into(),
            args: vec![data],
        };

        match self.outbound.try_send(emit) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(emit)) => {
                warn!(event = %emit.event, "Outbound queue full, dropping emit");
                Err(AppError::connection("Outbound queue is full"))
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                Err(AppError::connection("Connection is closed"))
            }
        }
    }

    pub(crate) fn set_connected(&self, id: String, transport: TransportKind) {
        self.state.send_replace(ConnectionState {
            status: ConnectionStatus::Connected,
            id: Some(id),
            transport: Some(transport),
        });
    }

    pub(crate) fn set_status(&self, status: ConnectionStatus) {
        self.state.send_replace(ConnectionState::with_status(status));
    }

    pub(crate) fn publish(&self, event: RealtimeEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}
