//! Events published to consumers and emits queued by them.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use peerprep_core::config::TransportKind;

/// Lifecycle and application events published by the connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    /// The namespace join was acknowledged.
    Connected {
        /// Identity token assigned by the server.
        id: String,
        /// Transport carrying the connection.
        transport: TransportKind,
    },
    /// The connection went away.
    Disconnected {
        /// Why.
        reason: String,
    },
    /// An attempt to connect failed.
    ConnectError {
        /// Failure description.
        message: String,
    },
    /// A reconnect attempt is about to start.
    Reconnecting {
        /// 1-based attempt number.
        attempt: u32,
    },
    /// Every reconnect attempt failed; the connection stays down.
    ReconnectFailed {
        /// Attempts made.
        attempts: u32,
    },
    /// A server-pushed application event.
    Message {
        /// Event name, e.g. `pairing:update`.
        event: String,
        /// Event arguments.
        args: Vec<Value>,
    },
}

/// An application event queued for the server.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundEmit {
    /// Event name.
    pub event: String,
    /// Event arguments.
    pub args: Vec<Value>,
}
