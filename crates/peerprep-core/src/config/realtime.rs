//! Realtime connection configuration.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A realtime transport the provider may open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// Streaming websocket.
    Websocket,
    /// HTTP long-polling.
    Polling,
}

impl TransportKind {
    /// Value used in the `transport` query parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Websocket => "websocket",
            Self::Polling => "polling",
        }
    }
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Realtime connection provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Transports in preference order. Each attempt tries them in turn.
    #[serde(default = "default_transports")]
    pub transports: Vec<TransportKind>,
    /// Whether to reconnect automatically after a failure or drop.
    #[serde(default = "default_true")]
    pub reconnect: bool,
    /// Fixed delay before each reconnect attempt, in milliseconds.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// Maximum reconnect attempts before giving up.
    #[serde(default = "default_reconnect_attempts")]
    pub reconnect_attempts: u32,
    /// Timeout for a single transport open plus handshake, in milliseconds.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_ms: u64,
    /// Capacity of the event broadcast channel shared by consumers.
    #[serde(default = "default_event_buffer")]
    pub event_buffer_size: usize,
    /// Capacity of the outbound emit queue.
    #[serde(default = "default_outbound_buffer")]
    pub outbound_buffer_size: usize,
}

impl RealtimeConfig {
    /// Reconnect delay as a [`Duration`].
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            transports: default_transports(),
            reconnect: true,
            reconnect_delay_ms: default_reconnect_delay(),
            reconnect_attempts: default_reconnect_attempts(),
            connect_timeout_ms: default_connect_timeout(),
            event_buffer_size: default_event_buffer(),
            outbound_buffer_size: default_outbound_buffer(),
        }
    }
}

fn default_transports() -> Vec<TransportKind> {
    vec![TransportKind::Websocket, TransportKind::Polling]
}

fn default_true() -> bool {
    true
}

fn default_reconnect_delay() -> u64 {
    1000
}

fn default_reconnect_attempts() -> u32 {
    5
}

fn default_connect_timeout() -> u64 {
    20_000
}

fn default_event_buffer() -> usize {
    256
}

fn default_outbound_buffer() -> usize {
    64
}
