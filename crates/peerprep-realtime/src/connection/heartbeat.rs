//! Liveness tracking for an open session.
//!
//! In Engine.IO v4 the server pings and the client answers. A session is
//! considered dead when nothing arrives within `pingInterval + pingTimeout`.

use std::time::Duration;

use tokio::time::Instant;

use crate::message::packet::OpenHandshake;

/// Heartbeat configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval between server pings
    pub ping_interval: Duration,
    /// Grace period after a missed ping
    pub ping_timeout: Duration,
}

impl HeartbeatConfig {
    /// Timings advertised in the open handshake.
    pub fn from_handshake(handshake: &OpenHandshake) -> Self {
        Self {
            ping_interval: Duration::from_millis(handshake.ping_interval),
            ping_timeout: Duration::from_millis(handshake.ping_timeout),
        }
    }

    /// Longest silence tolerated.
    pub fn max_silence(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

/// Tracks when the peer was last heard from.
#[derive(Debug)]
pub(crate) struct Heartbeat {
    config: HeartbeatConfig,
    last_seen: Instant,
}

impl Heartbeat {
    pub(crate) fn new(config: HeartbeatConfig) -> Self {
        Self {
            config,
            last_seen: Instant::now(),
        }
    }

    /// Records inbound traffic.
    pub(crate) fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Instant after which the session counts as dead.
    pub(crate) fn deadline(&self) -> Instant {
        self.last_seen + self.config.max_silence()
    }
}
