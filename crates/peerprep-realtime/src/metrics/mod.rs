//! Connection metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Connection-level counters, shared between the driver and consumers.
#[derive(Debug, Default)]
pub struct ConnectionMetrics {
    /// Transport opens attempted
    pub connect_attempts: AtomicU64,
    /// Attempts where no transport connected
    pub connect_failures: AtomicU64,
    /// Transport sessions opened
    pub transport_opens: AtomicU64,
    /// Transport sessions closed
    pub transport_closes: AtomicU64,
    /// Reconnect attempts started
    pub reconnects: AtomicU64,
    /// Events emitted to the server
    pub messages_sent: AtomicU64,
    /// Events received from the server
    pub messages_received: AtomicU64,
}

impl ConnectionMetrics {
    /// Create new zeroed metrics
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn inc(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get a snapshot of all metrics
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            connect_attempts: self.connect_attempts.load(Ordering::Relaxed),
            connect_failures: self.connect_failures.load(Ordering::Relaxed),
            transport_opens: self.transport_opens.load(Ordering::Relaxed),
            transport_closes: self.transport_closes.load(Ordering::Relaxed),
            reconnects: self.reconnects.load(Ordering::Relaxed),
            messages_sent: self.messages_sent.load(Ordering::Relaxed),
            messages_received: self.messages_received.load(Ordering::Relaxed),
        }
    }
}

/// Serializable metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Transport opens attempted
    pub connect_attempts: u64,
    /// Attempts where no transport connected
    pub connect_failures: u64,
    /// Transport sessions opened
    pub transport_opens: u64,
    /// Transport sessions closed
    pub transport_closes: u64,
    /// Reconnect attempts started
    pub reconnects: u64,
    /// Events emitted to the server
    pub messages_sent: u64,
    /// Events received from the server
    pub messages_received: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = ConnectionMetrics::new();
        ConnectionMetrics::inc(&metrics.transport_opens);
        ConnectionMetrics::inc(&metrics.messages_received);
        ConnectionMetrics::inc(&metrics.messages_received);

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.transport_opens, 1);
        assert_eq!(snapshot.messages_received, 2);
        assert_eq!(snapshot.transport_closes, 0);
    }
}
