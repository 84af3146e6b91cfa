//! Bounded reconnect policy.

use std::time::Duration;

use peerprep_core::config::RealtimeConfig;

/// When and how often to retry after a failed attempt or a dropped
/// connection.
///
/// The initial open is not a retry. Retries are numbered from 1 and the
/// count restarts after every successful connect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Whether to retry at all
    pub enabled: bool,
    /// Fixed wait before each retry
    pub delay: Duration,
    /// Retries allowed before giving up
    pub max_attempts: u32,
}

impl ReconnectPolicy {
    /// Builds the policy from realtime configuration.
    pub fn from_config(config: &RealtimeConfig) -> Self {
        Self {
            enabled: config.reconnect,
            delay: config.reconnect_delay(),
            max_attempts: config.reconnect_attempts,
        }
    }

    /// Number of the next retry after `made` retries, or `None` to give up.
    pub fn next_retry(&self, made: u32) -> Option<u32> {
        (self.enabled && made < self.max_attempts).then(|| made + 1)
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self::from_config(&RealtimeConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_is_bounded() {
        let policy = ReconnectPolicy {
            enabled: true,
            delay: Duration::from_millis(100),
            max_attempts: 2,
        };
        assert_eq!(policy.next_retry(0), Some(1));
        assert_eq!(policy.next_retry(1), Some(2));
        assert_eq!(policy.next_retry(2), None);
    }

    #[test]
    fn test_disabled_never_retries() {
        let config = RealtimeConfig {
            reconnect: false,
            ..RealtimeConfig::default()
        };
        assert_eq!(ReconnectPolicy::from_config(&config).next_retry(0), None);
    }

    #[test]
    fn test_defaults_follow_config() {
        let policy = ReconnectPolicy::default();
        assert!(policy.enabled);
        assert_eq!(policy.delay, Duration::from_secs(1));
        assert_eq!(policy.max_attempts, 5);
    }
}
